//! Backtest CLI
//!
//! Walk-forward backtests over daily NSE bars.
//! Usage:
//!   cargo run --bin backtest -- run --symbol RELIANCE --strategy swing --trades
//!   cargo run --bin backtest -- universe --limit 50 --export trades.csv
//!   cargo run --bin backtest -- compare --symbol TCS --strategies all

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use rust_decimal::prelude::ToPrimitive;
use screener::api::{BarWindow, UniverseClient};
use screener::backtest::{
    compare_strategies, run_universe, BacktestConfig, BacktestEngine, ComparisonResult, Outcome,
    PerformanceMetrics, TradeRecord, UniverseReport,
};
use screener::config::Config;
use screener::data::{normalize, IndicatorFrame, Interval};
use screener::storage::market_data;
use screener::strategy::{create_strategy, describe, parse_strategy_list, STRATEGY_NAMES};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "backtest")]
#[command(about = "Walk-forward backtests of entry rules on NSE daily bars")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Backtest one symbol
    Run {
        /// NSE symbol (e.g., RELIANCE, NIFTY)
        #[arg(short, long)]
        symbol: String,

        /// Strategy name, defaults to backtest.default_strategy
        #[arg(short = 'S', long)]
        strategy: Option<String>,

        /// Years of daily history
        #[arg(short, long)]
        years: Option<u32>,

        /// Show individual trades
        #[arg(long)]
        trades: bool,
    },

    /// Backtest every Nifty 500 constituent
    Universe {
        #[arg(short = 'S', long)]
        strategy: Option<String>,

        /// Only the first N symbols of the list
        #[arg(short, long)]
        limit: Option<usize>,

        /// Comma-separated symbols instead of the constituents list
        #[arg(long)]
        symbols: Option<String>,

        /// Export trades to CSV file
        #[arg(long)]
        export: Option<String>,
    },

    /// Compare multiple strategies on one symbol
    Compare {
        #[arg(short, long)]
        symbol: String,

        /// Strategies to compare (comma-separated, or "all")
        #[arg(short = 'S', long, default_value = "all")]
        strategies: String,

        #[arg(short, long)]
        years: Option<u32>,

        /// Export results to CSV file
        #[arg(long)]
        export: Option<String>,
    },

    /// Print the latest indicator values for a symbol
    Indicators {
        #[arg(short, long)]
        symbol: String,

        #[arg(short, long, default_value = "1d")]
        interval: String,

        /// Number of most recent bars to print
        #[arg(short, long, default_value = "10")]
        rows: usize,
    },

    /// List available strategies
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("screener=info".parse()?)
                .add_directive("backtest=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            symbol,
            strategy,
            years,
            trades,
        } => run_single_backtest(&symbol, strategy.as_deref(), years, trades).await,

        Commands::Universe {
            strategy,
            limit,
            symbols,
            export,
        } => run_universe_backtest(strategy.as_deref(), limit, symbols.as_deref(), export).await,

        Commands::Compare {
            symbol,
            strategies,
            years,
            export,
        } => run_comparison(&symbol, &strategies, years, export.as_deref()).await,

        Commands::Indicators {
            symbol,
            interval,
            rows,
        } => print_indicators(&symbol, &interval, rows).await,

        Commands::List => {
            println!("\nAvailable strategies:");
            for name in STRATEGY_NAMES {
                println!("  - {:<10} {}", name, describe(name));
            }
            println!("\nUsage: backtest run --symbol RELIANCE --strategy swing");
            println!("       backtest compare --symbol TCS --strategies swing,trend");
            Ok(())
        }
    }
}

fn engine_for(config: &Config, strategy: Option<&str>, years: Option<u32>) -> Result<BacktestEngine> {
    let name = strategy.unwrap_or(&config.backtest.default_strategy);
    let strategy = create_strategy(name, &config.strategy)
        .with_context(|| format!("Unknown strategy '{}' (see `backtest list`)", name))?;

    let years = years.unwrap_or(config.backtest.history_years);
    if years == 0 {
        bail!("--years must be at least 1");
    }

    let backtest_config = BacktestConfig::last_years(years, Utc::now().date_naive())
        .with_max_hold_bars(config.backtest.max_hold_bars);

    Ok(BacktestEngine::new(
        backtest_config,
        strategy,
        config.indicators.clone(),
    ))
}

async fn run_single_backtest(
    symbol: &str,
    strategy: Option<&str>,
    years: Option<u32>,
    show_trades: bool,
) -> Result<()> {
    let config = Config::load()?;
    let provider = market_data(&config)?;
    let engine = engine_for(&config, strategy, years)?;

    let result = engine.run(provider.as_ref(), symbol).await?;

    print_header(&format!("{} [{}]", result.symbol, result.strategy));
    print_period(engine.config().start_date, engine.config().end_date);
    println!("Bars: {}", result.bars);
    println!();
    print_performance(&result.metrics);
    print_footer();

    if show_trades && !result.trades.is_empty() {
        println!();
        print_trades(&result.trades);
    }

    Ok(())
}

async fn run_universe_backtest(
    strategy: Option<&str>,
    limit: Option<usize>,
    symbols: Option<&str>,
    export: Option<String>,
) -> Result<()> {
    let config = Config::load()?;
    let provider = market_data(&config)?;
    let engine = engine_for(&config, strategy, None)?;

    let mut symbols: Vec<String> = match symbols {
        Some(list) => list
            .split(',')
            .map(normalize)
            .filter(|s| !s.is_empty())
            .collect(),
        None => {
            UniverseClient::new(&config.provider, &config.universe)?
                .fetch_symbols()
                .await?
        }
    };
    if let Some(limit) = limit {
        symbols.truncate(limit);
    }

    let report = run_universe(&engine, provider.as_ref(), &symbols).await;
    print_universe(&report, engine.config());

    if let Some(path) = export.or_else(|| config.backtest.export_path.clone()) {
        report.export_csv(&path)?;
        println!("\nExported to: {}", path);
    }

    Ok(())
}

async fn run_comparison(
    symbol: &str,
    strategies: &str,
    years: Option<u32>,
    export: Option<&str>,
) -> Result<()> {
    let config = Config::load()?;
    let provider = market_data(&config)?;

    let years = years.unwrap_or(config.backtest.history_years);
    let backtest_config = BacktestConfig::last_years(years, Utc::now().date_naive())
        .with_max_hold_bars(config.backtest.max_hold_bars);

    let series = provider
        .fetch_bars(symbol, Interval::Daily, &backtest_config.window())
        .await
        .with_context(|| format!("Failed to load daily bars for {}", symbol))?;

    let strategy_list = parse_strategy_list(strategies);
    let comparison = compare_strategies(
        &series,
        &strategy_list,
        &config.strategy,
        &config.indicators,
        &backtest_config,
    );

    print_comparison_results(&comparison, backtest_config.start_date, backtest_config.end_date);

    if let Some(path) = export {
        comparison.export_csv(path)?;
        println!("\nExported to: {}", path);
    }

    Ok(())
}

async fn print_indicators(symbol: &str, interval: &str, rows: usize) -> Result<()> {
    let config = Config::load()?;
    let provider = market_data(&config)?;
    let interval: Interval = interval.parse()?;

    let range = if interval.is_intraday() {
        config.scanner.range.clone()
    } else {
        "1y".to_string()
    };
    let series = provider
        .fetch_bars(symbol, interval, &BarWindow::Range(range))
        .await?;
    let frame = IndicatorFrame::compute(&series, &config.indicators);

    let opt = |v: Option<rust_decimal::Decimal>| {
        v.and_then(|d| d.to_f64())
            .map(|d| format!("{:.2}", d))
            .unwrap_or_else(|| "-".to_string())
    };

    print_header(&format!("INDICATORS: {} ({})", series.symbol, interval));
    println!(
        "{:<17} {:>9} {:>9} {:>9} {:>9} {:>6} {:>8} {:>8} {:>6} {:>6} {:>9} {:>9}",
        "Time", "Close", "SMA20", "SMA50", "EMA20", "RSI", "MACD", "Hist", "ATR", "ADX", "BB Low", "BB High"
    );
    println!("{}", "-".repeat(118));

    for row in frame.tail(rows) {
        println!(
            "{:<17} {:>9.2} {:>9} {:>9} {:>9} {:>6} {:>8} {:>8} {:>6} {:>6} {:>9} {:>9}",
            row.time.format("%Y-%m-%d %H:%M"),
            row.close.to_f64().unwrap_or(0.0),
            opt(row.sma_fast),
            opt(row.sma_slow),
            opt(row.ema),
            opt(row.rsi),
            opt(row.macd),
            opt(row.macd_hist),
            opt(row.atr),
            opt(row.adx),
            opt(row.bb_lower),
            opt(row.bb_upper),
        );
    }
    print_footer();

    Ok(())
}

fn print_header(title: &str) {
    println!();
    println!("\x1b[1;36m{}\x1b[0m", "═".repeat(55));
    println!("\x1b[1;36m         BACKTEST RESULTS: {}\x1b[0m", title);
    println!("\x1b[1;36m{}\x1b[0m", "═".repeat(55));
}

fn print_period(start: NaiveDate, end: NaiveDate) {
    println!(
        "Period: {} → {}",
        start.format("%Y-%m-%d"),
        end.pred_opt().unwrap_or(end).format("%Y-%m-%d")
    );
}

fn print_performance(metrics: &PerformanceMetrics) {
    println!("\x1b[1;33mPERFORMANCE\x1b[0m");
    println!("  Total Trades:     {}", metrics.total_trades);
    println!(
        "  Outcomes:         \x1b[32m{} target\x1b[0m / \x1b[31m{} stop\x1b[0m / \x1b[33m{} open\x1b[0m",
        metrics.successful, metrics.failed, metrics.open
    );
    println!("  Win Rate:         {:.1}% of closed trades", metrics.win_rate);

    let r_color = if metrics.total_r.is_sign_negative() {
        "\x1b[31m"
    } else {
        "\x1b[32m"
    };
    println!(
        "  Total R:          {}{:+.2}\x1b[0m",
        r_color,
        metrics.total_r.to_f64().unwrap_or(0.0)
    );
    println!("  Expectancy:       {:+.2} R / trade", metrics.expectancy());
    println!(
        "  Largest Win:      {:.2} R",
        metrics.largest_win_r.to_f64().unwrap_or(0.0)
    );
    println!("  Avg Bars Held:    {:.1}", metrics.avg_bars_held);
}

fn print_footer() {
    println!("\x1b[1;36m{}\x1b[0m", "═".repeat(55));
}

fn outcome_color(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::HitTarget => "\x1b[32m",
        Outcome::HitSl => "\x1b[31m",
        Outcome::Open => "\x1b[33m",
    }
}

fn print_trades(trades: &[TradeRecord]) {
    println!("\x1b[1;33mTRADES\x1b[0m");
    println!(
        "{:<12} {:<10} {:>10} {:>10} {:>10} {:>10} {:>5} {:>11}",
        "Date", "Symbol", "Entry", "SL", "Target", "Exit", "Bars", "Outcome"
    );
    println!("{}", "-".repeat(84));

    for trade in trades {
        let exit = trade
            .exit_price
            .map(|p| format!("{:.2}", p))
            .unwrap_or_else(|| "-".to_string());
        let bars = trade
            .bars_held
            .map(|b| b.to_string())
            .unwrap_or_else(|| "-".to_string());

        println!(
            "{:<12} {:<10} {:>10.2} {:>10.2} {:>10.2} {:>10} {:>5} {}{:>11}\x1b[0m",
            trade.date.format("%Y-%m-%d"),
            trade.symbol,
            trade.entry.to_f64().unwrap_or(0.0),
            trade.stop.to_f64().unwrap_or(0.0),
            trade.target.to_f64().unwrap_or(0.0),
            exit,
            bars,
            outcome_color(trade.outcome),
            trade.outcome.as_str()
        );
    }
}

fn print_universe(report: &UniverseReport, config: &BacktestConfig) {
    print_header(&format!("UNIVERSE [{}]", report.strategy));
    println!(
        "Symbols: {} | Backtested: {} | Errors: {}",
        report.symbols,
        report.summaries.len(),
        report.errors.len()
    );
    print_period(config.start_date, config.end_date);
    println!();
    print_performance(&report.metrics);

    let mut ranked = report.summaries.clone();
    ranked.sort_by(|a, b| b.total_r.cmp(&a.total_r));

    if !ranked.is_empty() {
        println!();
        println!("\x1b[1;33mTOP SYMBOLS\x1b[0m");
        for s in ranked.iter().take(10) {
            println!(
                "  {:<12} {:>4} trades {:>6.1}% {:>+8.2} R",
                s.symbol,
                s.trades,
                s.win_rate,
                s.total_r.to_f64().unwrap_or(0.0)
            );
        }
    }

    if !report.errors.is_empty() {
        println!();
        println!("\x1b[1;31mERRORS\x1b[0m");
        for e in &report.errors {
            println!("  {:<12} {}", e.symbol, e.error);
        }
    }
    print_footer();
}

fn print_comparison_results(result: &ComparisonResult, start: NaiveDate, end: NaiveDate) {
    println!();
    println!("\x1b[1;36m{}\x1b[0m", "═".repeat(78));
    println!(
        "\x1b[1;36m                    STRATEGY COMPARISON: {}\x1b[0m",
        result.symbol
    );
    println!("\x1b[1;36m{}\x1b[0m", "═".repeat(78));
    print_period(start, end);
    println!("Bars: {}", result.bars);
    println!();

    println!(
        "┌{:─<17}┬{:─>8}┬{:─>10}┬{:─>9}┬{:─>11}┬{:─>11}┐",
        "", "", "", "", "", ""
    );
    println!(
        "│ {:15} │ {:>6} │ {:>8} │ {:>7} │ {:>9} │ {:>9} │",
        "Strategy", "Trades", "Win Rate", "Open", "Total R", "Exp. R"
    );
    println!(
        "├{:─<17}┼{:─>8}┼{:─>10}┼{:─>9}┼{:─>11}┼{:─>11}┤",
        "", "", "", "", "", ""
    );

    for (name, backtest_result) in &result.results {
        let m = &backtest_result.metrics;
        let r_color = if m.total_r.is_sign_negative() {
            "\x1b[31m"
        } else {
            "\x1b[32m"
        };

        println!(
            "│ {:15} │ {:>6} │ {:>7.1}% │ {:>7} │ {}{:>+9.2}\x1b[0m │ {:>+9.2} │",
            name,
            m.total_trades,
            m.win_rate,
            m.open,
            r_color,
            m.total_r.to_f64().unwrap_or(0.0),
            m.expectancy()
        );
    }

    println!(
        "└{:─<17}┴{:─>8}┴{:─>10}┴{:─>9}┴{:─>11}┴{:─>11}┘",
        "", "", "", "", "", ""
    );

    if let Some((name, best)) = result.best_by_expectancy() {
        println!();
        println!(
            "\x1b[1;32mBest Strategy: {} ({:+.2} R per trade, {:.1}% win rate)\x1b[0m",
            name,
            best.metrics.expectancy(),
            best.metrics.win_rate
        );
    }
    if let Some((name, best)) = result.best_by_win_rate() {
        println!(
            "Highest win rate: {} ({:.1}%)",
            name, best.metrics.win_rate
        );
    }

    println!("\x1b[1;36m{}\x1b[0m", "═".repeat(78));
}
