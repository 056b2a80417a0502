//! Intraday reversal screener
//!
//! Usage:
//!   cargo run --bin scan -- --symbols NIFTY,BANKNIFTY,SBIN --interval 5m
//!   cargo run --bin scan -- --universe --limit 100

use anyhow::{bail, Context, Result};
use chrono::{DateTime, FixedOffset, Utc};
use clap::Parser;
use rust_decimal::prelude::ToPrimitive;
use screener::api::UniverseClient;
use screener::config::Config;
use screener::data::normalize;
use screener::scanner::{ScanReport, Screener};
use screener::storage::market_data;
use screener::strategy::create_strategy;
use tracing_subscriber::EnvFilter;

/// NSE session times are printed in IST
const IST_OFFSET_SECS: i32 = 5 * 3600 + 1800;

#[derive(Parser, Debug)]
#[command(name = "scan")]
#[command(about = "Scan intraday bars for reversal setups")]
struct Cli {
    /// Comma-separated symbols (e.g., NIFTY,BANKNIFTY,SBIN)
    #[arg(short, long)]
    symbols: Option<String>,

    /// Scan the Nifty 500 constituents instead
    #[arg(short, long)]
    universe: bool,

    /// Only the first N universe symbols
    #[arg(short, long)]
    limit: Option<usize>,

    /// Bar interval (5m, 15m), defaults to scanner.interval
    #[arg(short, long)]
    interval: Option<String>,

    /// Strategy name, defaults to scanner.default_strategy
    #[arg(short = 'S', long)]
    strategy: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("screener=info".parse()?)
                .add_directive("scan=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;

    let mut symbols: Vec<String> = if cli.universe {
        UniverseClient::new(&config.provider, &config.universe)?
            .fetch_symbols()
            .await?
    } else {
        cli.symbols
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(normalize)
            .filter(|s| !s.is_empty())
            .collect()
    };
    if symbols.is_empty() {
        bail!("Nothing to scan: pass --symbols or --universe");
    }
    if let Some(limit) = cli.limit {
        symbols.truncate(limit);
    }

    let name = cli
        .strategy
        .as_deref()
        .unwrap_or(&config.scanner.default_strategy);
    let strategy = create_strategy(name, &config.strategy)
        .with_context(|| format!("Unknown strategy '{}'", name))?;

    let mut screener = Screener::new(&config.scanner, strategy, config.indicators.clone())?;
    if let Some(interval) = cli.interval.as_deref() {
        screener = screener.with_interval(interval.parse()?);
    }

    let provider = market_data(&config)?;
    let report = screener.run(provider.as_ref(), &symbols).await;

    print_report(&report);
    Ok(())
}

fn ist(time: DateTime<Utc>) -> String {
    match FixedOffset::east_opt(IST_OFFSET_SECS) {
        Some(offset) => time.with_timezone(&offset).format("%Y-%m-%d %H:%M").to_string(),
        None => time.format("%Y-%m-%d %H:%M").to_string(),
    }
}

fn print_report(report: &ScanReport) {
    println!();
    println!("\x1b[1;36m{}\x1b[0m", "═".repeat(78));
    println!(
        "\x1b[1;36m         SCREENER: {} on {} bars ({} symbols)\x1b[0m",
        report.strategy, report.interval, report.scanned
    );
    println!("\x1b[1;36m{}\x1b[0m", "═".repeat(78));

    if report.signals.is_empty() {
        println!("No signals.");
    } else {
        println!(
            "{:<12} {:<17} {:<18} {:>10} {:>10} {:>10}",
            "Stock", "Time", "Pattern", "Entry", "SL", "Target"
        );
        println!("{}", "-".repeat(78));
        for s in &report.signals {
            println!(
                "{:<12} {:<17} \x1b[32m{:<18}\x1b[0m {:>10.2} {:>10.2} {:>10.2}",
                s.symbol,
                ist(s.time),
                s.pattern.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string()),
                s.entry.to_f64().unwrap_or(0.0),
                s.stop.to_f64().unwrap_or(0.0),
                s.target.to_f64().unwrap_or(0.0),
            );
        }
    }

    if !report.skipped.is_empty() {
        println!();
        println!("\x1b[1;33mSKIPPED ({})\x1b[0m", report.skipped.len());
        for s in &report.skipped {
            println!("  {:<12} {}", s.symbol, s.reason);
        }
    }
    println!("\x1b[1;36m{}\x1b[0m", "═".repeat(78));
}
