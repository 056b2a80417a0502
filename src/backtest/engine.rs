//! Walk-forward backtest engine
//!
//! Every bar where the rule fires opens its own synthetic long trade. Each
//! trade is then walked forward bar by bar until its stop or target is hit,
//! or the holding window runs out and it is left open.

use super::metrics::{MetricsCollector, PerformanceMetrics};
use crate::api::{year_span, BarWindow, MarketDataProvider};
use crate::config::IndicatorSettings;
use crate::data::{BarSeries, Candle, IndicatorFrame, Interval};
use crate::strategy::{CandlePattern, Signal, Strategy, TradeSetup};
use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use tracing::{debug, info};

/// Configuration for a backtest run
#[derive(Debug, Clone)]
pub struct BacktestConfig {
    pub start_date: NaiveDate,
    /// Exclusive
    pub end_date: NaiveDate,
    /// Bars scanned after the entry bar before a trade is left open
    pub max_hold_bars: usize,
}

impl BacktestConfig {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start_date: start,
            end_date: end,
            max_hold_bars: 9,
        }
    }

    /// `years` of daily history up to and including `today`
    pub fn last_years(years: u32, today: NaiveDate) -> Self {
        let (start, end) = year_span(years, today);
        Self::new(start, end)
    }

    pub fn with_max_hold_bars(mut self, bars: usize) -> Self {
        self.max_hold_bars = bars;
        self
    }

    pub fn window(&self) -> BarWindow {
        BarWindow::Dates {
            start: self.start_date,
            end: self.end_date,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Outcome {
    #[serde(rename = "OPEN")]
    Open,
    #[serde(rename = "HIT_SL")]
    HitSl,
    #[serde(rename = "HIT_TARGET")]
    HitTarget,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Open => "OPEN",
            Outcome::HitSl => "HIT_SL",
            Outcome::HitTarget => "HIT_TARGET",
        }
    }

    pub fn is_closed(&self) -> bool {
        !matches!(self, Outcome::Open)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a simulated trade ended
#[derive(Debug, Clone, PartialEq)]
pub struct Exit {
    pub outcome: Outcome,
    pub price: Option<Decimal>,
    pub time: Option<DateTime<Utc>>,
    pub bars_held: Option<usize>,
}

impl Exit {
    fn open() -> Self {
        Self {
            outcome: Outcome::Open,
            price: None,
            time: None,
            bars_held: None,
        }
    }
}

/// Walk a trade entered on `entry_index` forward through at most
/// `max_hold_bars` later bars. A bar that touches both levels counts as a
/// stop-out.
pub fn simulate_outcome(
    candles: &[Candle],
    entry_index: usize,
    setup: &TradeSetup,
    max_hold_bars: usize,
) -> Exit {
    let last = entry_index.saturating_add(max_hold_bars).min(candles.len().saturating_sub(1));

    for j in entry_index.saturating_add(1)..=last {
        let bar = &candles[j];
        let hit = if bar.low <= setup.stop {
            Some((Outcome::HitSl, setup.stop))
        } else if bar.high >= setup.target {
            Some((Outcome::HitTarget, setup.target))
        } else {
            None
        };

        if let Some((outcome, price)) = hit {
            return Exit {
                outcome,
                price: Some(price),
                time: Some(bar.timestamp),
                bars_held: Some(j - entry_index),
            };
        }
    }

    Exit::open()
}

/// One synthetic trade, prices rounded to 2 decimals
#[derive(Debug, Clone, Serialize)]
pub struct TradeRecord {
    pub symbol: String,
    pub date: DateTime<Utc>,
    pub entry: Decimal,
    pub stop: Decimal,
    pub target: Decimal,
    pub exit_price: Option<Decimal>,
    pub exit_date: Option<DateTime<Utc>>,
    pub bars_held: Option<usize>,
    pub outcome: Outcome,
    pub pattern: Option<CandlePattern>,
    /// Reward in units of initial risk, `None` while open
    pub r_multiple: Option<Decimal>,
}

impl TradeRecord {
    pub fn new(symbol: &str, entry_bar: &Candle, setup: &TradeSetup, exit: Exit) -> Self {
        let risk = setup.risk();
        let r_multiple = match exit.outcome {
            Outcome::HitTarget if risk > Decimal::ZERO => Some(setup.reward() / risk),
            Outcome::HitSl => Some(Decimal::NEGATIVE_ONE),
            _ => None,
        };

        Self {
            symbol: symbol.to_string(),
            date: entry_bar.timestamp,
            entry: setup.entry.round_dp(2),
            stop: setup.stop.round_dp(2),
            target: setup.target.round_dp(2),
            exit_price: exit.price.map(|p| p.round_dp(2)),
            exit_date: exit.time,
            bars_held: exit.bars_held,
            outcome: exit.outcome,
            pattern: setup.pattern,
            r_multiple: r_multiple.map(|r| r.round_dp(2)),
        }
    }
}

/// Result of a backtest run on one symbol
#[derive(Debug, Clone, Serialize)]
pub struct BacktestResult {
    pub symbol: String,
    pub strategy: String,
    pub bars: usize,
    pub trades: Vec<TradeRecord>,
    pub metrics: PerformanceMetrics,
}

pub struct BacktestEngine {
    config: BacktestConfig,
    strategy: Box<dyn Strategy>,
    indicators: IndicatorSettings,
}

impl BacktestEngine {
    pub fn new(
        config: BacktestConfig,
        strategy: Box<dyn Strategy>,
        indicators: IndicatorSettings,
    ) -> Self {
        Self {
            config,
            strategy,
            indicators,
        }
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    pub fn strategy_name(&self) -> &str {
        self.strategy.name()
    }

    /// Replay the rule over bars already in memory
    pub fn run_on(&self, series: &BarSeries) -> BacktestResult {
        let frame = IndicatorFrame::compute(series, &self.indicators);
        let candles = &series.candles;
        let mut metrics = MetricsCollector::new();
        let mut trades = Vec::new();

        // The last bar has no forward bars to resolve a trade against
        for i in self.strategy.warmup()..candles.len().saturating_sub(1) {
            let Signal::Enter(setup) = self.strategy.analyze(&frame, i) else {
                continue;
            };

            let exit = simulate_outcome(candles, i, &setup, self.config.max_hold_bars);
            let record = TradeRecord::new(&series.symbol, &candles[i], &setup, exit);

            debug!(
                "{} {}: entry {} stop {} target {} -> {}",
                record.symbol,
                record.date.date_naive(),
                record.entry,
                record.stop,
                record.target,
                record.outcome
            );

            metrics.record_trade(&record);
            trades.push(record);
        }

        BacktestResult {
            symbol: series.symbol.clone(),
            strategy: self.strategy.name().to_string(),
            bars: candles.len(),
            trades,
            metrics: metrics.calculate(),
        }
    }

    /// Fetch daily bars for the configured window and replay them
    pub async fn run(&self, provider: &dyn MarketDataProvider, symbol: &str) -> Result<BacktestResult> {
        let series = provider
            .fetch_bars(symbol, Interval::Daily, &self.config.window())
            .await
            .with_context(|| format!("Failed to load daily bars for {}", symbol))?;

        if series.is_empty() {
            bail!("No daily bars for {}", symbol);
        }

        let result = self.run_on(&series);

        info!(
            "{} [{}]: {} bars, {} trades, win rate {:.1}%",
            result.symbol,
            result.strategy,
            result.bars,
            result.metrics.total_trades,
            result.metrics.win_rate
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::memory::MemoryProvider;
    use crate::config::SwingSettings;
    use crate::data::fixtures::{daily, dec, flat};
    use crate::strategy::SwingBreakoutStrategy;
    use rust_decimal_macros::dec;

    fn engine() -> BacktestEngine {
        let config = BacktestConfig::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        );
        BacktestEngine::new(
            config,
            Box::new(SwingBreakoutStrategy::new(SwingSettings::default())),
            IndicatorSettings::default(),
        )
    }

    fn breakout_then(after: &[(f64, f64, f64, f64, f64)]) -> BarSeries {
        let mut bars = flat(5);
        bars.push((100.5, 103.0, 100.0, 102.0, 2000.0));
        bars.extend_from_slice(after);
        daily("HDFCBANK", &bars)
    }

    fn setup() -> TradeSetup {
        TradeSetup::new(dec!(102), dec!(99), dec!(106.5))
    }

    #[test]
    fn test_target_hit() {
        let series = breakout_then(&[(102.0, 107.0, 101.0, 106.0, 1000.0)]);
        let exit = simulate_outcome(&series.candles, 5, &setup(), 9);

        assert_eq!(exit.outcome, Outcome::HitTarget);
        assert_eq!(exit.price, Some(dec!(106.5)));
        assert_eq!(exit.bars_held, Some(1));
        assert_eq!(exit.time, Some(series.candles[6].timestamp));
    }

    #[test]
    fn test_stop_checked_before_target() {
        let series = breakout_then(&[(102.0, 110.0, 98.0, 104.0, 1000.0)]);
        let exit = simulate_outcome(&series.candles, 5, &setup(), 9);

        assert_eq!(exit.outcome, Outcome::HitSl);
        assert_eq!(exit.price, Some(dec!(99)));
    }

    #[test]
    fn test_open_when_window_runs_out() {
        let quiet = vec![(102.0, 104.0, 101.0, 103.0, 1000.0); 12];
        let mut series = breakout_then(&quiet);
        // Would hit the target, but only on the tenth bar after entry
        series.candles[15].high = dec(107.0);

        let exit = simulate_outcome(&series.candles, 5, &setup(), 9);
        assert_eq!(exit.outcome, Outcome::Open);
        assert_eq!(exit.price, None);
        assert_eq!(exit.bars_held, None);

        let exit = simulate_outcome(&series.candles, 5, &setup(), 10);
        assert_eq!(exit.outcome, Outcome::HitTarget);
        assert_eq!(exit.bars_held, Some(10));
    }

    #[test]
    fn test_entry_past_the_series_stays_open() {
        let series = breakout_then(&[(102.0, 107.0, 101.0, 106.0, 1000.0)]);
        for entry_index in [series.candles.len(), usize::MAX] {
            let exit = simulate_outcome(&series.candles, entry_index, &setup(), 9);
            assert_eq!(exit.outcome, Outcome::Open);
        }
        assert_eq!(simulate_outcome(&[], 0, &setup(), 9).outcome, Outcome::Open);
    }

    #[test]
    fn test_last_years_window() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let config = BacktestConfig::last_years(3, today);
        assert_eq!(config.start_date, NaiveDate::from_ymd_opt(2023, 10, 19).unwrap());
        assert_eq!(config.end_date, NaiveDate::from_ymd_opt(2026, 10, 20).unwrap());
        assert_eq!(config.window(), BarWindow::last_years(3, today));
    }

    #[test]
    fn test_run_on_records_trade() {
        let series = breakout_then(&[
            (102.0, 107.0, 101.0, 106.0, 1000.0),
            (106.0, 106.5, 105.0, 105.5, 900.0),
        ]);
        let result = engine().run_on(&series);

        assert_eq!(result.strategy, "swing");
        assert_eq!(result.bars, 8);
        assert_eq!(result.trades.len(), 1);

        let trade = &result.trades[0];
        assert_eq!(trade.date, series.candles[5].timestamp);
        assert_eq!(trade.entry, dec!(102));
        assert_eq!(trade.stop, dec!(99));
        assert_eq!(trade.target, dec!(106.5));
        assert_eq!(trade.exit_price, Some(dec!(106.5)));
        assert_eq!(trade.outcome, Outcome::HitTarget);
        assert_eq!(trade.r_multiple, Some(dec!(1.5)));

        assert_eq!(result.metrics.successful, 1);
        assert_eq!(result.metrics.win_rate, 100.0);
    }

    #[test]
    fn test_last_bar_never_opens() {
        let series = breakout_then(&[]);
        assert_eq!(engine().run_on(&series).trades.len(), 0);
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(Outcome::HitSl.to_string(), "HIT_SL");
        assert_eq!(serde_json::to_string(&Outcome::HitTarget).unwrap(), "\"HIT_TARGET\"");
        assert!(!Outcome::Open.is_closed());
    }

    #[tokio::test]
    async fn test_run_fetches_from_provider() {
        let series = breakout_then(&[(102.0, 103.0, 98.5, 99.0, 1000.0), (99.0, 100.0, 98.0, 99.5, 800.0)]);
        let provider = MemoryProvider::new().with_series(series);

        let result = engine().run(&provider, "hdfcbank").await.unwrap();
        assert_eq!(result.symbol, "HDFCBANK");
        assert_eq!(result.trades[0].outcome, Outcome::HitSl);
        assert_eq!(result.metrics.failed, 1);

        assert!(engine().run(&provider, "MISSING").await.is_err());
    }
}
