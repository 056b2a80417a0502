//! Performance metrics for walk-forward backtests
//!
//! Trades carry no position size, so results are expressed in R: the profit
//! or loss of a trade in units of its initial risk (entry to stop).

use super::engine::{Outcome, TradeRecord};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, Default, Serialize)]
pub struct PerformanceMetrics {
    pub total_trades: u32,
    /// Trades that reached the target
    pub successful: u32,
    /// Trades stopped out
    pub failed: u32,
    pub open: u32,
    /// Percentage of closed trades that reached the target
    pub win_rate: f64,

    pub total_r: Decimal,
    pub expectancy_r: Decimal,
    pub avg_win_r: Decimal,
    pub largest_win_r: Decimal,

    /// Average bars from entry to exit, closed trades only
    pub avg_bars_held: f64,
}

/// Accumulates trade outcomes and calculates final metrics
#[derive(Debug, Default)]
pub struct MetricsCollector {
    outcomes: Vec<Outcome>,
    r_multiples: Vec<Decimal>,
    bars_held: Vec<usize>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_trades<'a>(trades: impl IntoIterator<Item = &'a TradeRecord>) -> Self {
        let mut collector = Self::new();
        for trade in trades {
            collector.record_trade(trade);
        }
        collector
    }

    /// Record a simulated trade
    pub fn record_trade(&mut self, trade: &TradeRecord) {
        self.outcomes.push(trade.outcome);
        if let Some(r) = trade.r_multiple {
            self.r_multiples.push(r);
        }
        if let (true, Some(bars)) = (trade.outcome.is_closed(), trade.bars_held) {
            self.bars_held.push(bars);
        }
    }

    pub fn calculate(&self) -> PerformanceMetrics {
        let total_trades = self.outcomes.len() as u32;

        if total_trades == 0 {
            return PerformanceMetrics::default();
        }

        let count = |o: Outcome| self.outcomes.iter().filter(|&&x| x == o).count() as u32;
        let successful = count(Outcome::HitTarget);
        let failed = count(Outcome::HitSl);
        let open = count(Outcome::Open);

        let closed = successful + failed;
        let win_rate = if closed > 0 {
            (successful as f64 / closed as f64) * 100.0
        } else {
            0.0
        };

        let wins: Vec<Decimal> = self
            .r_multiples
            .iter()
            .copied()
            .filter(|r| *r > Decimal::ZERO)
            .collect();

        let total_r: Decimal = self.r_multiples.iter().sum();
        let expectancy_r = if !self.r_multiples.is_empty() {
            (total_r / Decimal::from(self.r_multiples.len())).round_dp(4)
        } else {
            Decimal::ZERO
        };
        let avg_win_r = if !wins.is_empty() {
            (wins.iter().sum::<Decimal>() / Decimal::from(wins.len())).round_dp(4)
        } else {
            Decimal::ZERO
        };
        let largest_win_r = wins.iter().max().copied().unwrap_or(Decimal::ZERO);

        let avg_bars_held = if !self.bars_held.is_empty() {
            self.bars_held.iter().sum::<usize>() as f64 / self.bars_held.len() as f64
        } else {
            0.0
        };

        PerformanceMetrics {
            total_trades,
            successful,
            failed,
            open,
            win_rate,
            total_r,
            expectancy_r,
            avg_win_r,
            largest_win_r,
            avg_bars_held,
        }
    }
}

impl PerformanceMetrics {
    pub fn expectancy(&self) -> f64 {
        self.expectancy_r.to_f64().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn trade(outcome: Outcome, r: Option<Decimal>, bars: Option<usize>) -> TradeRecord {
        TradeRecord {
            symbol: "ITC".to_string(),
            date: Utc.with_ymd_and_hms(2024, 3, 1, 3, 45, 0).unwrap(),
            entry: dec!(100),
            stop: dec!(98),
            target: dec!(103),
            exit_price: None,
            exit_date: None,
            bars_held: bars,
            outcome,
            pattern: None,
            r_multiple: r,
        }
    }

    #[test]
    fn test_empty() {
        let metrics = MetricsCollector::new().calculate();
        assert_eq!(metrics.total_trades, 0);
        assert_eq!(metrics.win_rate, 0.0);
        assert_eq!(metrics.total_r, Decimal::ZERO);
    }

    #[test]
    fn test_mixed_outcomes() {
        let trades = vec![
            trade(Outcome::HitTarget, Some(dec!(1.5)), Some(2)),
            trade(Outcome::HitTarget, Some(dec!(1.5)), Some(4)),
            trade(Outcome::HitSl, Some(dec!(-1)), Some(3)),
            trade(Outcome::Open, None, None),
        ];
        let metrics = MetricsCollector::from_trades(&trades).calculate();

        assert_eq!(metrics.total_trades, 4);
        assert_eq!(metrics.successful, 2);
        assert_eq!(metrics.failed, 1);
        assert_eq!(metrics.open, 1);
        assert!((metrics.win_rate - 66.666).abs() < 0.01);
        assert_eq!(metrics.total_r, dec!(2));
        assert_eq!(metrics.expectancy_r, dec!(0.6667));
        assert_eq!(metrics.avg_win_r, dec!(1.5));
        assert_eq!(metrics.largest_win_r, dec!(1.5));
        assert_eq!(metrics.avg_bars_held, 3.0);
    }

    #[test]
    fn test_all_open() {
        let trades = vec![trade(Outcome::Open, None, None); 3];
        let metrics = MetricsCollector::from_trades(&trades).calculate();
        assert_eq!(metrics.open, 3);
        assert_eq!(metrics.win_rate, 0.0);
        assert_eq!(metrics.expectancy_r, Decimal::ZERO);
    }
}
