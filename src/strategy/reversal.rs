//! Reversal Strategy
//!
//! Intraday screener rule: a bullish engulfing or hammer candle printed near
//! support on above-average volume. Entry just above the signal bar's high,
//! stop at its low.

use crate::config::ReversalSettings;
use crate::data::IndicatorFrame;
use crate::strategy::base::{Signal, Strategy, TradeSetup};
use crate::strategy::patterns::{detect_reversal, near_support};
use rust_decimal::Decimal;
use tracing::debug;

pub struct ReversalStrategy {
    config: ReversalSettings,
}

impl ReversalStrategy {
    pub fn new(config: ReversalSettings) -> Self {
        Self { config }
    }

    /// Mean volume of the window ending at `index`, current bar included
    fn volume_average(&self, frame: &IndicatorFrame, index: usize) -> Option<Decimal> {
        let window = self.config.volume_window;
        if window == 0 || index + 1 < window {
            return None;
        }

        let sum: Decimal = frame.candles[index + 1 - window..=index]
            .iter()
            .map(|c| c.volume)
            .sum();
        Some(sum / Decimal::from(window))
    }
}

impl Strategy for ReversalStrategy {
    fn name(&self) -> &str {
        "reversal"
    }

    fn warmup(&self) -> usize {
        self.config.volume_window.saturating_sub(1).max(1)
    }

    fn analyze(&self, frame: &IndicatorFrame, index: usize) -> Signal {
        if index == 0 {
            return Signal::Hold;
        }
        let Some(curr) = frame.candles.get(index) else {
            return Signal::Hold;
        };
        let prev = &frame.candles[index - 1];

        let Some(pattern) = detect_reversal(Some(prev), curr) else {
            return Signal::Hold;
        };

        let Some(avg_volume) = self.volume_average(frame, index) else {
            return Signal::Hold;
        };
        if curr.volume <= avg_volume {
            return Signal::Hold;
        }

        if !near_support(
            &frame.candles,
            index,
            self.config.support_lookback,
            self.config.support_tolerance_pct,
        ) {
            return Signal::Hold;
        }

        let entry = curr.high + self.config.entry_buffer;
        let stop = curr.low;
        let target = curr.high + curr.range() * self.config.reward_ratio;

        debug!(
            "{}: {} at {} near support (vol {} > avg {})",
            frame.symbol, pattern, curr.timestamp, curr.volume, avg_volume
        );

        Signal::Enter(TradeSetup::new(entry, stop, target).with_pattern(pattern))
    }
}
