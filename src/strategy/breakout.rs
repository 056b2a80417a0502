//! Swing Breakout Strategy
//!
//! Buys when the daily close breaks above the highest high of the previous
//! `lookback` bars on above-average volume. The stop sits at the lowest low
//! of that range and the target at a fixed reward-to-risk multiple.

use crate::config::SwingSettings;
use crate::data::{Candle, IndicatorFrame};
use crate::strategy::base::{Signal, Strategy, TradeSetup};
use crate::strategy::indicators::{highest, lowest, sma};
use rust_decimal::Decimal;
use tracing::debug;

/// High, low and mean volume of a consolidation window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriorRange {
    pub high: Decimal,
    pub low: Decimal,
    pub avg_volume: Decimal,
}

/// Range of the `lookback` bars strictly before `index`
pub fn prior_range(candles: &[Candle], index: usize, lookback: usize) -> Option<PriorRange> {
    if lookback == 0 || index < lookback || index > candles.len() {
        return None;
    }

    let window = &candles[index - lookback..index];
    let highs: Vec<Decimal> = window.iter().map(|c| c.high).collect();
    let lows: Vec<Decimal> = window.iter().map(|c| c.low).collect();
    let volumes: Vec<Decimal> = window.iter().map(|c| c.volume).collect();

    Some(PriorRange {
        high: highest(&highs, lookback)?,
        low: lowest(&lows, lookback)?,
        avg_volume: sma(&volumes, lookback)?,
    })
}

pub struct SwingBreakoutStrategy {
    config: SwingSettings,
}

impl SwingBreakoutStrategy {
    pub fn new(config: SwingSettings) -> Self {
        Self { config }
    }
}

impl Strategy for SwingBreakoutStrategy {
    fn name(&self) -> &str {
        "swing"
    }

    fn warmup(&self) -> usize {
        self.config.lookback
    }

    fn analyze(&self, frame: &IndicatorFrame, index: usize) -> Signal {
        let Some(day) = frame.candles.get(index) else {
            return Signal::Hold;
        };
        let Some(range) = prior_range(&frame.candles, index, self.config.lookback) else {
            return Signal::Hold;
        };

        if day.close <= range.high || day.volume <= range.avg_volume {
            return Signal::Hold;
        }

        let entry = day.close;
        let stop = range.low;
        let target = entry + (entry - stop) * self.config.reward_ratio;

        debug!(
            "{}: Breakout on {} - close {} > range high {} (vol {} > avg {})",
            frame.symbol,
            day.timestamp.date_naive(),
            day.close,
            range.high,
            day.volume,
            range.avg_volume
        );

        Signal::Enter(TradeSetup::new(entry, stop, target))
    }
}
