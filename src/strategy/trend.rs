//! Trend Breakout Strategy
//!
//! Breakout above the prior `lookback`-bar high, filtered by momentum and
//! trend strength: RSI inside a band, ADX above a floor, MACD histogram
//! positive and volume above its rolling average. The stop is placed an
//! ATR multiple below the entry.

use crate::config::TrendSettings;
use crate::data::IndicatorFrame;
use crate::strategy::base::{Signal, Strategy, TradeSetup};
use crate::strategy::breakout::prior_range;
use rust_decimal::Decimal;
use tracing::debug;

pub struct TrendBreakoutStrategy {
    config: TrendSettings,
}

impl TrendBreakoutStrategy {
    pub fn new(config: TrendSettings) -> Self {
        Self { config }
    }
}

impl Strategy for TrendBreakoutStrategy {
    fn name(&self) -> &str {
        "trend"
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
        if day.close <= range.high {
            return Signal::Hold;
        }

        let (Some(volume_avg), Some(rsi), Some(adx), Some(hist), Some(atr)) = (
            frame.volume_avg[index],
            frame.rsi[index],
            frame.adx[index],
            frame.macd_hist[index],
            frame.atr[index],
        ) else {
            return Signal::Hold;
        };

        if day.volume <= volume_avg
            || rsi < self.config.rsi_min
            || rsi > self.config.rsi_max
            || adx < self.config.adx_min
            || hist <= Decimal::ZERO
        {
            return Signal::Hold;
        }

        let entry = day.close;
        let stop = entry - atr * self.config.atr_multiplier;
        if stop >= entry {
            return Signal::Hold;
        }
        let target = entry + (entry - stop) * self.config.reward_ratio;

        debug!(
            "{}: Trend breakout on {} - close {} > {} (RSI {:.1}, ADX {:.1})",
            frame.symbol,
            day.timestamp.date_naive(),
            day.close,
            range.high,
            rsi,
            adx
        );

        Signal::Enter(TradeSetup::new(entry, stop, target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use crate::data::fixtures::{daily, frame};

    /// Accelerating uptrend with a volume spike on the last bar
    fn accelerating(n: usize) -> Vec<(f64, f64, f64, f64, f64)> {
        (0..n)
            .map(|i| {
                let i = i as f64;
                let close = 100.0 + i + 0.05 * i * i;
                let volume = if i as usize == n - 1 { 3000.0 } else { 1000.0 };
                (close - 0.2, close + 0.5, close - 0.5, close, volume)
            })
            .collect()
    }

    #[test]
    fn test_rsi_ceiling_blocks_overextended_breakout() {
        let frame = frame(&daily("LT", &accelerating(60)));
        let strategy = TrendBreakoutStrategy::new(TrendSettings::default());

        // Nothing but up days: RSI is pinned at 100
        assert_eq!(frame.rsi[59], Some(dec!(100)));
        assert_eq!(strategy.analyze(&frame, 59), Signal::Hold);
    }

    #[test]
    fn test_entry_with_atr_stop() {
        let frame = frame(&daily("LT", &accelerating(60)));
        let strategy = TrendBreakoutStrategy::new(TrendSettings {
            rsi_max: dec!(100),
            ..TrendSettings::default()
        });

        let Signal::Enter(setup) = strategy.analyze(&frame, 59) else {
            panic!("expected a trend entry");
        };

        let atr = frame.atr[59].unwrap();
        assert_eq!(setup.entry, frame.candles[59].close);
        assert_eq!(setup.stop, setup.entry - atr * dec!(1.5));
        assert_eq!(setup.target, setup.entry + (setup.entry - setup.stop) * dec!(2));
    }

    #[test]
    fn test_volume_filter() {
        let mut bars = accelerating(60);
        bars[59].4 = 1000.0;
        let frame = frame(&daily("LT", &bars));
        let strategy = TrendBreakoutStrategy::new(TrendSettings {
            rsi_max: dec!(100),
            ..TrendSettings::default()
        });

        assert_eq!(strategy.analyze(&frame, 59), Signal::Hold);
    }
}
