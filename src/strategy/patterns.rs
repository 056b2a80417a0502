//! Candlestick reversal patterns

use crate::data::Candle;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CandlePattern {
    BullishEngulfing,
    Hammer,
}

impl fmt::Display for CandlePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CandlePattern::BullishEngulfing => write!(f, "Bullish Engulfing"),
            CandlePattern::Hammer => write!(f, "Hammer"),
        }
    }
}

/// Red candle followed by a green candle whose body swallows it
pub fn is_bullish_engulfing(prev: &Candle, curr: &Candle) -> bool {
    prev.is_bearish()
        && curr.is_bullish()
        && curr.open < prev.close
        && curr.close > prev.open
}

/// Long lower wick (more than twice the body) with a short upper wick
pub fn is_hammer(candle: &Candle) -> bool {
    let body = candle.body_size();
    candle.lower_wick() > dec!(2) * body && candle.upper_wick() < body
}

/// Engulfing wins over hammer when a bar matches both
pub fn detect_reversal(prev: Option<&Candle>, curr: &Candle) -> Option<CandlePattern> {
    if prev.is_some_and(|p| is_bullish_engulfing(p, curr)) {
        return Some(CandlePattern::BullishEngulfing);
    }
    if is_hammer(curr) {
        return Some(CandlePattern::Hammer);
    }
    None
}

/// Bar `index` trades within `tolerance_pct` above the lowest low of the
/// `lookback` bars ending at `index` (fewer at the start of the series).
pub fn near_support(candles: &[Candle], index: usize, lookback: usize, tolerance_pct: Decimal) -> bool {
    let Some(candle) = candles.get(index) else {
        return false;
    };
    if lookback == 0 {
        return false;
    }

    let start = (index + 1).saturating_sub(lookback);
    let Some(support) = candles[start..=index].iter().map(|c| c.low).min() else {
        return false;
    };

    candle.low <= support * (Decimal::ONE + tolerance_pct / dec!(100))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn ohlc(open: Decimal, high: Decimal, low: Decimal, close: Decimal) -> Candle {
        Candle::new(Utc::now(), open, high, low, close, dec!(100))
    }

    #[test]
    fn test_bullish_engulfing() {
        let prev = ohlc(dec!(105), dec!(106), dec!(99), dec!(100));
        let curr = ohlc(dec!(99), dec!(108), dec!(98), dec!(107));
        assert!(is_bullish_engulfing(&prev, &curr));

        // Green body that does not clear the prior open
        let weak = ohlc(dec!(99), dec!(105), dec!(98), dec!(104));
        assert!(!is_bullish_engulfing(&prev, &weak));

        // Prior candle must be red
        let green_prev = ohlc(dec!(100), dec!(106), dec!(99), dec!(105));
        assert!(!is_bullish_engulfing(&green_prev, &curr));
    }

    #[test]
    fn test_hammer() {
        // body 1, lower wick 5, upper wick 0.5
        let hammer = ohlc(dec!(100), dec!(101.5), dec!(95), dec!(101));
        assert!(is_hammer(&hammer));

        // Upper wick as long as the body
        let spinning = ohlc(dec!(100), dec!(102), dec!(95), dec!(101));
        assert!(!is_hammer(&spinning));

        // A doji has no body, so no upper wick can be shorter than it
        let doji = ohlc(dec!(100), dec!(100), dec!(90), dec!(100));
        assert!(!is_hammer(&doji));
    }

    #[test]
    fn test_detect_prefers_engulfing() {
        let prev = ohlc(dec!(105), dec!(106), dec!(99), dec!(100));
        let curr = ohlc(dec!(99), dec!(108), dec!(98), dec!(107));
        assert_eq!(detect_reversal(Some(&prev), &curr), Some(CandlePattern::BullishEngulfing));

        let hammer = ohlc(dec!(100), dec!(101.5), dec!(95), dec!(101));
        assert_eq!(detect_reversal(None, &hammer), Some(CandlePattern::Hammer));
        assert_eq!(detect_reversal(None, &prev), None);
    }

    #[test]
    fn test_near_support() {
        let candles = vec![
            ohlc(dec!(100), dec!(101), dec!(90), dec!(100)),
            ohlc(dec!(100), dec!(101), dec!(95), dec!(100)),
            ohlc(dec!(100), dec!(101), dec!(90.3), dec!(100)),
            ohlc(dec!(100), dec!(101), dec!(92), dec!(100)),
        ];

        // 90.3 is within 0.5% of 90
        assert!(near_support(&candles, 2, 20, dec!(0.5)));
        // 92 is not
        assert!(!near_support(&candles, 3, 20, dec!(0.5)));
        // Window of 2 ending at bar 3 has support 90.3; 92 is still too far
        assert!(!near_support(&candles, 3, 2, dec!(0.5)));
        // A bar that sets the low is always at support
        assert!(near_support(&candles, 0, 20, dec!(0.5)));
        assert!(!near_support(&candles, 9, 20, dec!(0.5)));
    }
}
