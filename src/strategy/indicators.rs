//! Technical indicators for screening rules
//!
//! Series functions return one value per input bar, `None` until enough
//! history has accumulated. `sma`, `highest` and `lowest` work on the
//! trailing window of a slice.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// MACD line, signal line and histogram, aligned with the input prices
#[derive(Debug, Clone, Default)]
pub struct MacdSeries {
    pub macd: Vec<Option<Decimal>>,
    pub signal: Vec<Option<Decimal>>,
    pub histogram: Vec<Option<Decimal>>,
}

#[derive(Debug, Clone, Default)]
pub struct BollingerSeries {
    pub lower: Vec<Option<Decimal>>,
    pub middle: Vec<Option<Decimal>>,
    pub upper: Vec<Option<Decimal>>,
}

/// Trailing `period` values, `None` when the slice is shorter
fn trailing(values: &[Decimal], period: usize) -> Option<&[Decimal]> {
    if period == 0 {
        return None;
    }
    values.get(values.len().checked_sub(period)?..)
}

/// Mean of the trailing `period` values
pub fn sma(values: &[Decimal], period: usize) -> Option<Decimal> {
    let window = trailing(values, period)?;
    Some(window.iter().sum::<Decimal>() / Decimal::from(period))
}

/// Rolling mean over a window ending at each bar (inclusive)
pub fn sma_series(values: &[Decimal], period: usize) -> Vec<Option<Decimal>> {
    let mut out = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }

    let divisor = Decimal::from(period);
    let mut sum: Decimal = values[..period].iter().sum();
    out[period - 1] = Some(sum / divisor);

    for i in period..values.len() {
        sum += values[i] - values[i - period];
        out[i] = Some(sum / divisor);
    }

    out
}

/// Same as `sma_series`; reads better for volume columns
pub fn rolling_mean(values: &[Decimal], window: usize) -> Vec<Option<Decimal>> {
    sma_series(values, window)
}

/// EMA seeded with the SMA of the first `period` prices
pub fn ema_series(prices: &[Decimal], period: usize) -> Vec<Option<Decimal>> {
    let mut out = vec![None; prices.len()];
    if prices.len() < period || period == 0 {
        return out;
    }

    let multiplier = Decimal::from(2) / Decimal::from(period + 1);
    let mut ema = prices.iter().take(period).sum::<Decimal>() / Decimal::from(period);
    out[period - 1] = Some(ema);

    for (i, price) in prices.iter().enumerate().skip(period) {
        ema = (*price - ema) * multiplier + ema;
        out[i] = Some(ema);
    }

    out
}

/// EMA over a column that starts with a run of `None`s
fn ema_of_defined(values: &[Option<Decimal>], period: usize) -> Vec<Option<Decimal>> {
    let Some(first) = values.iter().position(Option::is_some) else {
        return vec![None; values.len()];
    };

    let defined: Vec<Decimal> = values[first..].iter().map(|v| v.unwrap_or_default()).collect();
    let mut out = vec![None; first];
    out.extend(ema_series(&defined, period));
    out
}

fn window_std_dev(window: &[Decimal]) -> Option<Decimal> {
    if window.is_empty() {
        return None;
    }

    let n = Decimal::from(window.len());
    let mean = window.iter().sum::<Decimal>() / n;
    let variance: Decimal = window.iter().map(|p| (*p - mean) * (*p - mean)).sum::<Decimal>() / n;

    let std_dev_f64 = variance.to_f64()?.sqrt();
    Decimal::try_from(std_dev_f64).ok()
}

/// RSI with Wilder smoothing; the first value lands on bar `period`
pub fn rsi_series(prices: &[Decimal], period: usize) -> Vec<Option<Decimal>> {
    let mut out = vec![None; prices.len()];
    if prices.len() < period + 1 || period == 0 {
        return out;
    }

    let mut gains = Vec::with_capacity(prices.len());
    let mut losses = Vec::with_capacity(prices.len());

    for i in 1..prices.len() {
        let change = prices[i] - prices[i - 1];
        if change > Decimal::ZERO {
            gains.push(change);
            losses.push(Decimal::ZERO);
        } else {
            gains.push(Decimal::ZERO);
            losses.push(change.abs());
        }
    }

    let p = Decimal::from(period);
    let mut avg_gain: Decimal = gains.iter().take(period).sum::<Decimal>() / p;
    let mut avg_loss: Decimal = losses.iter().take(period).sum::<Decimal>() / p;
    out[period] = Some(rsi_value(avg_gain, avg_loss));

    // gains[k] is the change into bar k + 1
    for k in period..gains.len() {
        avg_gain = (avg_gain * (p - Decimal::ONE) + gains[k]) / p;
        avg_loss = (avg_loss * (p - Decimal::ONE) + losses[k]) / p;
        out[k + 1] = Some(rsi_value(avg_gain, avg_loss));
    }

    out
}

fn rsi_value(avg_gain: Decimal, avg_loss: Decimal) -> Decimal {
    if avg_loss.is_zero() {
        return dec!(100);
    }

    let rs = avg_gain / avg_loss;
    dec!(100) - (dec!(100) / (dec!(1) + rs))
}

/// MACD (fast EMA - slow EMA) with its signal EMA and histogram
pub fn macd_series(prices: &[Decimal], fast: usize, slow: usize, signal: usize) -> MacdSeries {
    let fast_ema = ema_series(prices, fast);
    let slow_ema = ema_series(prices, slow);

    let macd: Vec<Option<Decimal>> = fast_ema
        .iter()
        .zip(&slow_ema)
        .map(|(f, s)| Some((*f)? - (*s)?))
        .collect();

    let signal_line = ema_of_defined(&macd, signal);

    let histogram = macd
        .iter()
        .zip(&signal_line)
        .map(|(m, s)| Some((*m)? - (*s)?))
        .collect();

    MacdSeries {
        macd,
        signal: signal_line,
        histogram,
    }
}

fn true_ranges(highs: &[Decimal], lows: &[Decimal], closes: &[Decimal]) -> Vec<Decimal> {
    let mut true_ranges = vec![Decimal::ZERO; highs.len()];

    for i in 1..highs.len() {
        let high_low = highs[i] - lows[i];
        let high_close = (highs[i] - closes[i - 1]).abs();
        let low_close = (lows[i] - closes[i - 1]).abs();

        true_ranges[i] = high_low.max(high_close).max(low_close);
    }

    true_ranges
}

fn aligned(highs: &[Decimal], lows: &[Decimal], closes: &[Decimal]) -> bool {
    highs.len() == lows.len() && lows.len() == closes.len()
}

/// ATR with Wilder smoothing; the first value lands on bar `period`
pub fn atr_series(
    highs: &[Decimal],
    lows: &[Decimal],
    closes: &[Decimal],
    period: usize,
) -> Vec<Option<Decimal>> {
    let mut out = vec![None; closes.len()];
    if period == 0 || !aligned(highs, lows, closes) || closes.len() < period + 1 {
        return out;
    }

    let tr = true_ranges(highs, lows, closes);
    let p = Decimal::from(period);

    let mut atr: Decimal = tr[1..=period].iter().sum::<Decimal>() / p;
    out[period] = Some(atr);

    for i in (period + 1)..tr.len() {
        atr = (atr * (p - Decimal::ONE) + tr[i]) / p;
        out[i] = Some(atr);
    }

    out
}

/// ADX with Wilder smoothing of +DM, -DM and TR. DX starts on bar `period`,
/// ADX on bar `2 * period - 1`.
pub fn adx_series(
    highs: &[Decimal],
    lows: &[Decimal],
    closes: &[Decimal],
    period: usize,
) -> Vec<Option<Decimal>> {
    let n = closes.len();
    let mut out = vec![None; n];
    if period == 0 || !aligned(highs, lows, closes) || n < 2 * period {
        return out;
    }

    let tr = true_ranges(highs, lows, closes);
    let mut plus_dm = vec![Decimal::ZERO; n];
    let mut minus_dm = vec![Decimal::ZERO; n];

    for i in 1..n {
        let up = highs[i] - highs[i - 1];
        let down = lows[i - 1] - lows[i];
        if up > down && up > Decimal::ZERO {
            plus_dm[i] = up;
        }
        if down > up && down > Decimal::ZERO {
            minus_dm[i] = down;
        }
    }

    let p = Decimal::from(period);
    let mut tr_s: Decimal = tr[1..=period].iter().sum();
    let mut plus_s: Decimal = plus_dm[1..=period].iter().sum();
    let mut minus_s: Decimal = minus_dm[1..=period].iter().sum();

    // dx[k] belongs to bar period + k
    let mut dx = Vec::with_capacity(n - period);
    dx.push(dx_value(plus_s, minus_s, tr_s));

    for i in (period + 1)..n {
        tr_s = tr_s - tr_s / p + tr[i];
        plus_s = plus_s - plus_s / p + plus_dm[i];
        minus_s = minus_s - minus_s / p + minus_dm[i];
        dx.push(dx_value(plus_s, minus_s, tr_s));
    }

    let mut adx = dx.iter().take(period).sum::<Decimal>() / p;
    out[2 * period - 1] = Some(adx);

    for (k, value) in dx.iter().enumerate().skip(period) {
        adx = (adx * (p - Decimal::ONE) + *value) / p;
        out[period + k] = Some(adx);
    }

    out
}

fn dx_value(plus_dm: Decimal, minus_dm: Decimal, tr: Decimal) -> Decimal {
    if tr.is_zero() {
        return Decimal::ZERO;
    }

    let plus_di = dec!(100) * plus_dm / tr;
    let minus_di = dec!(100) * minus_dm / tr;
    let sum = plus_di + minus_di;

    if sum.is_zero() {
        Decimal::ZERO
    } else {
        dec!(100) * (plus_di - minus_di).abs() / sum
    }
}

/// Bollinger Bands around the SMA, `num_std_devs` population deviations wide
pub fn bollinger_series(prices: &[Decimal], period: usize, num_std_devs: f64) -> BollingerSeries {
    let middle = sma_series(prices, period);
    let mut lower = vec![None; prices.len()];
    let mut upper = vec![None; prices.len()];

    let Ok(multiplier) = Decimal::try_from(num_std_devs) else {
        return BollingerSeries {
            lower,
            middle,
            upper,
        };
    };

    for (i, mid) in middle.iter().enumerate() {
        let Some(mid) = mid else { continue };
        let Some(std) = window_std_dev(&prices[i + 1 - period..=i]) else {
            continue;
        };
        lower[i] = Some(*mid - std * multiplier);
        upper[i] = Some(*mid + std * multiplier);
    }

    BollingerSeries {
        lower,
        middle,
        upper,
    }
}

/// Max of the trailing `period` values
pub fn highest(values: &[Decimal], period: usize) -> Option<Decimal> {
    trailing(values, period)?.iter().max().copied()
}

/// Min of the trailing `period` values
pub fn lowest(values: &[Decimal], period: usize) -> Option<Decimal> {
    trailing(values, period)?.iter().min().copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rising(n: usize) -> Vec<Decimal> {
        (0..n).map(|i| Decimal::from(100 + i)).collect()
    }

    /// Drifting sine wave rounded to paise, with uneven bar ranges
    fn wave() -> (Vec<Decimal>, Vec<Decimal>, Vec<Decimal>) {
        let closes: Vec<Decimal> = (0..60)
            .map(|i| {
                let x = 100.0 + 10.0 * (i as f64 / 5.0).sin() + 0.3 * i as f64;
                Decimal::try_from(x).unwrap().round_dp(2)
            })
            .collect();
        let highs = closes
            .iter()
            .enumerate()
            .map(|(i, c)| c + dec!(1) + dec!(0.5) * Decimal::from(i % 3))
            .collect();
        let lows = closes
            .iter()
            .enumerate()
            .map(|(i, c)| c - dec!(1) - dec!(0.5) * Decimal::from(i % 2))
            .collect();
        (highs, lows, closes)
    }

    fn assert_close(actual: Option<Decimal>, expected: Decimal) {
        let actual = actual.expect("indicator value");
        assert!(
            (actual - expected).abs() < dec!(0.000001),
            "expected {} got {}",
            expected,
            actual
        );
    }

    #[test]
    fn test_trailing_window() {
        let values = vec![dec!(10), dec!(15), dec!(12), dec!(18), dec!(14)];
        assert_eq!(sma(&values, 2), Some(dec!(16)));
        assert_eq!(highest(&values, 3), Some(dec!(18)));
        assert_eq!(lowest(&values, 3), Some(dec!(12)));
        assert_eq!(lowest(&values, 5), Some(dec!(10)));
        assert_eq!(highest(&values, 6), None);
        assert_eq!(sma(&values, 0), None);
    }

    #[test]
    fn test_sma_series_alignment() {
        let prices = vec![dec!(10), dec!(11), dec!(12), dec!(13), dec!(14)];
        let series = sma_series(&prices, 3);
        assert_eq!(series, vec![None, None, Some(dec!(11)), Some(dec!(12)), Some(dec!(13))]);
        assert!(sma_series(&prices, 0).iter().all(Option::is_none));
        assert!(sma_series(&prices, 6).iter().all(Option::is_none));
    }

    #[test]
    fn test_ema_seeded_with_sma() {
        let prices = vec![dec!(2), dec!(4), dec!(6), dec!(8)];
        let series = ema_series(&prices, 3);
        assert_eq!(series[1], None);
        assert_eq!(series[2], Some(dec!(4)));
        // (8 - 4) * 0.5 + 4
        assert_eq!(series[3], Some(dec!(6)));
    }

    #[test]
    fn test_rsi_wilder_values() {
        let (_, _, closes) = wave();
        let series = rsi_series(&closes, 14);
        assert!(series[13].is_none());
        assert_close(series[14], dec!(71.783035));
        assert_close(series[59], dec!(51.342647));
    }

    #[test]
    fn test_rsi_without_losses() {
        let series = rsi_series(&rising(20), 14);
        assert_eq!(series[19], Some(dec!(100)));
    }

    #[test]
    fn test_macd_values() {
        let (_, _, closes) = wave();
        let series = macd_series(&closes, 12, 26, 9);
        assert!(series.macd[24].is_none());
        assert!(series.macd[25].is_some());
        assert!(series.signal[32].is_none());
        assert!(series.signal[33].is_some());

        assert_close(series.macd[59], dec!(-1.149634));
        assert_close(series.signal[59], dec!(-0.631084));
        assert_close(series.histogram[59], dec!(-1.149634) - dec!(-0.631084));
    }

    #[test]
    fn test_atr_wilder_values() {
        let (highs, lows, closes) = wave();
        let series = atr_series(&highs, &lows, &closes, 14);
        assert!(series[13].is_none());
        assert_close(series[14], dec!(3.046429));
        assert_close(series[59], dec!(2.943751));
    }

    #[test]
    fn test_atr_constant_range() {
        let highs = vec![dec!(11); 10];
        let lows = vec![dec!(9); 10];
        let closes = vec![dec!(10); 10];
        let series = atr_series(&highs, &lows, &closes, 3);
        assert!(series[2].is_none());
        assert_eq!(series[3], Some(dec!(2)));
        assert_eq!(series[9], Some(dec!(2)));
    }

    #[test]
    fn test_adx_wilder_values() {
        let (highs, lows, closes) = wave();
        let series = adx_series(&highs, &lows, &closes, 14);
        assert!(series[26].is_none());
        assert_close(series[27], dec!(15.080332));
        assert_close(series[59], dec!(26.249293));
    }

    #[test]
    fn test_adx_one_sided_trend() {
        let closes = rising(40);
        let highs: Vec<Decimal> = closes.iter().map(|c| c + dec!(1)).collect();
        let lows: Vec<Decimal> = closes.iter().map(|c| c - dec!(1)).collect();

        // Only +DM is ever positive, so DX (and ADX) is pinned at 100
        let series = adx_series(&highs, &lows, &closes, 14);
        assert_eq!(series[39], Some(dec!(100)));
        assert!(adx_series(&closes[..20], &closes[..20], &closes[..20], 14)
            .iter()
            .all(Option::is_none));
    }

    #[test]
    fn test_bollinger_flat_prices() {
        let prices = vec![dec!(50); 25];
        let series = bollinger_series(&prices, 20, 2.0);
        assert!(series.upper[18].is_none());
        assert_eq!(series.lower[19], Some(dec!(50)));
        assert_eq!(series.middle[19], Some(dec!(50)));
        assert_eq!(series.upper[19], Some(dec!(50)));
    }

    #[test]
    fn test_bollinger_width() {
        // Population std-dev of 1..=4 is sqrt(1.25)
        let prices = vec![dec!(1), dec!(2), dec!(3), dec!(4)];
        let series = bollinger_series(&prices, 4, 2.0);
        assert_eq!(series.middle[3], Some(dec!(2.5)));
        assert_close(series.upper[3], dec!(4.736068));
        assert_close(series.lower[3], dec!(0.263932));
    }
}
