//! Hand-built bar series for unit tests

use crate::config::IndicatorSettings;
use crate::data::{BarSeries, Candle, IndicatorFrame, Interval};
use chrono::{Duration, TimeZone, Utc};
use rust_decimal::Decimal;

/// Daily bars from `(open, high, low, close, volume)` tuples, one day apart
pub fn daily(symbol: &str, bars: &[(f64, f64, f64, f64, f64)]) -> BarSeries {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 3, 45, 0).unwrap();
    let candles = bars
        .iter()
        .enumerate()
        .map(|(i, &(o, h, l, c, v))| {
            Candle::new(
                start + Duration::days(i as i64),
                dec(o),
                dec(h),
                dec(l),
                dec(c),
                dec(v),
            )
        })
        .collect();
    BarSeries::new(symbol, Interval::Daily, candles)
}

/// `n` quiet bars oscillating around 100 with flat volume
pub fn flat(n: usize) -> Vec<(f64, f64, f64, f64, f64)> {
    (0..n)
        .map(|i| {
            let close = if i % 2 == 0 { 100.0 } else { 100.5 };
            (100.0, 101.0, 99.0, close, 1000.0)
        })
        .collect()
}

pub fn frame(series: &BarSeries) -> IndicatorFrame {
    IndicatorFrame::compute(series, &IndicatorSettings::default())
}

pub fn dec(value: f64) -> Decimal {
    Decimal::try_from(value).unwrap()
}
