use anyhow::anyhow;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

impl Candle {
    pub fn new(
        timestamp: DateTime<Utc>,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    pub fn body_size(&self) -> Decimal {
        (self.close - self.open).abs()
    }

    pub fn range(&self) -> Decimal {
        self.high - self.low
    }

    pub fn upper_wick(&self) -> Decimal {
        self.high - self.open.max(self.close)
    }

    pub fn lower_wick(&self) -> Decimal {
        self.open.min(self.close) - self.low
    }
}

/// Bar size understood by the price-history provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interval {
    FiveMinutes,
    FifteenMinutes,
    ThirtyMinutes,
    OneHour,
    Daily,
    Weekly,
}

impl Interval {
    /// Provider query value, also used for cache file names
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::FiveMinutes => "5m",
            Interval::FifteenMinutes => "15m",
            Interval::ThirtyMinutes => "30m",
            Interval::OneHour => "60m",
            Interval::Daily => "1d",
            Interval::Weekly => "1wk",
        }
    }

    pub fn is_intraday(&self) -> bool {
        !matches!(self, Interval::Daily | Interval::Weekly)
    }
}

impl FromStr for Interval {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "5m" | "5min" => Ok(Interval::FiveMinutes),
            "15m" | "15min" => Ok(Interval::FifteenMinutes),
            "30m" | "30min" => Ok(Interval::ThirtyMinutes),
            "1h" | "60m" => Ok(Interval::OneHour),
            "1d" | "1day" | "daily" => Ok(Interval::Daily),
            "1w" | "1wk" | "weekly" => Ok(Interval::Weekly),
            other => Err(anyhow!("Unsupported interval '{}'", other)),
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Interval {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Price-bar table for one symbol, oldest bar first
#[derive(Debug, Clone, Serialize)]
pub struct BarSeries {
    pub symbol: String,
    pub interval: Interval,
    pub candles: Vec<Candle>,
}

impl BarSeries {
    /// Build a series, sorting by time and keeping the last bar seen per timestamp
    pub fn new(symbol: &str, interval: Interval, mut candles: Vec<Candle>) -> Self {
        candles.sort_by_key(|c| c.timestamp);
        let mut deduped: Vec<Candle> = Vec::with_capacity(candles.len());
        for candle in candles {
            match deduped.last_mut() {
                Some(last) if last.timestamp == candle.timestamp => *last = candle,
                _ => deduped.push(candle),
            }
        }

        Self {
            symbol: symbol.to_string(),
            interval,
            candles: deduped,
        }
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn closes(&self) -> Vec<Decimal> {
        self.candles.iter().map(|c| c.close).collect()
    }

    pub fn highs(&self) -> Vec<Decimal> {
        self.candles.iter().map(|c| c.high).collect()
    }

    pub fn lows(&self) -> Vec<Decimal> {
        self.candles.iter().map(|c| c.low).collect()
    }

    pub fn volumes(&self) -> Vec<Decimal> {
        self.candles.iter().map(|c| c.volume).collect()
    }

    /// Bars with `start <= timestamp < end`
    pub fn between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            symbol: self.symbol.clone(),
            interval: self.interval,
            candles: self
                .candles
                .iter()
                .filter(|c| c.timestamp >= start && c.timestamp < end)
                .cloned()
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn candle(day: u32, open: Decimal, close: Decimal) -> Candle {
        Candle::new(
            Utc.with_ymd_and_hms(2024, 1, day, 3, 45, 0).unwrap(),
            open,
            open.max(close) + dec!(1),
            open.min(close) - dec!(1),
            close,
            dec!(1000),
        )
    }

    #[test]
    fn test_wicks() {
        let c = Candle::new(Utc::now(), dec!(100), dec!(103), dec!(94), dec!(101), dec!(10));
        assert_eq!(c.body_size(), dec!(1));
        assert_eq!(c.upper_wick(), dec!(2));
        assert_eq!(c.lower_wick(), dec!(6));
        assert!(c.is_bullish());
        assert_eq!(c.range(), dec!(9));
    }

    #[test]
    fn test_series_sorted_and_deduped() {
        let series = BarSeries::new(
            "INFY",
            Interval::Daily,
            vec![
                candle(3, dec!(10), dec!(11)),
                candle(1, dec!(10), dec!(9)),
                candle(3, dec!(11), dec!(12)),
            ],
        );

        assert_eq!(series.len(), 2);
        assert_eq!(series.candles[0].close, dec!(9));
        assert_eq!(series.candles[1].close, dec!(12));
    }

    #[test]
    fn test_interval_parsing() {
        assert_eq!("5m".parse::<Interval>().unwrap(), Interval::FiveMinutes);
        assert_eq!("1H".parse::<Interval>().unwrap(), Interval::OneHour);
        assert_eq!(Interval::OneHour.as_str(), "60m");
        assert!("2m".parse::<Interval>().is_err());
        assert!(!Interval::Daily.is_intraday());
    }
}
