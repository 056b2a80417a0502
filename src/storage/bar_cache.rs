//! Parquet bar cache with incremental merging
//!
//! Every successful fetch is merged into `{data_dir}/bars/{SYMBOL}/{interval}.parquet`
//! so repeated runs build up history and a provider outage can still be
//! served from disk.

use crate::api::{BarWindow, MarketDataProvider};
use crate::data::{normalize, BarSeries, Candle, Interval};
use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringBuilder};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct BarCache {
    data_dir: PathBuf,
}

impl BarCache {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }

    /// Parquet file path for a symbol/interval
    pub fn path(&self, symbol: &str, interval: Interval) -> PathBuf {
        let symbol_safe = normalize(symbol).replace(['/', '^', '.'], "_");
        self.data_dir
            .join("bars")
            .join(symbol_safe)
            .join(format!("{}.parquet", interval.as_str()))
    }

    /// Load cached bars, oldest first. A missing file is an empty cache.
    pub fn load(&self, symbol: &str, interval: Interval) -> Result<Vec<Candle>> {
        let path = self.path(symbol, interval);

        if !path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&path).with_context(|| format!("Failed to open {}", path.display()))?;
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

        let mut candles = Vec::new();
        for batch in reader {
            let batch = batch?;
            let float_col = |name: &str| {
                batch
                    .column_by_name(name)
                    .and_then(|c| c.as_any().downcast_ref::<Float64Array>())
            };
            let ts_col = batch
                .column_by_name("ts")
                .and_then(|c| c.as_any().downcast_ref::<Int64Array>());

            if let (Some(ts), Some(open), Some(high), Some(low), Some(close), Some(vol)) = (
                ts_col,
                float_col("open"),
                float_col("high"),
                float_col("low"),
                float_col("close"),
                float_col("volume"),
            ) {
                for i in 0..batch.num_rows() {
                    let row = (
                        Utc.timestamp_millis_opt(ts.value(i)).single(),
                        Decimal::try_from(open.value(i)),
                        Decimal::try_from(high.value(i)),
                        Decimal::try_from(low.value(i)),
                        Decimal::try_from(close.value(i)),
                        Decimal::try_from(vol.value(i)),
                    );
                    if let (Some(t), Ok(o), Ok(h), Ok(l), Ok(c), Ok(v)) = row {
                        candles.push(Candle::new(t, o, h, l, c, v));
                    }
                }
            }
        }

        debug!(
            "Loaded {} cached bars for {} interval={}",
            candles.len(),
            symbol,
            interval
        );
        Ok(candles)
    }

    /// Merge new bars into existing ones by timestamp, newer data winning.
    /// Returns the merged bars and how many timestamps overlapped.
    pub fn merge(existing: Vec<Candle>, new: Vec<Candle>) -> (Vec<Candle>, usize) {
        let total = existing.len() + new.len();

        let mut by_time = BTreeMap::new();
        for candle in existing.into_iter().chain(new) {
            by_time.insert(candle.timestamp, candle);
        }

        let overlap = total.saturating_sub(by_time.len());
        (by_time.into_values().collect(), overlap)
    }

    /// Write bars to the cache file, replacing its contents
    pub fn save(&self, symbol: &str, interval: Interval, candles: &[Candle]) -> Result<()> {
        if candles.is_empty() {
            return Ok(());
        }

        let path = self.path(symbol, interval);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let schema = Arc::new(Schema::new(vec![
            Field::new("ts", DataType::Int64, false),
            Field::new("symbol", DataType::Utf8, false),
            Field::new("open", DataType::Float64, false),
            Field::new("high", DataType::Float64, false),
            Field::new("low", DataType::Float64, false),
            Field::new("close", DataType::Float64, false),
            Field::new("volume", DataType::Float64, false),
        ]));

        let float_array = |f: fn(&Candle) -> Decimal| -> ArrayRef {
            Arc::new(Float64Array::from(
                candles
                    .iter()
                    .map(|c| f(c).to_f64().unwrap_or(f64::NAN))
                    .collect::<Vec<_>>(),
            ))
        };

        let ts_array: ArrayRef = Arc::new(Int64Array::from(
            candles
                .iter()
                .map(|c| c.timestamp.timestamp_millis())
                .collect::<Vec<_>>(),
        ));

        let symbol = normalize(symbol);
        let mut symbol_builder = StringBuilder::new();
        for _ in candles {
            symbol_builder.append_value(&symbol);
        }
        let symbol_array: ArrayRef = Arc::new(symbol_builder.finish());

        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                ts_array,
                symbol_array,
                float_array(|c| c.open),
                float_array(|c| c.high),
                float_array(|c| c.low),
                float_array(|c| c.close),
                float_array(|c| c.volume),
            ],
        )?;

        let file = File::create(&path)?;
        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();
        let mut writer = ArrowWriter::try_new(file, schema, Some(props))?;
        writer.write(&batch)?;
        writer.close()?;

        debug!("Saved {} bars to {}", candles.len(), path.display());
        Ok(())
    }

    /// Merge a freshly fetched series into the cache and persist it
    pub fn store(&self, series: &BarSeries) -> Result<usize> {
        let existing = self.load(&series.symbol, series.interval)?;
        let existing_count = existing.len();

        let (merged, overlap) = Self::merge(existing, series.candles.clone());

        if existing_count > 0 {
            info!(
                "{} interval={}: {} cached + {} new = {} total ({} overlap)",
                series.symbol,
                series.interval,
                existing_count,
                series.len(),
                merged.len(),
                overlap
            );
        }

        self.save(&series.symbol, series.interval, &merged)?;
        Ok(merged.len())
    }
}

/// Provider wrapper that writes through to a `BarCache` and falls back to it
/// when the upstream fetch fails.
pub struct CachedProvider<P> {
    inner: P,
    cache: BarCache,
}

impl<P: MarketDataProvider> CachedProvider<P> {
    pub fn new(inner: P, cache: BarCache) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl<P: MarketDataProvider> MarketDataProvider for CachedProvider<P> {
    async fn fetch_bars(
        &self,
        symbol: &str,
        interval: Interval,
        window: &BarWindow,
    ) -> Result<BarSeries> {
        match self.inner.fetch_bars(symbol, interval, window).await {
            Ok(series) => {
                if let Err(e) = self.cache.store(&series) {
                    warn!("Failed to cache bars for {}: {:#}", series.symbol, e);
                }
                Ok(series)
            }
            Err(fetch_err) => {
                let cached = self.cache.load(symbol, interval).unwrap_or_default();
                let series = BarSeries::new(&normalize(symbol), interval, cached);
                let series = match window.bounds(Utc::now()) {
                    Some((start, end)) => series.between(start, end),
                    None => series,
                };

                if series.is_empty() {
                    return Err(fetch_err);
                }

                warn!(
                    "Fetch failed for {} ({:#}), serving {} cached bars",
                    symbol,
                    fetch_err,
                    series.len()
                );
                Ok(series)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::memory::MemoryProvider;
    use crate::data::fixtures::{daily, flat};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn all_of_2024() -> BarWindow {
        BarWindow::Dates {
            start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        }
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let cache = BarCache::new(dir.path());
        let series = daily("TCS", &flat(5));

        cache.save("TCS", Interval::Daily, &series.candles).unwrap();
        assert!(dir.path().join("bars/TCS/1d.parquet").exists());

        let loaded = cache.load("tcs", Interval::Daily).unwrap();
        assert_eq!(loaded, series.candles);
        assert!(cache.load("TCS", Interval::FiveMinutes).unwrap().is_empty());
    }

    #[test]
    fn test_merge_newer_wins() {
        let old = daily("TCS", &flat(4)).candles;
        let mut new = daily("TCS", &flat(6)).candles[2..].to_vec();
        new[0].close = dec!(105);

        let (merged, overlap) = BarCache::merge(old, new);
        assert_eq!(merged.len(), 6);
        assert_eq!(overlap, 2);
        assert_eq!(merged[2].close, dec!(105));
        assert!(merged.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }

    #[test]
    fn test_index_symbol_path() {
        let cache = BarCache::new("data");
        assert_eq!(
            cache.path("^NSEI", Interval::FiveMinutes),
            PathBuf::from("data/bars/_NSEI/5m.parquet")
        );
    }

    #[tokio::test]
    async fn test_cached_provider_falls_back_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let inner = MemoryProvider::new().with_series(daily("INFY", &flat(8)));
        let provider = CachedProvider::new(inner, BarCache::new(dir.path()));
        let window = all_of_2024();

        let fresh = provider.fetch_bars("INFY", Interval::Daily, &window).await.unwrap();
        assert_eq!(fresh.len(), 8);

        provider.inner.fail("INFY");
        let cached = provider.fetch_bars("INFY", Interval::Daily, &window).await.unwrap();
        assert_eq!(cached.candles, fresh.candles);

        // Nothing cached for this symbol, so the upstream error surfaces
        assert!(provider.fetch_bars("WIPRO", Interval::Daily, &window).await.is_err());
        assert_eq!(provider.inner.calls(), 3);
    }
}
