//! In-memory provider for tests

use crate::api::error::DataError;
use crate::api::provider::{BarWindow, MarketDataProvider};
use crate::data::{normalize, BarSeries, Interval};
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Default)]
pub struct MemoryProvider {
    series: HashMap<String, BarSeries>,
    failing: Mutex<HashSet<String>>,
    calls: AtomicUsize,
    /// Ignore the window and return every stored bar
    pub ignore_window: bool,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_series(mut self, series: BarSeries) -> Self {
        self.series.insert(normalize(&series.symbol), series);
        self
    }

    pub fn unbounded(mut self) -> Self {
        self.ignore_window = true;
        self
    }

    pub fn fail(&self, symbol: &str) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.insert(normalize(symbol));
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketDataProvider for MemoryProvider {
    async fn fetch_bars(
        &self,
        symbol: &str,
        interval: Interval,
        window: &BarWindow,
    ) -> Result<BarSeries> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let symbol = normalize(symbol);

        let failing = self
            .failing
            .lock()
            .map(|f| f.contains(&symbol))
            .unwrap_or(false);
        if failing {
            return Err(DataError::Provider {
                symbol,
                code: "503".to_string(),
                description: "simulated outage".to_string(),
            }
            .into());
        }

        let stored = self
            .series
            .get(&symbol)
            .ok_or_else(|| DataError::NoData(symbol.clone()))?;

        let candles = match (self.ignore_window, window.bounds(Utc::now())) {
            (false, Some((start, end))) => stored.between(start, end).candles,
            _ => stored.candles.clone(),
        };

        if candles.is_empty() {
            return Err(DataError::NoData(symbol).into());
        }

        Ok(BarSeries::new(&symbol, interval, candles))
    }
}
