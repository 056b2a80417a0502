//! Intraday screener
//!
//! Pulls today's intraday bars for each symbol and reports every bar where
//! the configured rule fires, latest bar included.

use crate::api::{BarWindow, MarketDataProvider};
use crate::config::{IndicatorSettings, ScannerConfig};
use crate::data::{IndicatorFrame, Interval};
use crate::strategy::{CandlePattern, Signal, Strategy};
use anyhow::Result;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Serialize)]
pub struct ScanSignal {
    pub symbol: String,
    pub time: DateTime<Utc>,
    pub pattern: Option<CandlePattern>,
    pub entry: Decimal,
    pub stop: Decimal,
    pub target: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct Skipped {
    pub symbol: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub strategy: String,
    pub interval: Interval,
    pub scanned: usize,
    pub signals: Vec<ScanSignal>,
    pub skipped: Vec<Skipped>,
}

pub struct Screener {
    strategy: Box<dyn Strategy>,
    indicators: IndicatorSettings,
    interval: Interval,
    window: BarWindow,
    min_bars: usize,
}

impl Screener {
    pub fn new(
        config: &ScannerConfig,
        strategy: Box<dyn Strategy>,
        indicators: IndicatorSettings,
    ) -> Result<Self> {
        Ok(Self {
            strategy,
            indicators,
            interval: config.interval()?,
            window: BarWindow::Range(config.range.clone()),
            min_bars: config.min_bars,
        })
    }

    pub fn with_interval(mut self, interval: Interval) -> Self {
        self.interval = interval;
        self
    }

    pub async fn run(&self, provider: &dyn MarketDataProvider, symbols: &[String]) -> ScanReport {
        info!(
            "Scanning {} symbols on {} bars with {}",
            symbols.len(),
            self.interval,
            self.strategy.name()
        );

        let mut signals = Vec::new();
        let mut skipped = Vec::new();

        for symbol in symbols {
            let series = match provider.fetch_bars(symbol, self.interval, &self.window).await {
                Ok(series) => series,
                Err(e) => {
                    warn!("Error fetching data for {}: {:#}", symbol, e);
                    skipped.push(Skipped {
                        symbol: symbol.clone(),
                        reason: format!("{:#}", e),
                    });
                    continue;
                }
            };

            if series.len() < self.min_bars {
                debug!("{}: only {} bars, skipping", symbol, series.len());
                skipped.push(Skipped {
                    symbol: series.symbol.clone(),
                    reason: format!("only {} bars (need {})", series.len(), self.min_bars),
                });
                continue;
            }

            let frame = IndicatorFrame::compute(&series, &self.indicators);
            for i in self.strategy.warmup()..frame.len() {
                if let Signal::Enter(setup) = self.strategy.analyze(&frame, i) {
                    signals.push(ScanSignal {
                        symbol: series.symbol.clone(),
                        time: frame.candles[i].timestamp,
                        pattern: setup.pattern,
                        entry: setup.entry.round_dp(2),
                        stop: setup.stop.round_dp(2),
                        target: setup.target.round_dp(2),
                    });
                }
            }
        }

        info!(
            "Scan done: {} signals, {} symbols skipped",
            signals.len(),
            skipped.len()
        );

        ScanReport {
            strategy: self.strategy.name().to_string(),
            interval: self.interval,
            scanned: symbols.len(),
            signals,
            skipped,
        }
    }
}
