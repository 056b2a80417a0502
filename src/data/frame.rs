//! Price-bar table with computed indicator columns

use crate::config::IndicatorSettings;
use crate::data::{BarSeries, Candle};
use crate::strategy::indicators::{
    adx_series, atr_series, bollinger_series, ema_series, macd_series, rolling_mean,
    rsi_series, sma_series,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct IndicatorFrame {
    pub symbol: String,
    pub candles: Vec<Candle>,
    pub sma_fast: Vec<Option<Decimal>>,
    pub sma_slow: Vec<Option<Decimal>>,
    pub ema: Vec<Option<Decimal>>,
    pub rsi: Vec<Option<Decimal>>,
    pub macd: Vec<Option<Decimal>>,
    pub macd_signal: Vec<Option<Decimal>>,
    pub macd_hist: Vec<Option<Decimal>>,
    pub atr: Vec<Option<Decimal>>,
    pub adx: Vec<Option<Decimal>>,
    pub bb_lower: Vec<Option<Decimal>>,
    pub bb_middle: Vec<Option<Decimal>>,
    pub bb_upper: Vec<Option<Decimal>>,
    pub volume_avg: Vec<Option<Decimal>>,
}

/// One row of the frame, as served to the dashboard and printed by the CLI
#[derive(Debug, Clone, Serialize)]
pub struct FrameRow {
    pub time: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    pub sma_fast: Option<Decimal>,
    pub sma_slow: Option<Decimal>,
    pub ema: Option<Decimal>,
    pub rsi: Option<Decimal>,
    pub macd: Option<Decimal>,
    pub macd_signal: Option<Decimal>,
    pub macd_hist: Option<Decimal>,
    pub atr: Option<Decimal>,
    pub adx: Option<Decimal>,
    pub bb_lower: Option<Decimal>,
    pub bb_middle: Option<Decimal>,
    pub bb_upper: Option<Decimal>,
    pub volume_avg: Option<Decimal>,
}

impl IndicatorFrame {
    pub fn compute(series: &BarSeries, settings: &IndicatorSettings) -> Self {
        let closes = series.closes();
        let highs = series.highs();
        let lows = series.lows();
        let volumes = series.volumes();

        let macd = macd_series(
            &closes,
            settings.macd_fast,
            settings.macd_slow,
            settings.macd_signal,
        );
        let bands = bollinger_series(&closes, settings.bollinger, settings.bollinger_std_devs);

        Self {
            symbol: series.symbol.clone(),
            candles: series.candles.clone(),
            sma_fast: sma_series(&closes, settings.sma_fast),
            sma_slow: sma_series(&closes, settings.sma_slow),
            ema: ema_series(&closes, settings.ema),
            rsi: rsi_series(&closes, settings.rsi),
            macd: macd.macd,
            macd_signal: macd.signal,
            macd_hist: macd.histogram,
            atr: atr_series(&highs, &lows, &closes, settings.atr),
            adx: adx_series(&highs, &lows, &closes, settings.adx),
            bb_lower: bands.lower,
            bb_middle: bands.middle,
            bb_upper: bands.upper,
            volume_avg: rolling_mean(&volumes, settings.volume_avg),
        }
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn row(&self, i: usize) -> Option<FrameRow> {
        let c = self.candles.get(i)?;
        Some(FrameRow {
            time: c.timestamp,
            open: c.open,
            high: c.high,
            low: c.low,
            close: c.close,
            volume: c.volume,
            sma_fast: self.sma_fast[i],
            sma_slow: self.sma_slow[i],
            ema: self.ema[i],
            rsi: self.rsi[i],
            macd: self.macd[i],
            macd_signal: self.macd_signal[i],
            macd_hist: self.macd_hist[i],
            atr: self.atr[i],
            adx: self.adx[i],
            bb_lower: self.bb_lower[i],
            bb_middle: self.bb_middle[i],
            bb_upper: self.bb_upper[i],
            volume_avg: self.volume_avg[i],
        })
    }

    pub fn rows(&self) -> Vec<FrameRow> {
        (0..self.len()).filter_map(|i| self.row(i)).collect()
    }

    /// Last `n` rows, oldest first
    pub fn tail(&self, n: usize) -> Vec<FrameRow> {
        let start = self.len().saturating_sub(n);
        (start..self.len()).filter_map(|i| self.row(i)).collect()
    }
}
