pub mod candles;
pub mod frame;
pub mod symbols;

#[cfg(test)]
pub(crate) mod fixtures;

pub use candles::{BarSeries, Candle, Interval};
pub use frame::{FrameRow, IndicatorFrame};
pub use symbols::{normalize, provider_ticker};
