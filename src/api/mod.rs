pub mod error;
pub mod provider;
pub mod universe;
pub mod yahoo;

#[cfg(test)]
pub(crate) mod memory;

pub use error::DataError;
pub use provider::{year_span, BarWindow, MarketDataProvider};
pub use universe::{parse_constituents, UniverseClient};
pub use yahoo::{parse_chart, YahooClient};
