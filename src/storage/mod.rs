pub mod bar_cache;

pub use bar_cache::{BarCache, CachedProvider};

use crate::api::{MarketDataProvider, YahooClient};
use crate::config::Config;
use anyhow::Result;
use std::sync::Arc;
use tracing::info;

/// Chart API client, wrapped in the parquet cache when storage is enabled
pub fn market_data(config: &Config) -> Result<Arc<dyn MarketDataProvider>> {
    let client = YahooClient::new(&config.provider)?;

    if config.storage.enabled {
        info!("Caching bars under {}", config.storage.data_dir);
        let cache = BarCache::new(&config.storage.data_dir);
        Ok(Arc::new(CachedProvider::new(client, cache)))
    } else {
        Ok(Arc::new(client))
    }
}
