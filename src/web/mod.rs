//! Browser dashboard
//!
//! Serves a Lightweight Charts page plus the JSON endpoints it calls.

mod handlers;
mod page;

use crate::api::{MarketDataProvider, UniverseClient};
use crate::config::Config;
use anyhow::{Context, Result};
use axum::{routing::get, Router};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

pub use handlers::ApiError;

pub struct AppState {
    pub config: Config,
    pub provider: Arc<dyn MarketDataProvider>,
    universe: Option<UniverseClient>,
    symbols: RwLock<Option<Vec<String>>>,
}

impl AppState {
    pub fn new(
        config: Config,
        provider: Arc<dyn MarketDataProvider>,
        universe: Option<UniverseClient>,
    ) -> Self {
        Self {
            config,
            provider,
            universe,
            symbols: RwLock::new(None),
        }
    }

    /// Seed the universe list instead of downloading it
    pub fn with_symbols(mut self, symbols: Vec<String>) -> Self {
        self.symbols = RwLock::new(Some(symbols));
        self
    }

    /// Universe symbols, downloaded on first use and cached for the process lifetime
    pub async fn symbols(&self) -> Result<Vec<String>> {
        if let Some(symbols) = self.symbols.read().await.as_ref() {
            return Ok(symbols.clone());
        }

        let universe = self
            .universe
            .as_ref()
            .context("No universe source configured")?;
        let symbols = universe.fetch_symbols().await?;

        *self.symbols.write().await = Some(symbols.clone());
        Ok(symbols)
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(page::index_page))
        .route("/api/strategies", get(handlers::list_strategies))
        .route("/api/symbols", get(handlers::list_symbols))
        .route("/api/bars", get(handlers::get_bars))
        .route("/api/indicators", get(handlers::get_indicators))
        .route("/api/backtest", get(handlers::run_backtest))
        .route("/api/backtest/universe", get(handlers::run_universe_backtest))
        .route("/api/scan", get(handlers::run_scan))
        .with_state(state)
}

/// Bind the configured address and serve until the process exits
pub async fn serve(state: AppState) -> Result<()> {
    let addr = state.config.dashboard.bind_addr.clone();
    let app = router(Arc::new(state));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Dashboard running at http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
