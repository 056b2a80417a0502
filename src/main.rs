use anyhow::Result;
use screener::api::UniverseClient;
use screener::config::Config;
use screener::storage::market_data;
use screener::web::{self, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive("screener=info".parse()?))
        .init();

    tracing::info!("Starting NSE screener dashboard");

    let config = Config::load()?;
    tracing::info!(
        "Loaded config: default backtest strategy {}, scanner {} bars",
        config.backtest.default_strategy,
        config.scanner.interval
    );

    let provider = market_data(&config)?;
    let universe = UniverseClient::new(&config.provider, &config.universe)?;

    web::serve(AppState::new(config, provider, Some(universe))).await
}
