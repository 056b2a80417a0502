//! Nifty 500 constituents list

use crate::api::error::DataError;
use crate::config::{ProviderConfig, UniverseConfig};
use crate::data::normalize;
use anyhow::{Context, Result};
use reqwest::Client;
use std::collections::HashSet;
use std::time::Duration;
use tracing::info;

const SYMBOL_COLUMN: &str = "Symbol";

/// Symbols from an index constituents CSV, in file order without duplicates
pub fn parse_constituents(body: &str) -> Result<Vec<String>, DataError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(body.as_bytes());

    let column = reader
        .headers()?
        .iter()
        .position(|h| h.eq_ignore_ascii_case(SYMBOL_COLUMN))
        .ok_or_else(|| DataError::Parse(format!("missing '{}' column", SYMBOL_COLUMN)))?;

    let mut seen = HashSet::new();
    let mut symbols = Vec::new();

    for record in reader.records() {
        let record = record?;
        let Some(symbol) = record.get(column).map(normalize) else {
            continue;
        };
        if !symbol.is_empty() && seen.insert(symbol.clone()) {
            symbols.push(symbol);
        }
    }

    if symbols.is_empty() {
        return Err(DataError::NoData("constituents list".to_string()));
    }

    Ok(symbols)
}

pub struct UniverseClient {
    client: Client,
    url: String,
    limit: Option<usize>,
}

impl UniverseClient {
    pub fn new(provider: &ProviderConfig, universe: &UniverseConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(provider.timeout_secs))
            .user_agent(provider.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            url: universe.constituents_url.clone(),
            limit: universe.limit,
        })
    }

    /// Download the constituents list, truncated to the configured limit
    pub async fn fetch_symbols(&self) -> Result<Vec<String>> {
        let body = self
            .client
            .get(&self.url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(DataError::from)
            .with_context(|| format!("Failed to download {}", self.url))?
            .text()
            .await
            .map_err(DataError::from)?;

        let mut symbols = parse_constituents(&body).context("Failed to parse constituents list")?;
        if let Some(limit) = self.limit {
            symbols.truncate(limit);
        }

        info!("Loaded {} universe symbols", symbols.len());
        Ok(symbols)
    }
}
