//! Strategy Comparator
//!
//! Runs several entry rules over the same bars and ranks them.

use super::engine::{BacktestConfig, BacktestEngine, BacktestResult};
use crate::config::{IndicatorSettings, StrategySettings};
use crate::data::BarSeries;
use crate::strategy::create_strategy;
use anyhow::{Context, Result};
use rust_decimal::prelude::ToPrimitive;
use std::path::Path;
use tracing::{info, warn};

/// Result of comparing multiple strategies
#[derive(Debug)]
pub struct ComparisonResult {
    pub symbol: String,
    pub bars: usize,
    pub results: Vec<(String, BacktestResult)>,
}

impl ComparisonResult {
    /// Best strategy by win rate over closed trades
    pub fn best_by_win_rate(&self) -> Option<&(String, BacktestResult)> {
        self.results
            .iter()
            .filter(|(_, r)| r.metrics.successful + r.metrics.failed > 0)
            .max_by(|a, b| {
                a.1.metrics
                    .win_rate
                    .partial_cmp(&b.1.metrics.win_rate)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    }

    /// Best strategy by average R per closed trade
    pub fn best_by_expectancy(&self) -> Option<&(String, BacktestResult)> {
        self.results
            .iter()
            .filter(|(_, r)| r.metrics.successful + r.metrics.failed > 0)
            .max_by_key(|(_, r)| r.metrics.expectancy_r)
    }

    /// Export the summary table to CSV
    pub fn export_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;

        writer.write_record([
            "strategy",
            "trades",
            "hit_target",
            "hit_sl",
            "open",
            "win_rate",
            "total_r",
            "expectancy_r",
            "avg_bars_held",
        ])?;

        for (name, result) in &self.results {
            let m = &result.metrics;
            writer.write_record([
                name.clone(),
                m.total_trades.to_string(),
                m.successful.to_string(),
                m.failed.to_string(),
                m.open.to_string(),
                format!("{:.2}", m.win_rate),
                format!("{:.2}", m.total_r.to_f64().unwrap_or(0.0)),
                format!("{:.4}", m.expectancy()),
                format!("{:.2}", m.avg_bars_held),
            ])?;
        }

        writer.flush()?;
        Ok(())
    }
}

/// Compare multiple strategies on the same bars
pub fn compare_strategies(
    series: &BarSeries,
    strategy_names: &[String],
    strategy_config: &StrategySettings,
    indicators: &IndicatorSettings,
    config: &BacktestConfig,
) -> ComparisonResult {
    info!(
        "Comparing {} strategies for {} over {} bars",
        strategy_names.len(),
        series.symbol,
        series.len()
    );

    let mut results = Vec::new();

    for name in strategy_names {
        let Some(strategy) = create_strategy(name, strategy_config) else {
            warn!("Unknown strategy: {}", name);
            continue;
        };

        let engine = BacktestEngine::new(config.clone(), strategy, indicators.clone());
        let result = engine.run_on(series);

        info!(
            "  {}: {} trades, {:.1}% win rate, {} R",
            result.strategy, result.metrics.total_trades, result.metrics.win_rate, result.metrics.total_r
        );

        results.push((result.strategy.clone(), result));
    }

    // Highest expectancy first
    results.sort_by(|a, b| b.1.metrics.expectancy_r.cmp(&a.1.metrics.expectancy_r));

    ComparisonResult {
        symbol: series.symbol.clone(),
        bars: series.len(),
        results,
    }
}
