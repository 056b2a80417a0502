//! Universe backtests: one engine run per symbol, failures kept as rows

use super::engine::{BacktestEngine, TradeRecord};
use super::metrics::{MetricsCollector, PerformanceMetrics};
use crate::api::MarketDataProvider;
use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize)]
pub struct SymbolError {
    pub symbol: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SymbolSummary {
    pub symbol: String,
    pub bars: usize,
    pub trades: u32,
    pub win_rate: f64,
    pub total_r: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct UniverseReport {
    pub strategy: String,
    pub symbols: usize,
    pub summaries: Vec<SymbolSummary>,
    pub trades: Vec<TradeRecord>,
    pub errors: Vec<SymbolError>,
    pub metrics: PerformanceMetrics,
}

/// Backtest every symbol in turn. A symbol that fails to load becomes an
/// error row and the batch carries on.
pub async fn run_universe(
    engine: &BacktestEngine,
    provider: &dyn MarketDataProvider,
    symbols: &[String],
) -> UniverseReport {
    info!(
        "Backtesting {} symbols with {}",
        symbols.len(),
        engine.strategy_name()
    );

    let mut summaries = Vec::new();
    let mut trades = Vec::new();
    let mut errors = Vec::new();

    for (n, symbol) in symbols.iter().enumerate() {
        match engine.run(provider, symbol).await {
            Ok(result) => {
                summaries.push(SymbolSummary {
                    symbol: result.symbol.clone(),
                    bars: result.bars,
                    trades: result.metrics.total_trades,
                    win_rate: result.metrics.win_rate,
                    total_r: result.metrics.total_r,
                });
                trades.extend(result.trades);
            }
            Err(e) => {
                warn!("[{}/{}] {} failed: {:#}", n + 1, symbols.len(), symbol, e);
                errors.push(SymbolError {
                    symbol: symbol.clone(),
                    error: format!("{:#}", e),
                });
            }
        }
    }

    let metrics = MetricsCollector::from_trades(&trades).calculate();

    info!(
        "Universe done: {} trades across {} symbols, {} errors, win rate {:.1}%",
        trades.len(),
        summaries.len(),
        errors.len(),
        metrics.win_rate
    );

    UniverseReport {
        strategy: engine.strategy_name().to_string(),
        symbols: symbols.len(),
        summaries,
        trades,
        errors,
        metrics,
    }
}

impl UniverseReport {
    /// Write one row per trade, then one row per failed symbol
    pub fn export_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;

        writer.write_record([
            "Symbol",
            "Date",
            "Entry",
            "Target",
            "SL",
            "ExitPrice",
            "Outcome",
            "BarsHeld",
            "Error",
        ])?;

        for t in &self.trades {
            writer.write_record([
                t.symbol.clone(),
                t.date.date_naive().to_string(),
                format!("{:.2}", t.entry),
                format!("{:.2}", t.target),
                format!("{:.2}", t.stop),
                t.exit_price.map(|p| format!("{:.2}", p)).unwrap_or_default(),
                t.outcome.to_string(),
                t.bars_held.map(|b| b.to_string()).unwrap_or_default(),
                String::new(),
            ])?;
        }

        for e in &self.errors {
            let mut row = vec![e.symbol.clone()];
            row.extend(std::iter::repeat(String::new()).take(7));
            row.push(e.error.clone());
            writer.write_record(&row)?;
        }

        writer.flush()?;
        info!("Exported {} trades to {}", self.trades.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::memory::MemoryProvider;
    use crate::backtest::BacktestConfig;
    use crate::config::{IndicatorSettings, SwingSettings};
    use crate::data::fixtures::{daily, flat};
    use crate::strategy::SwingBreakoutStrategy;
    use chrono::NaiveDate;

    fn engine() -> BacktestEngine {
        let config = BacktestConfig::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        );
        BacktestEngine::new(
            config,
            Box::new(SwingBreakoutStrategy::new(SwingSettings::default())),
            IndicatorSettings::default(),
        )
    }

    fn provider() -> MemoryProvider {
        let mut winner = flat(5);
        winner.push((100.5, 103.0, 100.0, 102.0, 2000.0));
        winner.push((102.0, 107.0, 101.0, 106.0, 1000.0));
        winner.push((106.0, 106.5, 105.0, 105.5, 900.0));

        MemoryProvider::new()
            .with_series(daily("TITAN", &winner))
            .with_series(daily("ONGC", &flat(20)))
            .with_series(daily("YESBANK", &flat(20)))
    }

    #[tokio::test]
    async fn test_failures_become_error_rows() {
        let provider = provider();
        provider.fail("YESBANK");
        let symbols: Vec<String> = ["TITAN", "ONGC", "YESBANK", "DELISTED"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let report = run_universe(&engine(), &provider, &symbols).await;

        assert_eq!(report.symbols, 4);
        assert_eq!(report.summaries.len(), 2);
        assert_eq!(report.trades.len(), 1);
        assert_eq!(report.metrics.successful, 1);

        let failed: Vec<&str> = report.errors.iter().map(|e| e.symbol.as_str()).collect();
        assert_eq!(failed, vec!["YESBANK", "DELISTED"]);
        assert!(report.errors[0].error.contains("simulated outage"));
    }

    #[tokio::test]
    async fn test_export_csv() {
        let provider = provider();
        let symbols = vec!["TITAN".to_string(), "DELISTED".to_string()];
        let report = run_universe(&engine(), &provider, &symbols).await;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/universe.csv");
        report.export_csv(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "Symbol,Date,Entry,Target,SL,ExitPrice,Outcome,BarsHeld,Error");
        assert_eq!(lines[1], "TITAN,2024-01-06,102.00,106.50,99.00,106.50,HIT_TARGET,1,");
        assert!(lines[2].starts_with("DELISTED,,,,,,,,"));
        assert_eq!(lines.len(), 3);
    }
}
