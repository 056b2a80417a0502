use crate::data::Interval;
use anyhow::{bail, Context, Result};
use config::{Config as ConfigLoader, File};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub provider: ProviderConfig,
    pub universe: UniverseConfig,
    pub indicators: IndicatorSettings,
    pub strategy: StrategySettings,
    pub backtest: BacktestSettings,
    pub scanner: ScannerConfig,
    pub storage: StorageConfig,
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    pub user_agent: String,
    /// Minimum delay between two chart requests
    pub request_delay_ms: u64,
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://query1.finance.yahoo.com".to_string(),
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) nse-screener/0.1".to_string(),
            request_delay_ms: 350,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UniverseConfig {
    pub constituents_url: String,
    pub limit: Option<usize>,
}

impl Default for UniverseConfig {
    fn default() -> Self {
        Self {
            constituents_url: "https://archives.nseindia.com/content/indices/ind_nifty500list.csv"
                .to_string(),
            limit: None,
        }
    }
}

/// Window sizes for every indicator column of an `IndicatorFrame`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IndicatorSettings {
    pub sma_fast: usize,
    pub sma_slow: usize,
    pub ema: usize,
    pub rsi: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub atr: usize,
    pub adx: usize,
    pub bollinger: usize,
    pub bollinger_std_devs: f64,
    pub volume_avg: usize,
}

impl Default for IndicatorSettings {
    fn default() -> Self {
        Self {
            sma_fast: 20,
            sma_slow: 50,
            ema: 20,
            rsi: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            atr: 14,
            adx: 14,
            bollinger: 20,
            bollinger_std_devs: 2.0,
            volume_avg: 10,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StrategySettings {
    pub swing: SwingSettings,
    pub reversal: ReversalSettings,
    pub trend: TrendSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SwingSettings {
    pub lookback: usize,
    pub reward_ratio: Decimal,
}

impl Default for SwingSettings {
    fn default() -> Self {
        Self {
            lookback: 5,
            reward_ratio: dec!(1.5),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReversalSettings {
    pub volume_window: usize,
    pub support_lookback: usize,
    pub support_tolerance_pct: Decimal,
    pub entry_buffer: Decimal,
    pub reward_ratio: Decimal,
}

impl Default for ReversalSettings {
    fn default() -> Self {
        Self {
            volume_window: 10,
            support_lookback: 20,
            support_tolerance_pct: dec!(0.5),
            entry_buffer: dec!(0.1),
            reward_ratio: dec!(1.5),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrendSettings {
    pub lookback: usize,
    pub rsi_min: Decimal,
    pub rsi_max: Decimal,
    pub adx_min: Decimal,
    pub atr_multiplier: Decimal,
    pub reward_ratio: Decimal,
}

impl Default for TrendSettings {
    fn default() -> Self {
        Self {
            lookback: 20,
            rsi_min: dec!(55),
            rsi_max: dec!(75),
            adx_min: dec!(20),
            atr_multiplier: dec!(1.5),
            reward_ratio: dec!(2),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BacktestSettings {
    pub history_years: u32,
    /// Bars scanned after the entry bar before a trade is left OPEN
    pub max_hold_bars: usize,
    pub default_strategy: String,
    pub export_path: Option<String>,
}

impl Default for BacktestSettings {
    fn default() -> Self {
        Self {
            history_years: 3,
            max_hold_bars: 9,
            default_strategy: "swing".to_string(),
            export_path: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    pub interval: String,
    pub range: String,
    pub min_bars: usize,
    pub default_strategy: String,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            interval: "5m".to_string(),
            range: "1d".to_string(),
            min_bars: 15,
            default_strategy: "reversal".to_string(),
        }
    }
}

impl ScannerConfig {
    pub fn interval(&self) -> Result<Interval> {
        self.interval
            .parse()
            .with_context(|| format!("Invalid scanner interval '{}'", self.interval))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub enabled: bool,
    pub data_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            data_dir: "data".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub bind_addr: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".to_string(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        let settings = ConfigLoader::builder()
            .add_source(File::from(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("SCREENER")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: Config = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make every rule silently misbehave
    pub fn validate(&self) -> Result<()> {
        let ratios = [
            ("strategy.swing.reward_ratio", self.strategy.swing.reward_ratio),
            ("strategy.reversal.reward_ratio", self.strategy.reversal.reward_ratio),
            ("strategy.trend.reward_ratio", self.strategy.trend.reward_ratio),
            ("strategy.trend.atr_multiplier", self.strategy.trend.atr_multiplier),
        ];
        for (key, value) in ratios {
            if value <= Decimal::ZERO {
                bail!("{} must be positive, got {}", key, value);
            }
        }

        let reversal = &self.strategy.reversal;
        if reversal.support_tolerance_pct < Decimal::ZERO || reversal.entry_buffer < Decimal::ZERO {
            bail!("strategy.reversal tolerances must not be negative");
        }

        let trend = &self.strategy.trend;
        if trend.rsi_min > trend.rsi_max {
            bail!(
                "strategy.trend.rsi_min ({}) is above rsi_max ({})",
                trend.rsi_min,
                trend.rsi_max
            );
        }

        if !self.indicators.bollinger_std_devs.is_finite() || self.indicators.bollinger_std_devs <= 0.0 {
            bail!(
                "indicators.bollinger_std_devs must be a positive number, got {}",
                self.indicators.bollinger_std_devs
            );
        }

        self.scanner.interval()?;
        Ok(())
    }

    fn config_path() -> PathBuf {
        let local_config = PathBuf::from("config/default.toml");
        if local_config.exists() {
            return local_config;
        }

        if let Ok(exe_path) = std::env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                let exe_config = exe_dir.join("config/default.toml");
                if exe_config.exists() {
                    return exe_config;
                }
            }
        }

        local_config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_swing_setup() {
        let config = Config::default();
        assert_eq!(config.strategy.swing.lookback, 5);
        assert_eq!(config.strategy.swing.reward_ratio, dec!(1.5));
        assert_eq!(config.backtest.max_hold_bars, 9);
        assert_eq!(config.scanner.min_bars, 15);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let settings = ConfigLoader::builder()
            .add_source(config::File::from_str(
                "[backtest]\nmax_hold_bars = 15\n[strategy.trend]\nadx_min = 25.0\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap();
        let config: Config = settings.try_deserialize().unwrap();

        assert_eq!(config.backtest.max_hold_bars, 15);
        assert_eq!(config.backtest.history_years, 3);
        assert_eq!(config.strategy.trend.adx_min, dec!(25));
        assert_eq!(config.strategy.trend.lookback, 20);
        assert_eq!(config.indicators.rsi, 14);
    }

    fn from_toml(toml: &str) -> Result<Config> {
        let settings = ConfigLoader::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    #[test]
    fn test_defaults_validate() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_non_finite_ratio_rejected() {
        assert!(from_toml("[strategy.swing]\nreward_ratio = nan\n").is_err());
        assert!(from_toml("[strategy.trend]\natr_multiplier = inf\n").is_err());

        let config = from_toml("[strategy.reversal]\nreward_ratio = 2.5\nentry_buffer = 0.05\n").unwrap();
        assert_eq!(config.strategy.reversal.reward_ratio, dec!(2.5));
        assert_eq!(config.strategy.reversal.entry_buffer, dec!(0.05));
    }

    #[test]
    fn test_out_of_range_settings_rejected() {
        let config = from_toml("[strategy.swing]\nreward_ratio = 0\n").unwrap();
        assert!(config.validate().is_err());

        let config = from_toml("[strategy.trend]\nrsi_min = 80\nrsi_max = 70\n").unwrap();
        assert!(config.validate().is_err());

        let config = from_toml("[indicators]\nbollinger_std_devs = nan\n").unwrap();
        assert!(config.validate().is_err());

        let config = from_toml("[scanner]\ninterval = \"3m\"\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_scanner_interval() {
        let mut scanner = ScannerConfig::default();
        assert_eq!(scanner.interval().unwrap(), Interval::FiveMinutes);

        scanner.interval = "3m".to_string();
        assert!(scanner.interval().is_err());
    }
}
