//! Strategy Registry
//!
//! Factory for creating strategies by name.

use super::base::Strategy;
use super::breakout::SwingBreakoutStrategy;
use super::reversal::ReversalStrategy;
use super::trend::TrendBreakoutStrategy;
use crate::config::StrategySettings;

/// Available strategy names
pub const STRATEGY_NAMES: &[&str] = &["swing", "reversal", "trend"];

/// One-line description per strategy, for listings
pub fn describe(name: &str) -> &'static str {
    match name {
        "swing" => "Close breaks the prior range high on volume; stop at the range low, fixed R target",
        "reversal" => "Bullish engulfing or hammer near support on volume; entry above the high",
        "trend" => "Breakout filtered by RSI band, ADX floor and positive MACD; ATR stop",
        _ => "",
    }
}

/// Create a strategy by name
pub fn create_strategy(name: &str, config: &StrategySettings) -> Option<Box<dyn Strategy>> {
    match name.to_lowercase().as_str() {
        "swing" | "swing5d" | "breakout" => {
            Some(Box::new(SwingBreakoutStrategy::new(config.swing.clone())))
        }

        "reversal" | "candle" | "candlestick" => {
            Some(Box::new(ReversalStrategy::new(config.reversal.clone())))
        }

        "trend" | "trend_breakout" | "momentum" => {
            Some(Box::new(TrendBreakoutStrategy::new(config.trend.clone())))
        }

        _ => None,
    }
}

/// Get all available strategies
pub fn all_strategies(config: &StrategySettings) -> Vec<Box<dyn Strategy>> {
    STRATEGY_NAMES
        .iter()
        .filter_map(|name| create_strategy(name, config))
        .collect()
}

/// Parse a comma-separated list of strategy names
pub fn parse_strategy_list(list: &str) -> Vec<String> {
    if list.to_lowercase() == "all" {
        return STRATEGY_NAMES.iter().map(|s| s.to_string()).collect();
    }

    list.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_by_name_and_alias() {
        let config = StrategySettings::default();
        assert_eq!(create_strategy("swing", &config).unwrap().name(), "swing");
        assert_eq!(create_strategy("Breakout", &config).unwrap().name(), "swing");
        assert_eq!(create_strategy("candle", &config).unwrap().name(), "reversal");
        assert!(create_strategy("martingale", &config).is_none());
        assert_eq!(all_strategies(&config).len(), STRATEGY_NAMES.len());
    }

    #[test]
    fn test_parse_strategy_list() {
        assert_eq!(parse_strategy_list("all"), vec!["swing", "reversal", "trend"]);
        assert_eq!(parse_strategy_list(" Swing, trend ,"), vec!["swing", "trend"]);
    }
}
