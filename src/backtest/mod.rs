//! Walk-forward backtesting of entry rules over daily bars

mod batch;
mod comparator;
mod engine;
mod metrics;

pub use batch::{run_universe, SymbolError, SymbolSummary, UniverseReport};
pub use comparator::{compare_strategies, ComparisonResult};
pub use engine::{
    simulate_outcome, BacktestConfig, BacktestEngine, BacktestResult, Exit, Outcome, TradeRecord,
};
pub use metrics::{MetricsCollector, PerformanceMetrics};
