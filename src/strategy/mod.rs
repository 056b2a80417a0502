pub mod base;
pub mod breakout;
pub mod indicators;
pub mod patterns;
pub mod registry;
pub mod reversal;
pub mod trend;

pub use base::{Signal, Strategy, TradeSetup};
pub use breakout::{prior_range, PriorRange, SwingBreakoutStrategy};
pub use patterns::CandlePattern;
pub use registry::{all_strategies, create_strategy, describe, parse_strategy_list, STRATEGY_NAMES};
pub use reversal::ReversalStrategy;
pub use trend::TrendBreakoutStrategy;
