use crate::data::IndicatorFrame;
use crate::strategy::patterns::CandlePattern;
use rust_decimal::Decimal;

/// Entry, protective stop and profit target for a synthetic long trade
#[derive(Debug, Clone, PartialEq)]
pub struct TradeSetup {
    pub entry: Decimal,
    pub stop: Decimal,
    pub target: Decimal,
    pub pattern: Option<CandlePattern>,
}

impl TradeSetup {
    pub fn new(entry: Decimal, stop: Decimal, target: Decimal) -> Self {
        Self {
            entry,
            stop,
            target,
            pattern: None,
        }
    }

    pub fn with_pattern(mut self, pattern: CandlePattern) -> Self {
        self.pattern = Some(pattern);
        self
    }

    /// Distance from entry to stop
    pub fn risk(&self) -> Decimal {
        self.entry - self.stop
    }

    pub fn reward(&self) -> Decimal {
        self.target - self.entry
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    Enter(TradeSetup),
    Hold,
}

/// An entry rule evaluated bar by bar over an indicator frame
pub trait Strategy: Send + Sync {
    fn name(&self) -> &str;

    /// First bar index the rule can evaluate
    fn warmup(&self) -> usize;

    /// Evaluate the rule on bar `index`, using only bars up to and including it
    fn analyze(&self, frame: &IndicatorFrame, index: usize) -> Signal;
}
