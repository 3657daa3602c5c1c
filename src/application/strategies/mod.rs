mod channel;
mod traits;
mod trend;
mod trendline;

pub use channel::{ChannelBounds, ChannelPattern, ChannelStrategy, find_ascending_channel};
pub use traits::SignalStrategy;
pub use trend::TrendStrategy;
pub use trendline::{AscendingPattern, TrendlineStrategy, find_ascending_pattern};

use crate::domain::signals::StrategyId;
use std::sync::Arc;

pub struct StrategyFactory;

impl StrategyFactory {
    pub fn create(id: StrategyId) -> Arc<dyn SignalStrategy> {
        match id {
            StrategyId::Trend => Arc::new(TrendStrategy::default()),
            StrategyId::Trendline => Arc::new(TrendlineStrategy::new()),
            StrategyId::Channel => Arc::new(ChannelStrategy::new()),
        }
    }

    /// All strategies in evaluation (and tie-break) order.
    pub fn create_all() -> Vec<Arc<dyn SignalStrategy>> {
        StrategyId::ALL.iter().map(|id| Self::create(*id)).collect()
    }
}
