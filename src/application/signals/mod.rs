pub mod arbiter;
pub mod history;
pub mod snapshots;

pub use arbiter::{Arbitration, SignalArbiter, StrategyUpdate, select_best};
pub use history::{DEFAULT_HISTORY_CAPACITY, SIGNAL_HISTORY_KEY, SignalHistoryLog};
pub use snapshots::{LIVE_SIGNAL_KEY, SignalSnapshots, strategy_key};
