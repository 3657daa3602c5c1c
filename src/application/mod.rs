pub mod analysis;
pub mod engine;
pub mod market_data;
pub mod scheduler;
pub mod signals;
pub mod strategies;

pub use engine::{LiveSignalEngine, Subscription};
pub use scheduler::AnalysisScheduler;
