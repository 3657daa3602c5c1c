use crate::domain::signals::{Signal, StrategyId};
use tracing::{debug, info};

/// Everything the engine publishes to UI and notification collaborators.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Once per analysis pass, with the arbitrated best signal.
    SignalSelected(Signal),
    /// Every strategy output of a pass, new or repeated.
    StrategySignalUpdated { strategy: StrategyId, signal: Signal },
    /// A strategy's signal kind changed; meant to drive user notification.
    NewSignal(Signal),
    HistoryCleared,
}

pub trait EventListener: Send + Sync {
    fn on_event(&self, event: &EngineEvent);
}

/// Writes every event to the tracing log.
pub struct LoggingListener;

impl EventListener for LoggingListener {
    fn on_event(&self, event: &EngineEvent) {
        match event {
            EngineEvent::SignalSelected(signal) => info!("Selected signal: {}", signal),
            EngineEvent::StrategySignalUpdated { strategy, signal } => {
                debug!("Strategy {} -> {}", strategy, signal)
            }
            EngineEvent::NewSignal(signal) => info!("NEW signal: {}", signal),
            EngineEvent::HistoryCleared => info!("Signal history cleared"),
        }
    }
}
