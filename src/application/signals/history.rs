use crate::domain::errors::PersistenceError;
use crate::domain::ports::KeyValueStore;
use crate::domain::signals::Signal;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{info, warn};

pub const SIGNAL_HISTORY_KEY: &str = "signalHistory";
pub const DEFAULT_HISTORY_CAPACITY: usize = 10;

/// Bounded, most-recent-first log of selected signals, mirrored to a
/// key-value store on every change.
pub struct SignalHistoryLog {
    entries: VecDeque<Signal>,
    capacity: usize,
    store: Arc<dyn KeyValueStore>,
}

impl SignalHistoryLog {
    pub fn new(store: Arc<dyn KeyValueStore>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            store,
        }
    }

    /// Restores the log from storage. Missing, unreadable or corrupt data
    /// leaves the log empty. Returns the number of restored entries.
    pub async fn load(&mut self) -> usize {
        self.entries.clear();

        let raw = match self.store.get(SIGNAL_HISTORY_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return 0,
            Err(e) => {
                warn!("SignalHistoryLog: failed to read stored history: {}", e);
                return 0;
            }
        };

        match serde_json::from_str::<Vec<Signal>>(&raw) {
            Ok(signals) => {
                self.entries = signals.into_iter().take(self.capacity).collect();
                info!("SignalHistoryLog: restored {} signals", self.entries.len());
            }
            Err(e) => {
                warn!(
                    "SignalHistoryLog: stored history is corrupt, starting empty: {}",
                    e
                );
            }
        }

        self.entries.len()
    }

    /// Prepends `signal`, drops the oldest beyond capacity and persists the log.
    /// The in-memory log is updated even if persisting fails.
    pub async fn record(&mut self, signal: Signal) -> Result<(), PersistenceError> {
        self.entries.push_front(signal);
        self.entries.truncate(self.capacity);
        self.persist().await
    }

    pub async fn clear(&mut self) -> Result<(), PersistenceError> {
        self.entries.clear();
        self.store.remove(SIGNAL_HISTORY_KEY).await
    }

    /// Most recent first.
    pub fn entries(&self) -> Vec<Signal> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    async fn persist(&self) -> Result<(), PersistenceError> {
        let json = serde_json::to_string(&self.entries).map_err(|e| PersistenceError::Serialize {
            key: SIGNAL_HISTORY_KEY.to_string(),
            reason: e.to_string(),
        })?;
        self.store.set(SIGNAL_HISTORY_KEY, &json).await
    }
}
