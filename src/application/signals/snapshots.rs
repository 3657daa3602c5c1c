use crate::domain::errors::PersistenceError;
use crate::domain::ports::KeyValueStore;
use crate::domain::signals::{Signal, StrategyId};
use std::sync::Arc;
use tracing::warn;

pub const LIVE_SIGNAL_KEY: &str = "lastLiveSignal";
const STRATEGY_KEY_PREFIX: &str = "lastSignal_";

pub fn strategy_key(strategy: StrategyId) -> String {
    format!("{}{}", STRATEGY_KEY_PREFIX, strategy)
}

/// Latest signal per strategy plus the latest selected signal, kept in the
/// key-value store for display by other processes.
#[derive(Clone)]
pub struct SignalSnapshots {
    store: Arc<dyn KeyValueStore>,
}

impl SignalSnapshots {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn save_strategy(&self, signal: &Signal) -> Result<(), PersistenceError> {
        let key = match signal.strategy {
            Some(strategy) => strategy_key(strategy),
            None => LIVE_SIGNAL_KEY.to_string(),
        };
        self.write(&key, signal).await
    }

    pub async fn save_live(&self, signal: &Signal) -> Result<(), PersistenceError> {
        self.write(LIVE_SIGNAL_KEY, signal).await
    }

    pub async fn load_strategy(&self, strategy: StrategyId) -> Option<Signal> {
        self.read(&strategy_key(strategy)).await
    }

    pub async fn load_live(&self) -> Option<Signal> {
        self.read(LIVE_SIGNAL_KEY).await
    }

    /// Drops every per-strategy snapshot. The live snapshot is left alone.
    pub async fn clear_strategies(&self) -> Result<(), PersistenceError> {
        for strategy in StrategyId::ALL {
            self.store.remove(&strategy_key(strategy)).await?;
        }
        Ok(())
    }

    async fn write(&self, key: &str, signal: &Signal) -> Result<(), PersistenceError> {
        let json = serde_json::to_string(signal).map_err(|e| PersistenceError::Serialize {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        self.store.set(key, &json).await
    }

    async fn read(&self, key: &str) -> Option<Signal> {
        let raw = match self.store.get(key).await {
            Ok(raw) => raw?,
            Err(e) => {
                warn!("SignalSnapshots: failed to read '{}': {}", key, e);
                return None;
            }
        };
        serde_json::from_str(&raw)
            .map_err(|e| warn!("SignalSnapshots: ignoring corrupt '{}': {}", key, e))
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::signals::{Evaluation, SignalKind};
    use crate::infrastructure::persistence::InMemoryKeyValueStore;

    #[test]
    fn test_strategy_keys() {
        assert_eq!(strategy_key(StrategyId::Trend), "lastSignal_trend");
        assert_eq!(strategy_key(StrategyId::Trendline), "lastSignal_trendline");
        assert_eq!(strategy_key(StrategyId::Channel), "lastSignal_channel");
    }

    #[tokio::test]
    async fn test_save_and_clear_strategy_snapshots() {
        let store = Arc::new(InMemoryKeyValueStore::new());
        let snapshots = SignalSnapshots::new(store.clone());

        let signal = Evaluation::new(SignalKind::Sell, "upper band", 130.0, 70).into_signal(
            StrategyId::Channel,
            "BTCUSDT",
            1,
        );
        snapshots.save_strategy(&signal).await.unwrap();
        snapshots.save_live(&signal).await.unwrap();

        assert_eq!(
            snapshots.load_strategy(StrategyId::Channel).await,
            Some(signal.clone())
        );

        snapshots.clear_strategies().await.unwrap();
        assert!(snapshots.load_strategy(StrategyId::Channel).await.is_none());
        assert_eq!(snapshots.load_live().await, Some(signal));
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_reads_as_missing() {
        let store = Arc::new(InMemoryKeyValueStore::new());
        store.set("lastSignal_trend", "[1,2").await.unwrap();
        let snapshots = SignalSnapshots::new(store);
        assert!(snapshots.load_strategy(StrategyId::Trend).await.is_none());
    }
}
