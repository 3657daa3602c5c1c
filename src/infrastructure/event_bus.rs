use crate::domain::events::{EngineEvent, EventListener};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Fans engine events out to listeners in subscription order.
///
/// Clones share the listener list. Each publish works on a snapshot of the
/// list, so the lock is not held while listeners run.
#[derive(Clone, Default)]
pub struct EventBus {
    listeners: Arc<RwLock<Vec<Arc<dyn EventListener>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn subscribe(&self, listener: Arc<dyn EventListener>) {
        self.listeners.write().await.push(listener);
    }

    pub async fn publish(&self, event: &EngineEvent) {
        let listeners = self.listeners.read().await.clone();
        for listener in &listeners {
            listener.on_event(event);
        }
    }

    pub async fn listener_count(&self) -> usize {
        self.listeners.read().await.len()
    }
}
