use crate::domain::errors::{MarketDataError, PersistenceError};
use crate::domain::market::{Candle, Interval, KlineTick};
use async_trait::async_trait;

/// Receives parsed stream ticks, one at a time, in arrival order.
pub trait TickHandler: Send + Sync {
    fn on_tick(&self, tick: KlineTick);
}

#[async_trait]
pub trait MarketDataService: Send + Sync {
    /// Most recent `limit` klines, oldest first. The last one is usually still open.
    async fn fetch_klines(
        &self,
        symbol: &str,
        interval: Interval,
        limit: usize,
    ) -> Result<Vec<Candle>, MarketDataError>;

    /// Runs one streaming connection for `symbol@interval` until it ends.
    ///
    /// Returns `Ok(())` when the server closes the stream and `Err` on
    /// connection or transport failure. Malformed ticks are dropped by the
    /// implementation and never end the stream.
    async fn stream_klines(
        &self,
        symbol: &str,
        interval: Interval,
        handler: &dyn TickHandler,
    ) -> Result<(), MarketDataError>;
}

/// Durable text key-value storage.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, PersistenceError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError>;
    async fn remove(&self, key: &str) -> Result<(), PersistenceError>;
}
