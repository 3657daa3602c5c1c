pub mod binance;
pub mod core;
pub mod event_bus;
pub mod mock;
pub mod persistence;

pub use event_bus::EventBus;
pub use mock::MockMarketDataService;
pub use persistence::{InMemoryKeyValueStore, JsonFileStore};
