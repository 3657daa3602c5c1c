// Market data processing modules
pub mod candle_store;
pub mod feed;

pub use candle_store::{CandleStore, CandleUpdate, DEFAULT_WINDOW_CAPACITY};
pub use feed::{BACKFILL_LIMIT, CandleClosed, MarketDataFeed, SharedCandleStore};
