use super::candle_store::{CandleStore, CandleUpdate};
use crate::domain::market::{Interval, KlineTick};
use crate::domain::ports::{MarketDataService, TickHandler};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

pub type SharedCandleStore = Arc<RwLock<CandleStore>>;

pub const BACKFILL_LIMIT: usize = 500;

/// Raised when the exchange finalizes a bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandleClosed {
    pub open_time: i64,
}

pub(crate) fn read_store(store: &RwLock<CandleStore>) -> RwLockReadGuard<'_, CandleStore> {
    store.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write_store(store: &RwLock<CandleStore>) -> RwLockWriteGuard<'_, CandleStore> {
    store.write().unwrap_or_else(PoisonError::into_inner)
}

/// Bridges the bulk kline fetch and the live kline stream into one
/// `CandleStore`. One subscription is live at a time; starting a new one
/// aborts the previous stream task together with its pending reconnect.
pub struct MarketDataFeed {
    market_data: Arc<dyn MarketDataService>,
    store: SharedCandleStore,
    closed_tx: mpsc::Sender<CandleClosed>,
    /// Bumped on every (re)start. Ticks carrying an older value are dropped.
    generation: Arc<AtomicU64>,
    task_handle: Mutex<Option<JoinHandle<()>>>,
    backfill_limit: usize,
    reconnect_delay: Duration,
}

impl MarketDataFeed {
    pub fn new(
        market_data: Arc<dyn MarketDataService>,
        store: SharedCandleStore,
        closed_tx: mpsc::Sender<CandleClosed>,
        reconnect_delay: Duration,
    ) -> Self {
        Self {
            market_data,
            store,
            closed_tx,
            generation: Arc::new(AtomicU64::new(0)),
            task_handle: Mutex::new(None),
            backfill_limit: BACKFILL_LIMIT,
            reconnect_delay,
        }
    }

    pub fn with_backfill_limit(mut self, limit: usize) -> Self {
        self.backfill_limit = limit;
        self
    }

    pub fn store(&self) -> SharedCandleStore {
        self.store.clone()
    }

    /// Clears the window, backfills it and spawns the supervised stream task.
    /// A failed backfill leaves the window empty; the stream is opened anyway.
    /// Returns the number of candles in the window after backfill.
    pub async fn start(&self, symbol: &str, interval: Interval) -> usize {
        let mut handle_guard = self.task_handle.lock().await;
        let subscription = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        if let Some(handle) = handle_guard.take() {
            debug!("MarketDataFeed: Aborting previous stream task");
            handle.abort();
        }

        write_store(&self.store).clear();

        let candles = match self
            .market_data
            .fetch_klines(symbol, interval, self.backfill_limit)
            .await
        {
            Ok(candles) => candles,
            Err(e) => {
                error!("MarketDataFeed: Backfill failed for {}@{}: {}", symbol, interval, e);
                Vec::new()
            }
        };

        let backfilled = {
            let mut store = write_store(&self.store);
            store.backfill(candles);
            store.len()
        };
        info!(
            "MarketDataFeed: Backfilled {} candles for {}@{}",
            backfilled, symbol, interval
        );

        let handler = FeedTickHandler {
            store: self.store.clone(),
            generation: self.generation.clone(),
            subscription,
            closed_tx: self.closed_tx.clone(),
        };
        let market_data = self.market_data.clone();
        let symbol = symbol.to_string();
        let reconnect_delay = self.reconnect_delay;

        let handle = tokio::spawn(async move {
            Self::run_stream(market_data, symbol, interval, handler, reconnect_delay).await;
        });
        *handle_guard = Some(handle);

        backfilled
    }

    /// Aborts the stream task. Ticks still in flight are discarded.
    pub async fn stop(&self) {
        let mut handle_guard = self.task_handle.lock().await;
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(handle) = handle_guard.take() {
            handle.abort();
            info!("MarketDataFeed: Stream stopped");
        }
    }

    pub async fn is_streaming(&self) -> bool {
        self.task_handle
            .lock()
            .await
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    async fn run_stream(
        market_data: Arc<dyn MarketDataService>,
        symbol: String,
        interval: Interval,
        handler: FeedTickHandler,
        reconnect_delay: Duration,
    ) {
        loop {
            match market_data.stream_klines(&symbol, interval, &handler).await {
                Ok(()) => info!(
                    "MarketDataFeed: Stream {}@{} closed. Reconnecting in {}s...",
                    symbol,
                    interval,
                    reconnect_delay.as_secs()
                ),
                Err(e) => error!(
                    "MarketDataFeed: Stream {}@{} failed: {}. Reconnecting in {}s...",
                    symbol,
                    interval,
                    e,
                    reconnect_delay.as_secs()
                ),
            }
            tokio::time::sleep(reconnect_delay).await;
        }
    }
}

struct FeedTickHandler {
    store: SharedCandleStore,
    generation: Arc<AtomicU64>,
    subscription: u64,
    closed_tx: mpsc::Sender<CandleClosed>,
}

impl TickHandler for FeedTickHandler {
    fn on_tick(&self, tick: KlineTick) {
        if self.generation.load(Ordering::SeqCst) != self.subscription {
            debug!("MarketDataFeed: Dropping tick from superseded subscription");
            return;
        }
        if !tick.candle.is_consistent() {
            warn!(
                "MarketDataFeed: Dropping inconsistent tick at {}",
                tick.candle.open_time
            );
            return;
        }

        let update = write_store(&self.store).apply_update(tick.candle, tick.is_closed);

        if tick.is_closed && update != CandleUpdate::Ignored {
            let event = CandleClosed {
                open_time: tick.candle.open_time,
            };
            // A full queue already holds a pending trigger.
            if let Err(e) = self.closed_tx.try_send(event) {
                debug!("MarketDataFeed: Candle-closed event not queued: {}", e);
            }
        }
    }
}
