use crate::application::analysis::{DEFAULT_SWING_LOOKBACK, detect_swing_points};
use crate::application::market_data::feed::{read_store, write_store};
use crate::application::market_data::{CandleClosed, CandleStore, MarketDataFeed, SharedCandleStore};
use crate::application::signals::{Arbitration, SignalArbiter, SignalHistoryLog, SignalSnapshots};
use crate::application::strategies::{SignalStrategy, StrategyFactory};
use crate::config::EngineConfig;
use crate::domain::events::{EngineEvent, EventListener};
use crate::domain::market::{Candle, Interval, normalize_symbol};
use crate::domain::ports::{KeyValueStore, MarketDataService};
use crate::domain::signals::{Signal, StrategyId};
use crate::infrastructure::event_bus::EventBus;
use anyhow::{Context, Result};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};

const CANDLE_CLOSED_QUEUE: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub symbol: String,
    pub interval: Interval,
}

/// Live signal engine for one (symbol, interval) subscription at a time.
///
/// Owns the candle window and the feed that fills it, runs the strategies
/// over it, arbitrates their output and publishes the results on the
/// event bus. Analysis passes never overlap: a pass triggered while another
/// is running is skipped. Symbol and interval changes wait for a running
/// pass to finish and hold off new ones until the post-backfill pass is done,
/// so a pass never mixes two subscriptions.
pub struct LiveSignalEngine {
    feed: MarketDataFeed,
    store: SharedCandleStore,
    strategies: Vec<Arc<dyn SignalStrategy>>,
    arbiter: Mutex<SignalArbiter>,
    history: Mutex<SignalHistoryLog>,
    snapshots: SignalSnapshots,
    event_bus: EventBus,
    subscription: tokio::sync::RwLock<Subscription>,
    closed_rx: std::sync::Mutex<Option<mpsc::Receiver<CandleClosed>>>,
    /// Held for the whole of an analysis pass and of a feed restart.
    pass_lock: Mutex<()>,
    min_candles: usize,
    swing_lookback: usize,
}

impl LiveSignalEngine {
    pub fn new(
        config: &EngineConfig,
        market_data: Arc<dyn MarketDataService>,
        key_value_store: Arc<dyn KeyValueStore>,
        event_bus: EventBus,
    ) -> Self {
        let store = Arc::new(RwLock::new(CandleStore::new(config.window_capacity)));
        let (closed_tx, closed_rx) = mpsc::channel(CANDLE_CLOSED_QUEUE);
        let feed = MarketDataFeed::new(
            market_data,
            store.clone(),
            closed_tx,
            config.reconnect_delay,
        )
        .with_backfill_limit(config.window_capacity);

        Self {
            feed,
            store,
            strategies: StrategyFactory::create_all(),
            arbiter: Mutex::new(SignalArbiter::new()),
            history: Mutex::new(SignalHistoryLog::new(
                key_value_store.clone(),
                config.history_capacity,
            )),
            snapshots: SignalSnapshots::new(key_value_store),
            event_bus,
            subscription: tokio::sync::RwLock::new(Subscription {
                symbol: normalize_symbol(&config.symbol),
                interval: config.interval,
            }),
            closed_rx: std::sync::Mutex::new(Some(closed_rx)),
            pass_lock: Mutex::new(()),
            min_candles: config.min_candles_for_analysis,
            swing_lookback: DEFAULT_SWING_LOOKBACK,
        }
    }

    pub async fn subscribe(&self, listener: Arc<dyn EventListener>) {
        self.event_bus.subscribe(listener).await;
    }

    /// Hands out the candle-closed event stream. Only the first caller gets it.
    pub fn take_candle_closed_events(&self) -> Option<mpsc::Receiver<CandleClosed>> {
        self.closed_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Restores the signal history from storage.
    pub async fn load_history(&self) -> usize {
        self.history.lock().await.load().await
    }

    /// Backfills and subscribes for the current symbol and interval, then
    /// runs one analysis pass. Returns the number of backfilled candles.
    pub async fn start(&self) -> usize {
        self.restart_feed(|_| {}).await
    }

    pub async fn stop(&self) {
        self.feed.stop().await;
    }

    pub async fn change_symbol(&self, symbol: &str) -> Result<usize> {
        let symbol = normalize_symbol(symbol);
        if symbol.is_empty() {
            anyhow::bail!("Symbol must contain at least one alphanumeric character");
        }

        info!("LiveSignalEngine: Switching symbol to {}", symbol);
        Ok(self
            .restart_feed(|subscription| subscription.symbol = symbol)
            .await)
    }

    pub async fn change_interval(&self, interval: Interval) -> usize {
        info!("LiveSignalEngine: Switching interval to {}", interval);
        self.restart_feed(|subscription| subscription.interval = interval)
            .await
    }

    /// Empties the signal history and drops every per-strategy snapshot.
    pub async fn clear_history(&self) -> Result<()> {
        let history_result = self.history.lock().await.clear().await;
        let snapshot_result = self.snapshots.clear_strategies().await;
        self.event_bus.publish(&EngineEvent::HistoryCleared).await;

        history_result.context("Failed to erase stored signal history")?;
        snapshot_result.context("Failed to erase strategy snapshots")?;
        Ok(())
    }

    /// Applies `update` to the subscription, then rebuilds the window and
    /// runs the first pass for it, all under the pass lock.
    async fn restart_feed(&self, update: impl FnOnce(&mut Subscription)) -> usize {
        let _pass = self.pass_lock.lock().await;

        let Subscription { symbol, interval } = {
            let mut subscription = self.subscription.write().await;
            update(&mut subscription);
            subscription.clone()
        };
        info!("LiveSignalEngine: Starting {}@{}", symbol, interval);

        self.arbiter.lock().await.reset();
        write_store(&self.store).clear();

        let backfilled = self.feed.start(&symbol, interval).await;
        self.analyze(&symbol).await;
        backfilled
    }

    /// One evaluation pass over the current window.
    ///
    /// Returns `None` when the pass was skipped, either because another pass
    /// or a restart is in progress or because the window is not ready yet.
    pub async fn run_analysis(&self) -> Option<Arbitration> {
        let Ok(_pass) = self.pass_lock.try_lock() else {
            debug!("LiveSignalEngine: Analysis or restart in progress, skipping");
            return None;
        };
        let symbol = self.current_symbol().await;
        self.analyze(&symbol).await
    }

    /// Caller holds `pass_lock`.
    async fn analyze(&self, symbol: &str) -> Option<Arbitration> {
        let candles = read_store(&self.store).snapshot();
        if candles.len() < self.min_candles {
            debug!(
                "LiveSignalEngine: Not ready ({} of {} candles)",
                candles.len(),
                self.min_candles
            );
            return None;
        }
        let latest_close = candles.last()?.close;

        let swings = detect_swing_points(&candles, self.swing_lookback);
        let evaluations = self
            .strategies
            .iter()
            .map(|strategy| (strategy.id(), strategy.analyze(&candles, &swings)))
            .collect();

        let timestamp = chrono::Utc::now().timestamp_millis();
        let arbitration = self
            .arbiter
            .lock()
            .await
            .arbitrate(symbol, evaluations, latest_close, timestamp);

        for update in &arbitration.updates {
            if let Err(e) = self.snapshots.save_strategy(&update.signal).await {
                warn!("LiveSignalEngine: Failed to persist {} snapshot: {}", update.strategy, e);
            }
            let updated = EngineEvent::StrategySignalUpdated {
                strategy: update.strategy,
                signal: update.signal.clone(),
            };
            self.event_bus.publish(&updated).await;
            if update.is_new {
                let new_signal = EngineEvent::NewSignal(update.signal.clone());
                self.event_bus.publish(&new_signal).await;
            }
        }

        let best = arbitration.best.clone();
        if let Err(e) = self.snapshots.save_live(&best).await {
            warn!("LiveSignalEngine: Failed to persist live signal: {}", e);
        }
        if let Err(e) = self.history.lock().await.record(best.clone()).await {
            warn!("LiveSignalEngine: Failed to persist signal history: {}", e);
        }
        self.event_bus
            .publish(&EngineEvent::SignalSelected(best))
            .await;

        Some(arbitration)
    }

    pub async fn subscription(&self) -> Subscription {
        self.subscription.read().await.clone()
    }

    pub async fn current_symbol(&self) -> String {
        self.subscription.read().await.symbol.clone()
    }

    pub async fn current_interval(&self) -> Interval {
        self.subscription.read().await.interval
    }

    /// Copy of the candle window, oldest first.
    pub fn candles(&self) -> Vec<Candle> {
        read_store(&self.store).snapshot()
    }

    pub fn is_ready(&self) -> bool {
        read_store(&self.store).len() >= self.min_candles
    }

    /// Signal history, most recent first.
    pub async fn history(&self) -> Vec<Signal> {
        self.history.lock().await.entries()
    }

    pub async fn latest_signal(&self, strategy: StrategyId) -> Option<Signal> {
        self.arbiter.lock().await.last_signal(strategy).cloned()
    }

    pub async fn is_streaming(&self) -> bool {
        self.feed.is_streaming().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::signals::SignalKind;
    use crate::infrastructure::mock::MockMarketDataService;
    use crate::domain::errors::PersistenceError;
    use crate::infrastructure::persistence::InMemoryKeyValueStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const MIN: i64 = 60_000;

    struct CountingListener {
        selected: AtomicUsize,
        new_signals: AtomicUsize,
    }

    impl EventListener for CountingListener {
        fn on_event(&self, event: &EngineEvent) {
            match event {
                EngineEvent::SignalSelected(_) => {
                    self.selected.fetch_add(1, Ordering::SeqCst);
                }
                EngineEvent::NewSignal(_) => {
                    self.new_signals.fetch_add(1, Ordering::SeqCst);
                }
                _ => {}
            }
        }
    }

    #[derive(Default)]
    struct SelectedSymbols(std::sync::Mutex<Vec<String>>);

    impl SelectedSymbols {
        fn symbols(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    impl EventListener for SelectedSymbols {
        fn on_event(&self, event: &EngineEvent) {
            if let EngineEvent::SignalSelected(signal) = event {
                self.0.lock().unwrap().push(signal.symbol.clone());
            }
        }
    }

    /// Key-value store whose writes take a while, to keep a pass in flight.
    struct SlowStore {
        inner: InMemoryKeyValueStore,
        delay: Duration,
    }

    #[async_trait]
    impl KeyValueStore for SlowStore {
        async fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
            tokio::time::sleep(self.delay).await;
            self.inner.set(key, value).await
        }

        async fn remove(&self, key: &str) -> Result<(), PersistenceError> {
            self.inner.remove(key).await
        }
    }

    fn flat(count: i64, price: f64) -> Vec<Candle> {
        (0..count).map(|i| Candle::flat(i * MIN, price)).collect()
    }

    fn engine_with(mock: MockMarketDataService) -> LiveSignalEngine {
        LiveSignalEngine::new(
            &EngineConfig::default(),
            Arc::new(mock),
            Arc::new(InMemoryKeyValueStore::new()),
            EventBus::new(),
        )
    }

    #[tokio::test]
    async fn test_not_ready_below_minimum() {
        let engine = engine_with(MockMarketDataService::with_candles(flat(49, 100.0)));
        assert_eq!(engine.start().await, 49);
        assert!(!engine.is_ready());
        assert!(engine.run_analysis().await.is_none());
        assert!(engine.history().await.is_empty());
        engine.stop().await;
    }

    #[tokio::test]
    async fn test_start_runs_analysis_after_backfill() {
        let engine = engine_with(MockMarketDataService::with_candles(flat(60, 100.0)));
        let listener = Arc::new(CountingListener {
            selected: AtomicUsize::new(0),
            new_signals: AtomicUsize::new(0),
        });
        engine.subscribe(listener.clone()).await;

        engine.start().await;

        assert_eq!(listener.selected.load(Ordering::SeqCst), 1);
        assert_eq!(listener.new_signals.load(Ordering::SeqCst), 3);
        assert_eq!(engine.history().await.len(), 1);
        engine.stop().await;
    }

    #[tokio::test]
    async fn test_repeated_pass_is_not_new() {
        let engine = engine_with(MockMarketDataService::with_candles(flat(60, 100.0)));
        engine.start().await;

        let second = engine.run_analysis().await.unwrap();
        assert!(second.updates.iter().all(|u| !u.is_new));
        assert_eq!(engine.history().await.len(), 2);
        engine.stop().await;
    }

    #[tokio::test]
    async fn test_change_symbol_resets_state() {
        let mock = MockMarketDataService::with_candles(flat(60, 100.0));
        mock.set_candles("ETHUSDT", flat(70, 2000.0)).await;
        let engine = engine_with(mock);
        engine.start().await;

        let backfilled = engine.change_symbol("eth/usdt").await.unwrap();
        assert_eq!(backfilled, 70);
        assert_eq!(engine.current_symbol().await, "ETHUSDT");
        assert_eq!(engine.candles().last().map(|c| c.close), Some(2000.0));

        let trend = engine.latest_signal(StrategyId::Trend).await.unwrap();
        assert_eq!(trend.symbol, "ETHUSDT");
        assert_eq!(trend.kind, SignalKind::Neutral);
        engine.stop().await;
    }

    #[tokio::test]
    async fn test_change_symbol_rejects_empty() {
        let engine = engine_with(MockMarketDataService::new());
        assert!(engine.change_symbol(" / ").await.is_err());
        assert_eq!(engine.current_symbol().await, "BTCUSDT");
    }

    #[tokio::test]
    async fn test_change_interval_refetches() {
        let mock = MockMarketDataService::with_candles(flat(60, 100.0));
        let engine = LiveSignalEngine::new(
            &EngineConfig::default(),
            Arc::new(mock.clone()),
            Arc::new(InMemoryKeyValueStore::new()),
            EventBus::new(),
        );
        engine.start().await;
        engine.change_interval(Interval::OneHour).await;

        assert_eq!(engine.current_interval().await, Interval::OneHour);
        assert_eq!(mock.fetch_count(), 2);
        engine.stop().await;
    }

    #[tokio::test]
    async fn test_reentrant_pass_is_skipped() {
        let engine = engine_with(MockMarketDataService::with_candles(flat(60, 100.0)));
        engine.start().await;

        let busy = engine.pass_lock.try_lock().unwrap();
        assert!(engine.run_analysis().await.is_none());
        drop(busy);
        assert!(engine.run_analysis().await.is_some());
        engine.stop().await;
    }

    #[tokio::test]
    async fn test_symbol_change_waits_for_running_pass() {
        let mock = MockMarketDataService::with_candles(flat(60, 100.0));
        mock.set_candles("ETHUSDT", flat(60, 2000.0)).await;
        let engine = Arc::new(LiveSignalEngine::new(
            &EngineConfig::default(),
            Arc::new(mock),
            Arc::new(SlowStore {
                inner: InMemoryKeyValueStore::new(),
                delay: Duration::from_millis(20),
            }),
            EventBus::new(),
        ));
        let selected = Arc::new(SelectedSymbols::default());
        engine.subscribe(selected.clone()).await;
        engine.start().await;

        let pass = tokio::spawn({
            let engine = engine.clone();
            async move { engine.run_analysis().await }
        });
        // Let the pass start persisting before switching.
        tokio::time::sleep(Duration::from_millis(10)).await;
        engine.change_symbol("ETHUSDT").await.unwrap();
        let at_return = selected.symbols();

        let running = pass.await.unwrap().unwrap();
        assert_eq!(running.best.symbol, "BTCUSDT");
        assert_eq!(at_return, vec!["BTCUSDT", "BTCUSDT", "ETHUSDT"]);
        assert_eq!(selected.symbols(), at_return);

        let history = engine.history().await;
        assert_eq!(history[0].symbol, "ETHUSDT");
        assert_eq!(history[0].price, Some(2000.0));
        assert_eq!(history[1].symbol, "BTCUSDT");
        engine.stop().await;
    }

    #[tokio::test]
    async fn test_pass_during_restart_is_skipped() {
        let mock = MockMarketDataService::with_candles(flat(60, 100.0));
        let engine = Arc::new(LiveSignalEngine::new(
            &EngineConfig::default(),
            Arc::new(mock),
            Arc::new(SlowStore {
                inner: InMemoryKeyValueStore::new(),
                delay: Duration::from_millis(20),
            }),
            EventBus::new(),
        ));

        let restart = tokio::spawn({
            let engine = engine.clone();
            async move { engine.change_symbol("ETHUSDT").await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(engine.run_analysis().await.is_none());

        restart.await.unwrap().unwrap();
        assert_eq!(engine.history().await.len(), 1);
        engine.stop().await;
    }

    #[tokio::test]
    async fn test_candle_closed_receiver_is_handed_out_once() {
        let engine = engine_with(MockMarketDataService::new());
        assert!(engine.take_candle_closed_events().is_some());
        assert!(engine.take_candle_closed_events().is_none());
    }
}
