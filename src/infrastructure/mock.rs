use crate::domain::errors::MarketDataError;
use crate::domain::market::{Candle, Interval, KlineTick};
use crate::domain::ports::{MarketDataService, TickHandler};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::info;

const TICKS_PER_BAR: u64 = 10;

/// Scripted market data for tests, or a pseudo-random walk for offline runs.
///
/// In scripted mode `fetch_klines` returns the preset candles for the symbol
/// (or the default set) and every stream connection replays the preset ticks,
/// then stays open unless `closing_streams` was requested.
#[derive(Clone)]
pub struct MockMarketDataService {
    candles_by_symbol: Arc<RwLock<HashMap<String, Vec<Candle>>>>,
    default_candles: Vec<Candle>,
    ticks: Vec<KlineTick>,
    fail_fetch: bool,
    close_streams: bool,
    pub simulation_enabled: bool,
    fetch_count: Arc<AtomicUsize>,
    connection_count: Arc<AtomicUsize>,
    connections_by_symbol: Arc<RwLock<HashMap<String, usize>>>,
}

impl MockMarketDataService {
    pub fn new() -> Self {
        Self {
            candles_by_symbol: Arc::new(RwLock::new(HashMap::new())),
            default_candles: Vec::new(),
            ticks: Vec::new(),
            fail_fetch: false,
            close_streams: false,
            simulation_enabled: false,
            fetch_count: Arc::new(AtomicUsize::new(0)),
            connection_count: Arc::new(AtomicUsize::new(0)),
            connections_by_symbol: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Random-walk candles and a live tick stream, no network.
    pub fn simulated() -> Self {
        Self {
            simulation_enabled: true,
            ..Self::new()
        }
    }

    pub fn with_candles(candles: Vec<Candle>) -> Self {
        Self {
            default_candles: candles,
            ..Self::new()
        }
    }

    /// Every fetch fails with a `DataFetch` error.
    pub fn failing() -> Self {
        Self {
            fail_fetch: true,
            ..Self::new()
        }
    }

    pub fn with_ticks(mut self, ticks: Vec<KlineTick>) -> Self {
        self.ticks = ticks;
        self
    }

    /// Stream connections end right after replaying their ticks.
    pub fn closing_streams(mut self) -> Self {
        self.close_streams = true;
        self
    }

    pub async fn set_candles(&self, symbol: &str, candles: Vec<Candle>) {
        self.candles_by_symbol
            .write()
            .await
            .insert(symbol.to_string(), candles);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }

    pub fn connection_count(&self) -> usize {
        self.connection_count.load(Ordering::SeqCst)
    }

    pub async fn connections_for(&self, symbol: &str) -> usize {
        self.connections_by_symbol
            .read()
            .await
            .get(symbol)
            .copied()
            .unwrap_or(0)
    }
}

impl Default for MockMarketDataService {
    fn default() -> Self {
        Self::new()
    }
}

fn base_price(symbol: &str) -> f64 {
    if symbol.contains("BTC") {
        96000.0
    } else if symbol.contains("ETH") {
        3400.0
    } else {
        150.0
    }
}

/// Linear congruential step mapped to a -0.5%..+0.5% move.
fn next_move(iteration: u64) -> f64 {
    let seed = iteration.wrapping_mul(1103515245).wrapping_add(12345);
    let random_val = ((seed / 65536) % 1000) as f64 / 1000.0 - 0.5;
    random_val * 0.01
}

fn interval_ms(interval: Interval) -> i64 {
    interval.to_minutes() as i64 * 60_000
}

fn simulate_history(symbol: &str, interval: Interval, limit: usize) -> Vec<Candle> {
    let step = interval_ms(interval);
    let now = chrono::Utc::now().timestamp_millis();
    let start = now - now.rem_euclid(step) - step * limit.saturating_sub(1) as i64;

    let mut price = base_price(symbol);
    (0..limit as u64)
        .map(|i| {
            let open = price;
            let close = open * (1.0 + next_move(i));
            let high = open.max(close) * (1.0 + next_move(i + 7).abs() / 2.0);
            let low = open.min(close) * (1.0 - next_move(i + 13).abs() / 2.0);
            price = close;
            Candle::new(start + i as i64 * step, open, high, low, close, 1.0 + (i % 5) as f64)
        })
        .collect()
}

#[async_trait]
impl MarketDataService for MockMarketDataService {
    async fn fetch_klines(
        &self,
        symbol: &str,
        interval: Interval,
        limit: usize,
    ) -> Result<Vec<Candle>, MarketDataError> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);

        if self.fail_fetch {
            return Err(MarketDataError::DataFetch {
                symbol: symbol.to_string(),
                reason: "mock fetch failure".to_string(),
            });
        }
        if self.simulation_enabled {
            return Ok(simulate_history(symbol, interval, limit));
        }

        let candles = match self.candles_by_symbol.read().await.get(symbol) {
            Some(candles) => candles.clone(),
            None => self.default_candles.clone(),
        };
        let skip = candles.len().saturating_sub(limit);
        Ok(candles.into_iter().skip(skip).collect())
    }

    async fn stream_klines(
        &self,
        symbol: &str,
        interval: Interval,
        handler: &dyn TickHandler,
    ) -> Result<(), MarketDataError> {
        self.connection_count.fetch_add(1, Ordering::SeqCst);
        *self
            .connections_by_symbol
            .write()
            .await
            .entry(symbol.to_string())
            .or_default() += 1;

        if self.simulation_enabled {
            info!(
                "MockMarketDataService: Starting kline simulation for {}@{}",
                symbol, interval
            );
            let step = interval_ms(interval);
            let mut bar = simulate_history(symbol, interval, 1)
                .pop()
                .unwrap_or_else(|| Candle::flat(0, base_price(symbol)));
            let mut ticker = tokio::time::interval(Duration::from_millis(500));
            let mut iteration = 0u64;

            loop {
                ticker.tick().await;
                iteration += 1;

                let price = bar.close * (1.0 + next_move(iteration));
                bar.close = price;
                bar.high = bar.high.max(price);
                bar.low = bar.low.min(price);
                bar.volume += 1.0;

                let is_closed = iteration % TICKS_PER_BAR == 0;
                handler.on_tick(KlineTick {
                    candle: bar,
                    is_closed,
                });
                if is_closed {
                    bar = Candle::flat(bar.open_time + step, price);
                }
            }
        }

        for tick in &self.ticks {
            handler.on_tick(*tick);
        }

        if self.close_streams {
            return Ok(());
        }
        std::future::pending::<()>().await;
        Ok(())
    }
}
