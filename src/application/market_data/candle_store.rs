use crate::domain::market::Candle;
use std::collections::VecDeque;
use tracing::{debug, warn};

/// Maximum number of bars kept for one (symbol, interval) pair.
pub const DEFAULT_WINDOW_CAPACITY: usize = 500;

/// What `apply_update` did with a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandleUpdate {
    /// A new bar was started at the tail.
    Appended,
    /// The open tail bar was overwritten in place.
    Replaced,
    /// The tick was older than the tail, or targeted a finalized bar. Nothing changed.
    Ignored,
}

/// Rolling window of OHLCV bars for one (symbol, interval) pair.
///
/// Open times are strictly increasing. Only the tail bar may still be open;
/// once a close tick for it has been applied it is never modified again.
#[derive(Debug)]
pub struct CandleStore {
    candles: VecDeque<Candle>,
    capacity: usize,
    tail_closed: bool,
}

impl CandleStore {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            candles: VecDeque::with_capacity(capacity),
            capacity,
            tail_closed: false,
        }
    }

    /// Replaces the whole window. Out-of-order or duplicate bars are dropped and
    /// only the newest `capacity` bars are kept. The tail is treated as open.
    pub fn backfill(&mut self, candles: Vec<Candle>) {
        let mut window: VecDeque<Candle> = VecDeque::with_capacity(self.capacity);
        let mut dropped = 0usize;

        for candle in candles {
            if let Some(last) = window.back()
                && candle.open_time <= last.open_time
            {
                dropped += 1;
                continue;
            }
            window.push_back(candle);
        }

        while window.len() > self.capacity {
            window.pop_front();
        }

        if dropped > 0 {
            warn!(
                "CandleStore: backfill dropped {} out-of-order or duplicate bars",
                dropped
            );
        }

        self.candles = window;
        self.tail_closed = false;
    }

    /// Applies one streamed bar state.
    ///
    /// Same open time as the tail: overwrite it (unless it is already final).
    /// Newer open time: append a new tail, evicting the oldest bar on overflow.
    /// Older open time: ignored.
    pub fn apply_update(&mut self, candle: Candle, is_closed: bool) -> CandleUpdate {
        let tail_time = self.candles.back().map(|c| c.open_time);

        let outcome = match tail_time {
            Some(t) if candle.open_time < t => {
                warn!(
                    "CandleStore: stale tick {} ignored (tail is {})",
                    candle.open_time, t
                );
                return CandleUpdate::Ignored;
            }
            Some(t) if candle.open_time == t => {
                if self.tail_closed {
                    debug!(
                        "CandleStore: bar {} already final, tick ignored",
                        candle.open_time
                    );
                    return CandleUpdate::Ignored;
                }
                if let Some(last) = self.candles.back_mut() {
                    *last = candle;
                }
                CandleUpdate::Replaced
            }
            _ => {
                self.candles.push_back(candle);
                while self.candles.len() > self.capacity {
                    self.candles.pop_front();
                }
                CandleUpdate::Appended
            }
        };

        self.tail_closed = is_closed;
        outcome
    }

    /// Owned copy of the window, oldest first.
    pub fn snapshot(&self) -> Vec<Candle> {
        self.candles.iter().copied().collect()
    }

    pub fn latest(&self) -> Option<&Candle> {
        self.candles.back()
    }

    pub fn latest_close(&self) -> Option<f64> {
        self.candles.back().map(|c| c.close)
    }

    /// True while the tail bar can still change.
    pub fn has_open_tail(&self) -> bool {
        !self.candles.is_empty() && !self.tail_closed
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.candles.clear();
        self.tail_closed = false;
    }
}

impl Default for CandleStore {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(open_time: i64, close: f64) -> Candle {
        Candle::new(open_time, close, close + 1.0, close - 1.0, close, 1.0)
    }

    fn assert_strictly_increasing(store: &CandleStore) {
        let snapshot = store.snapshot();
        for pair in snapshot.windows(2) {
            assert!(
                pair[0].open_time < pair[1].open_time,
                "open times not increasing: {} then {}",
                pair[0].open_time,
                pair[1].open_time
            );
        }
    }

    #[test]
    fn test_first_update_appends() {
        let mut store = CandleStore::default();
        assert_eq!(store.apply_update(bar(0, 100.0), false), CandleUpdate::Appended);
        assert_eq!(store.len(), 1);
        assert!(store.has_open_tail());
    }

    #[test]
    fn test_same_open_time_replaces_in_place() {
        let mut store = CandleStore::default();
        store.apply_update(bar(0, 100.0), false);
        assert_eq!(store.apply_update(bar(0, 101.0), false), CandleUpdate::Replaced);
        assert_eq!(store.len(), 1);
        assert_eq!(store.latest_close(), Some(101.0));
    }

    #[test]
    fn test_close_then_new_bar_appends() {
        let mut store = CandleStore::default();
        store.apply_update(bar(0, 100.0), false);
        assert_eq!(store.apply_update(bar(0, 102.0), true), CandleUpdate::Replaced);
        assert!(!store.has_open_tail());

        assert_eq!(store.apply_update(bar(60_000, 103.0), false), CandleUpdate::Appended);
        assert_eq!(store.len(), 2);
        assert_eq!(store.snapshot()[0].close, 102.0);
    }

    #[test]
    fn test_finalized_bar_is_immutable() {
        let mut store = CandleStore::default();
        store.apply_update(bar(0, 100.0), true);
        assert_eq!(store.apply_update(bar(0, 50.0), false), CandleUpdate::Ignored);
        assert_eq!(store.latest_close(), Some(100.0));
    }

    #[test]
    fn test_stale_tick_is_ignored() {
        let mut store = CandleStore::default();
        store.apply_update(bar(60_000, 100.0), false);
        assert_eq!(store.apply_update(bar(0, 90.0), true), CandleUpdate::Ignored);
        assert_eq!(store.len(), 1);
        assert_eq!(store.latest_close(), Some(100.0));
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut store = CandleStore::new(3);
        for i in 0..5 {
            store.apply_update(bar(i * 60_000, 100.0 + i as f64), true);
        }
        assert_eq!(store.len(), 3);
        assert_eq!(store.snapshot()[0].open_time, 2 * 60_000);
    }

    #[test]
    fn test_backfill_replaces_window_and_trims() {
        let mut store = CandleStore::new(500);
        store.apply_update(bar(999_999_999, 1.0), true);

        let history: Vec<Candle> = (0..600).map(|i| bar(i * 60_000, 100.0)).collect();
        store.backfill(history);

        assert_eq!(store.len(), 500);
        assert_eq!(store.snapshot()[0].open_time, 100 * 60_000);
        assert!(store.has_open_tail());
    }

    #[test]
    fn test_backfill_drops_duplicates_and_disorder() {
        let mut store = CandleStore::default();
        store.backfill(vec![bar(0, 1.0), bar(60_000, 2.0), bar(60_000, 3.0), bar(30_000, 4.0)]);
        assert_eq!(store.len(), 2);
        assert_strictly_increasing(&store);
    }

    #[test]
    fn test_window_invariants_hold_over_mixed_sequence() {
        let mut store = CandleStore::default();
        store.backfill((0..480).map(|i| bar(i * 60_000, 100.0)).collect());

        // Mix of in-place updates, closes, stale ticks and new bars.
        let mut t = 479 * 60_000;
        for step in 0..200 {
            match step % 4 {
                0 => {
                    store.apply_update(bar(t, 101.0), false);
                }
                1 => {
                    store.apply_update(bar(t, 102.0), true);
                }
                2 => {
                    store.apply_update(bar(t - 120_000, 1.0), false);
                }
                _ => {
                    t += 60_000;
                    store.apply_update(bar(t, 103.0), false);
                }
            }
            assert!(store.len() <= DEFAULT_WINDOW_CAPACITY);
            assert_strictly_increasing(&store);
        }
        assert_eq!(store.len(), DEFAULT_WINDOW_CAPACITY);
    }

    #[test]
    fn test_clear() {
        let mut store = CandleStore::default();
        store.apply_update(bar(0, 1.0), false);
        store.clear();
        assert!(store.is_empty());
        assert!(!store.has_open_tail());
        assert_eq!(store.latest_close(), None);
    }
}
