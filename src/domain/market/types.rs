use serde::{Deserialize, Serialize};

/// One OHLCV bar. `open_time` is the exchange's bar start in milliseconds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Candle {
    pub open_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    pub fn new(open_time: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            open_time,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// A flat bar where every price equals `price`.
    pub fn flat(open_time: i64, price: f64) -> Self {
        Self::new(open_time, price, price, price, price, 0.0)
    }

    /// `low <= min(open, close) <= max(open, close) <= high`, all prices finite.
    pub fn is_consistent(&self) -> bool {
        let prices = [self.open, self.high, self.low, self.close, self.volume];
        if prices.iter().any(|p| !p.is_finite()) {
            return false;
        }
        self.low <= self.open.min(self.close) && self.open.max(self.close) <= self.high
    }
}

/// A single streamed kline update: the bar as it currently stands plus
/// whether the exchange has finalized it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KlineTick {
    pub candle: Candle,
    pub is_closed: bool,
}

/// Exchange symbols are upper-case without separators ("BTCUSDT").
pub fn normalize_symbol(symbol: &str) -> String {
    symbol
        .trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consistent_candle() {
        let candle = Candle::new(0, 100.0, 105.0, 99.0, 102.0, 10.0);
        assert!(candle.is_consistent());
        assert!(Candle::flat(0, 100.0).is_consistent());
    }

    #[test]
    fn test_inconsistent_candles() {
        // high below close
        assert!(!Candle::new(0, 100.0, 101.0, 99.0, 102.0, 1.0).is_consistent());
        // low above open
        assert!(!Candle::new(0, 100.0, 105.0, 100.5, 102.0, 1.0).is_consistent());
        assert!(!Candle::new(0, f64::NAN, 105.0, 99.0, 102.0, 1.0).is_consistent());
    }

    #[test]
    fn test_normalize_symbol() {
        assert_eq!(normalize_symbol("btcusdt"), "BTCUSDT");
        assert_eq!(normalize_symbol(" eth/usdt "), "ETHUSDT");
        assert_eq!(normalize_symbol("SOL-USDT"), "SOLUSDT");
    }
}
