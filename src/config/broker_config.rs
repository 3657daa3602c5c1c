//! Exchange endpoint configuration parsed from environment variables.

use std::env;

/// Binance public market data endpoints
#[derive(Debug, Clone)]
pub struct BinanceConfig {
    pub base_url: String,
    pub ws_url: String,
}

impl Default for BinanceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.binance.com".to_string(),
            ws_url: "wss://stream.binance.com:9443".to_string(),
        }
    }
}

impl BinanceConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: env::var("BINANCE_BASE_URL").unwrap_or(defaults.base_url),
            ws_url: env::var("BINANCE_WS_URL").unwrap_or(defaults.ws_url),
        }
    }
}
