//! Engine parameters parsed from environment variables.
//!
//! Numeric values that fail to parse fall back to their defaults with a warning.
//! An unknown interval is a hard error.

use crate::application::market_data::DEFAULT_WINDOW_CAPACITY;
use crate::application::signals::DEFAULT_HISTORY_CAPACITY;
use crate::domain::market::{Interval, normalize_symbol};
use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_MIN_CANDLES_FOR_ANALYSIS: usize = 50;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub symbol: String,
    pub interval: Interval,
    pub analysis_interval: Duration,
    pub reconnect_delay: Duration,
    pub window_capacity: usize,
    pub min_candles_for_analysis: usize,
    pub history_capacity: usize,
    pub store_dir: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            symbol: "BTCUSDT".to_string(),
            interval: Interval::default(),
            analysis_interval: Duration::from_secs(15),
            reconnect_delay: Duration::from_secs(5),
            window_capacity: DEFAULT_WINDOW_CAPACITY,
            min_candles_for_analysis: DEFAULT_MIN_CANDLES_FOR_ANALYSIS,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            store_dir: default_store_dir(),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let symbol = env::var("SIGNAL_SYMBOL")
            .map(|s| normalize_symbol(&s))
            .unwrap_or(defaults.symbol);

        let interval = match env::var("SIGNAL_INTERVAL") {
            Ok(raw) => Interval::from_str(raw.trim()).context("Failed to parse SIGNAL_INTERVAL")?,
            Err(_) => defaults.interval,
        };

        let store_dir = env::var("SIGNAL_STORE_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.store_dir);

        Ok(Self {
            symbol,
            interval,
            analysis_interval: Duration::from_secs(parse_or(
                "ANALYSIS_INTERVAL_SECS",
                defaults.analysis_interval.as_secs(),
            )),
            reconnect_delay: Duration::from_secs(parse_or(
                "RECONNECT_DELAY_SECS",
                defaults.reconnect_delay.as_secs(),
            )),
            window_capacity: parse_or("CANDLE_WINDOW_CAPACITY", defaults.window_capacity),
            min_candles_for_analysis: parse_or(
                "MIN_CANDLES_FOR_ANALYSIS",
                defaults.min_candles_for_analysis,
            ),
            history_capacity: parse_or("SIGNAL_HISTORY_CAPACITY", defaults.history_capacity),
            store_dir,
        })
    }
}

fn default_store_dir() -> PathBuf {
    match env::var("HOME") {
        Ok(home) => PathBuf::from(home).join(".livesignals"),
        Err(_) => PathBuf::from(".livesignals"),
    }
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Config: invalid value '{}' for {}, using default", raw, key);
            default
        }),
        Err(_) => default,
    }
}
