//! Configuration module for livesignals.
//!
//! Structured configuration loading from environment variables, split into
//! exchange endpoints and engine parameters.

mod broker_config;
mod engine_config;

pub use broker_config::BinanceConfig;
pub use engine_config::{DEFAULT_MIN_CANDLES_FOR_ANALYSIS, EngineConfig};

use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;

/// Where market data comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Synthetic candles, no network access.
    Mock,
    Binance,
}

impl FromStr for Mode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mock" => Ok(Mode::Mock),
            "binance" => Ok(Mode::Binance),
            _ => anyhow::bail!("Invalid MODE: {}. Must be 'mock' or 'binance'", s),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub mode: Mode,
    pub binance: BinanceConfig,
    pub engine: EngineConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let mode_str = env::var("MODE").unwrap_or_else(|_| "binance".to_string());
        let mode = Mode::from_str(&mode_str)?;

        Ok(Self {
            mode,
            binance: BinanceConfig::from_env(),
            engine: EngineConfig::from_env().context("Failed to load engine config")?,
        })
    }
}
