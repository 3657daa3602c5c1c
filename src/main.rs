//! livesignals - headless live signal engine
//!
//! Streams klines for one symbol, runs the trend, trendline and channel
//! strategies over them and logs the selected signals.
//!
//! # Usage
//! ```sh
//! SIGNAL_SYMBOL=ETHUSDT SIGNAL_INTERVAL=1h cargo run
//! cargo run -- --mock --symbol BTCUSDT
//! ```
//!
//! While running, commands are read from stdin, one per line:
//! `symbol <SYMBOL>`, `interval <INTERVAL>`, `clear`, `history`.

use anyhow::{Context, Result};
use clap::Parser;
use livesignals::application::{AnalysisScheduler, LiveSignalEngine};
use livesignals::config::{Config, Mode};
use livesignals::domain::events::LoggingListener;
use livesignals::domain::market::Interval;
use livesignals::domain::ports::{KeyValueStore, MarketDataService};
use livesignals::infrastructure::binance::BinanceMarketDataService;
use livesignals::infrastructure::{EventBus, JsonFileStore, MockMarketDataService};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{Level, info, warn};
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(author, version, about = "Live trading signal engine")]
struct Args {
    /// Symbol to follow (overrides SIGNAL_SYMBOL)
    #[arg(short, long)]
    symbol: Option<String>,

    /// Kline interval, e.g. 15m or 1h (overrides SIGNAL_INTERVAL)
    #[arg(short, long)]
    interval: Option<Interval>,

    /// Use simulated market data instead of Binance
    #[arg(long)]
    mock: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false).pretty();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    info!("livesignals {} starting...", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();
    let mut config = Config::from_env()?;
    if let Some(symbol) = args.symbol {
        config.engine.symbol = symbol;
    }
    if let Some(interval) = args.interval {
        config.engine.interval = interval;
    }
    if args.mock {
        config.mode = Mode::Mock;
    }
    info!(
        "Configuration loaded: Mode={:?}, Symbol={}, Interval={}",
        config.mode, config.engine.symbol, config.engine.interval
    );

    let market_data: Arc<dyn MarketDataService> = match config.mode {
        Mode::Binance => Arc::new(BinanceMarketDataService::new(&config.binance)),
        Mode::Mock => Arc::new(MockMarketDataService::simulated()),
    };
    let store: Arc<dyn KeyValueStore> = Arc::new(
        JsonFileStore::new(&config.engine.store_dir).context("Failed to open signal store")?,
    );

    let event_bus = EventBus::new();
    event_bus.subscribe(Arc::new(LoggingListener)).await;

    let engine = Arc::new(LiveSignalEngine::new(
        &config.engine,
        market_data,
        store,
        event_bus,
    ));

    let restored = engine.load_history().await;
    info!("Restored {} signals from history", restored);

    let mut scheduler = AnalysisScheduler::spawn(engine.clone(), config.engine.analysis_interval);
    engine.start().await;

    info!("Engine running. Press Ctrl+C to shutdown.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal?;
                break;
            }
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => {
                    if let Err(e) = handle_command(&engine, line.trim()).await {
                        warn!("Command failed: {:#}", e);
                    }
                }
                Ok(None) | Err(_) => stdin_open = false,
            },
        }
    }

    info!("Shutdown signal received. Exiting...");
    scheduler.stop();
    engine.stop().await;

    Ok(())
}

async fn handle_command(engine: &LiveSignalEngine, line: &str) -> Result<()> {
    let mut parts = line.split_whitespace();
    match (parts.next(), parts.next()) {
        (None, _) => {}
        (Some("symbol"), Some(symbol)) => {
            engine.change_symbol(symbol).await?;
        }
        (Some("interval"), Some(raw)) => {
            let interval: Interval = raw.parse()?;
            engine.change_interval(interval).await;
        }
        (Some("clear"), None) => engine.clear_history().await?,
        (Some("history"), None) => {
            for signal in engine.history().await {
                info!("{}", signal);
            }
        }
        _ => anyhow::bail!(
            "Unknown command '{}'. Expected: symbol <SYMBOL>, interval <INTERVAL>, clear, history",
            line
        ),
    }
    Ok(())
}
