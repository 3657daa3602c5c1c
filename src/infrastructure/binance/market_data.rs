//! Binance Market Data Service
//!
//! Public (unauthenticated) market data:
//! - Historical klines over REST
//! - Live kline updates over WebSocket

use super::common::{value_as_f64, value_as_i64};
use super::websocket::BinanceKlineStream;
use crate::config::BinanceConfig;
use crate::domain::errors::MarketDataError;
use crate::domain::market::{Candle, Interval};
use crate::domain::ports::{MarketDataService, TickHandler};
use crate::infrastructure::core::http_client_factory::{HttpClientFactory, build_url_with_query};
use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde_json::Value;
use tracing::{info, warn};

pub struct BinanceMarketDataService {
    client: ClientWithMiddleware,
    base_url: String,
    stream: BinanceKlineStream,
}

impl BinanceMarketDataService {
    pub fn new(config: &BinanceConfig) -> Self {
        Self {
            client: HttpClientFactory::create_client(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            stream: BinanceKlineStream::new(config.ws_url.clone()),
        }
    }
}

/// Converts a klines response body into candles, oldest first.
///
/// Rows are `[openTime, open, high, low, close, volume, ...]`. Rows that are
/// too short or carry unparseable values are skipped.
pub fn parse_kline_rows(symbol: &str, body: Value) -> Result<Vec<Candle>, MarketDataError> {
    let Value::Array(rows) = body else {
        return Err(MarketDataError::MalformedPayload {
            symbol: symbol.to_string(),
            reason: "expected a JSON array of klines".to_string(),
        });
    };

    let total = rows.len();
    let candles: Vec<Candle> = rows.iter().filter_map(parse_kline_row).collect();

    if candles.len() < total {
        warn!(
            "BinanceMarketDataService: Skipped {} malformed kline rows for {}",
            total - candles.len(),
            symbol
        );
    }

    Ok(candles)
}

fn parse_kline_row(row: &Value) -> Option<Candle> {
    let arr = row.as_array()?;
    if arr.len() < 6 {
        return None;
    }

    Some(Candle::new(
        value_as_i64(&arr[0])?,
        value_as_f64(&arr[1])?,
        value_as_f64(&arr[2])?,
        value_as_f64(&arr[3])?,
        value_as_f64(&arr[4])?,
        value_as_f64(&arr[5])?,
    ))
}

#[async_trait]
impl MarketDataService for BinanceMarketDataService {
    async fn fetch_klines(
        &self,
        symbol: &str,
        interval: Interval,
        limit: usize,
    ) -> Result<Vec<Candle>, MarketDataError> {
        let url = format!("{}/api/v3/klines", self.base_url);
        let limit_str = limit.to_string();
        let url_with_query = build_url_with_query(
            &url,
            &[
                ("symbol", symbol),
                ("interval", interval.as_binance_str()),
                ("limit", limit_str.as_str()),
            ],
        );

        let response = self
            .client
            .get(&url_with_query)
            .send()
            .await
            .map_err(|e| MarketDataError::DataFetch {
                symbol: symbol.to_string(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(MarketDataError::DataFetch {
                symbol: symbol.to_string(),
                reason: format!("HTTP {}: {}", status, error_text),
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| MarketDataError::MalformedPayload {
                symbol: symbol.to_string(),
                reason: e.to_string(),
            })?;

        let candles = parse_kline_rows(symbol, body)?;
        info!(
            "BinanceMarketDataService: Fetched {} bars for {}@{}",
            candles.len(),
            symbol,
            interval
        );
        Ok(candles)
    }

    async fn stream_klines(
        &self,
        symbol: &str,
        interval: Interval,
        handler: &dyn TickHandler,
    ) -> Result<(), MarketDataError> {
        self.stream
            .connect_and_stream(symbol, interval, handler)
            .await
    }
}
