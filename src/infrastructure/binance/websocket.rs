use super::common::{kline_stream_name, value_as_f64, value_as_i64};
use crate::domain::errors::MarketDataError;
use crate::domain::market::{Candle, Interval, KlineTick};
use crate::domain::ports::TickHandler;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior, interval_at, sleep_until};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

/// Client ping period, matching Binance's own 3 minute ping cadence.
const KEEPALIVE_PERIOD: Duration = Duration::from_secs(180);
/// A connection that delivers nothing (not even a pong) for this long is
/// treated as dead.
const IDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// One Binance kline WebSocket connection per call, on the raw `/ws` endpoint.
pub struct BinanceKlineStream {
    ws_url: String,
    keepalive: Duration,
    idle_timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct KlineEvent {
    #[serde(rename = "k")]
    kline: KlinePayload,
}

#[derive(Debug, Deserialize)]
struct KlinePayload {
    #[serde(rename = "t")]
    open_time: Value,
    #[serde(rename = "o")]
    open: Value,
    #[serde(rename = "h")]
    high: Value,
    #[serde(rename = "l")]
    low: Value,
    #[serde(rename = "c")]
    close: Value,
    #[serde(rename = "v")]
    volume: Value,
    #[serde(rename = "x")]
    is_closed: bool,
}

/// Decodes one stream message into a tick.
pub fn parse_kline_message(text: &str) -> Result<KlineTick, MarketDataError> {
    let event: KlineEvent = serde_json::from_str(text).map_err(|e| MarketDataError::Parse {
        reason: e.to_string(),
    })?;
    let k = event.kline;

    let field = |name: &str, value: Option<f64>| {
        value.ok_or_else(|| MarketDataError::Parse {
            reason: format!("invalid kline field '{}'", name),
        })
    };

    let open_time = value_as_i64(&k.open_time).ok_or_else(|| MarketDataError::Parse {
        reason: "invalid kline field 't'".to_string(),
    })?;

    Ok(KlineTick {
        candle: Candle::new(
            open_time,
            field("o", value_as_f64(&k.open))?,
            field("h", value_as_f64(&k.high))?,
            field("l", value_as_f64(&k.low))?,
            field("c", value_as_f64(&k.close))?,
            field("v", value_as_f64(&k.volume))?,
        ),
        is_closed: k.is_closed,
    })
}

impl BinanceKlineStream {
    pub fn new(ws_url: String) -> Self {
        Self {
            ws_url,
            keepalive: KEEPALIVE_PERIOD,
            idle_timeout: IDLE_TIMEOUT,
        }
    }

    pub fn with_timeouts(mut self, keepalive: Duration, idle_timeout: Duration) -> Self {
        self.keepalive = keepalive;
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn stream_url(&self, symbol: &str, interval: Interval) -> String {
        format!(
            "{}/ws/{}",
            self.ws_url.trim_end_matches('/'),
            kline_stream_name(symbol, interval.as_binance_str())
        )
    }

    /// Streams ticks into `handler` until the server closes the connection
    /// (`Ok`), the transport fails or the connection goes idle (`Err`).
    /// Unparseable messages are skipped.
    pub async fn connect_and_stream(
        &self,
        symbol: &str,
        interval: Interval,
        handler: &dyn TickHandler,
    ) -> Result<(), MarketDataError> {
        let url = self.stream_url(symbol, interval);
        let stream_err = |reason: String| MarketDataError::Stream {
            stream: kline_stream_name(symbol, interval.as_binance_str()),
            reason,
        };

        info!("Connecting to Binance WebSocket: {}", url);
        let (ws_stream, _) = connect_async(url.as_str())
            .await
            .map_err(|e| stream_err(format!("connect failed: {}", e)))?;
        info!("Binance WebSocket connected successfully");

        let (mut write, mut read) = ws_stream.split();
        let mut keepalive = interval_at(Instant::now() + self.keepalive, self.keepalive);
        keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_activity = Instant::now();

        loop {
            let msg_result = tokio::select! {
                _ = keepalive.tick() => {
                    if let Err(e) = write.send(Message::Ping(vec![].into())).await {
                        return Err(stream_err(format!("ping failed: {}", e)));
                    }
                    continue;
                }
                _ = sleep_until(last_activity + self.idle_timeout) => {
                    return Err(stream_err(format!(
                        "no data received for {:?}",
                        self.idle_timeout
                    )));
                }
                next = read.next() => match next {
                    Some(msg_result) => msg_result,
                    None => break,
                },
            };
            last_activity = Instant::now();

            match msg_result {
                Ok(Message::Text(text)) => match parse_kline_message(&text) {
                    Ok(tick) => handler.on_tick(tick),
                    Err(e) => warn!("Failed to handle Binance kline message: {}", e),
                },
                Ok(Message::Ping(payload)) => {
                    debug!("Received ping from Binance");
                    if let Err(e) = write.send(Message::Pong(payload)).await {
                        return Err(stream_err(format!("pong failed: {}", e)));
                    }
                }
                Ok(Message::Pong(_)) => {
                    debug!("Received pong from Binance");
                }
                Ok(Message::Close(frame)) => {
                    if let Some(cf) = frame {
                        info!(
                            "Binance WebSocket closed by server: Code {} Reason '{}'",
                            cf.code, cf.reason
                        );
                    } else {
                        info!("Binance WebSocket closed by server (No info)");
                    }
                    return Ok(());
                }
                Err(e) => return Err(stream_err(format!("read error: {}", e))),
                _ => {}
            }
        }

        Ok(())
    }
}
