//! Value decoding shared by the Binance REST and stream adapters.
//!
//! Binance encodes prices and volumes as JSON strings and times as numbers,
//! but both forms are accepted everywhere.

use serde_json::Value;

pub fn value_as_f64(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

pub fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::String(s) => s.trim().parse::<i64>().ok(),
        Value::Number(n) => n.as_i64(),
        _ => None,
    }
}

/// Stream name for a symbol's kline channel, e.g. `btcusdt@kline_15m`.
pub fn kline_stream_name(symbol: &str, interval: &str) -> String {
    format!("{}@kline_{}", symbol.to_lowercase(), interval)
}
