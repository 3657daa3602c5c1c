use thiserror::Error;

/// Errors related to market data retrieval and the live stream
#[derive(Debug, Error)]
pub enum MarketDataError {
    #[error("Kline fetch failed for {symbol}: {reason}")]
    DataFetch { symbol: String, reason: String },

    #[error("Malformed kline payload for {symbol}: {reason}")]
    MalformedPayload { symbol: String, reason: String },

    #[error("Stream error on {stream}: {reason}")]
    Stream { stream: String, reason: String },

    #[error("Unparseable tick: {reason}")]
    Parse { reason: String },
}

/// Errors related to the durable key-value store
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Storage I/O failed for key '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Stored value for key '{key}' is corrupt: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("Failed to serialize value for key '{key}': {reason}")]
    Serialize { key: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_market_data_error_formatting() {
        let error = MarketDataError::DataFetch {
            symbol: "BTCUSDT".to_string(),
            reason: "HTTP 503".to_string(),
        };

        let msg = error.to_string();
        assert!(msg.contains("BTCUSDT"));
        assert!(msg.contains("HTTP 503"));
    }

    #[test]
    fn test_persistence_error_formatting() {
        let error = PersistenceError::Corrupt {
            key: "signalHistory".to_string(),
            reason: "expected value at line 1".to_string(),
        };

        let msg = error.to_string();
        assert!(msg.contains("signalHistory"));
        assert!(msg.contains("corrupt"));
    }
}
