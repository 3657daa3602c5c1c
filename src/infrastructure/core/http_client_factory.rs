use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use std::time::Duration;

pub struct HttpClientFactory;

impl HttpClientFactory {
    /// HTTP client that retries transient failures (exponential backoff, 3 retries).
    pub fn create_client() -> ClientWithMiddleware {
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(3);

        let client = Client::builder()
            .pool_max_idle_per_host(2)
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new());

        ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build()
    }
}

/// Appends `params` as a percent-encoded query string.
pub fn build_url_with_query<K, V>(base_url: &str, params: &[(K, V)]) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    if params.is_empty() {
        return base_url.to_string();
    }

    let mut url = match url::Url::parse(base_url) {
        Ok(url) => url,
        Err(_) => return base_url.to_string(),
    };
    url.query_pairs_mut()
        .extend_pairs(params.iter().map(|(k, v)| (k.as_ref(), v.as_ref())));
    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_url_with_query() {
        let url = build_url_with_query(
            "https://api.binance.com/api/v3/klines",
            &[("symbol", "BTCUSDT"), ("interval", "15m"), ("limit", "500")],
        );
        assert_eq!(
            url,
            "https://api.binance.com/api/v3/klines?symbol=BTCUSDT&interval=15m&limit=500"
        );
    }

    #[test]
    fn test_build_url_encodes_values() {
        let url = build_url_with_query("https://example.com/path", &[("q", "a b&c")]);
        assert_eq!(url, "https://example.com/path?q=a+b%26c");
    }

    #[test]
    fn test_build_url_without_params() {
        let empty: [(&str, &str); 0] = [];
        assert_eq!(
            build_url_with_query("https://example.com", &empty),
            "https://example.com"
        );
    }
}
