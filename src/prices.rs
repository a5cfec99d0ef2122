//! Reference USD prices keyed by `"<network>:<address>"`.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::Result;

#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Prices for the requested keys. Unknown keys are simply absent.
    async fn prices(&self, keys: &[String]) -> Result<HashMap<String, f64>>;
}

#[cfg(feature = "full")]
pub use llama::DefiLlamaPrices;

#[cfg(feature = "full")]
mod llama {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use serde::Deserialize;

    use super::PriceSource;
    use crate::error::{Error, Result};

    const PRICES_URL: &str = "https://coins.llama.fi/prices/current";

    // ── API response types ───────────────────────────────────────────

    #[derive(Debug, Deserialize)]
    struct PricesResponse {
        coins: HashMap<String, CoinPrice>,
    }

    #[derive(Debug, Deserialize)]
    #[allow(dead_code)]
    struct CoinPrice {
        price: f64,
        symbol: Option<String>,
        decimals: Option<u8>,
        timestamp: Option<u64>,
    }

    // ── Client ───────────────────────────────────────────────────────

    /// DefiLlama coins API.
    pub struct DefiLlamaPrices {
        client: reqwest::Client,
        base_url: String,
    }

    impl Default for DefiLlamaPrices {
        fn default() -> Self {
            Self::new(reqwest::Client::new())
        }
    }

    impl DefiLlamaPrices {
        pub fn new(client: reqwest::Client) -> Self {
            DefiLlamaPrices {
                client,
                base_url: PRICES_URL.to_string(),
            }
        }

        pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
            self.base_url = url.into();
            self
        }
    }

    #[async_trait]
    impl PriceSource for DefiLlamaPrices {
        async fn prices(&self, keys: &[String]) -> Result<HashMap<String, f64>> {
            if keys.is_empty() {
                return Ok(HashMap::new());
            }
            let url = format!("{}/{}", self.base_url, keys.join(","));

            let resp = retry(3, || {
                let client = self.client.clone();
                let url = url.clone();
                async move {
                    client
                        .get(&url)
                        .send()
                        .await?
                        .error_for_status()?
                        .json::<PricesResponse>()
                        .await
                }
            })
            .await
            .map_err(|e| Error::PriceApi(format!("fetching {} prices: {e}", keys.len())))?;

            Ok(resp
                .coins
                .into_iter()
                .map(|(key, coin)| (key, coin.price))
                .collect())
        }
    }

    /// Retry with exponential backoff (1s, 2s, 4s, ...).
    async fn retry<T, F, Fut>(max_retries: u32, f: F) -> reqwest::Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = reqwest::Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match f().await {
                Ok(val) => return Ok(val),
                Err(e) if attempt < max_retries => {
                    tracing::debug!(attempt, error = %e, "price request failed, retrying");
                    let delay = std::time::Duration::from_millis(1000 * 2u64.pow(attempt));
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
