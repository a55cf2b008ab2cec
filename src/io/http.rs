use bytes::Bytes;
use reqwest::Client;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::config::HttpConfig;
use anyhow::{Result, bail};

/// Downloads whole chunks from an HTTP(S) endpoint.
///
/// Chunks are small enough to hold in memory, so each one is fetched with
/// a single GET and handed to the decoder as a [`Bytes`] buffer.
pub struct HttpChunkFetcher {
    client: Client,
    transferred_bytes: AtomicU64,
    max_retry: u32,
}

impl HttpChunkFetcher {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            transferred_bytes: AtomicU64::new(0),
            max_retry: config.max_retry,
        })
    }

    /// Get total bytes transferred from network
    pub fn transferred_bytes(&self) -> u64 {
        self.transferred_bytes.load(Ordering::Relaxed)
    }

    /// Fetch the chunk at `url`, retrying connection errors and timeouts
    pub async fn fetch(&self, url: &str) -> Result<Bytes> {
        let mut retry_count = 0;

        loop {
            let result = self.client.get(url).send().await;

            match result {
                Ok(resp) => {
                    if !resp.status().is_success() {
                        bail!("HTTP request failed with status: {}", resp.status());
                    }

                    let body = resp.bytes().await?;
                    self.transferred_bytes
                        .fetch_add(body.len() as u64, Ordering::Relaxed);
                    tracing::debug!(url, bytes = body.len(), "fetched chunk");
                    return Ok(body);
                }
                Err(e) if e.is_timeout() || e.is_connect() => {
                    retry_count += 1;
                    if retry_count >= self.max_retry {
                        bail!("Max retries exceeded");
                    }
                    tracing::warn!(
                        url,
                        retry = retry_count,
                        max_retry = self.max_retry,
                        error = %e,
                        "connection error, retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(500 * retry_count as u64)).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}
