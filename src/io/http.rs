use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::warn;

use super::RandomAccess;

/// HTTP Range source for remote archives.
///
/// Lets the resolver serve entries out of a remote fat package without ever
/// downloading it whole: the EOCD scan, central directory walk and entry
/// reads all turn into bounded Range requests.
pub struct HttpRangeSource {
    client: Client,
    url: String,
    size: u64,
    transferred_bytes: AtomicU64,
    max_retry: u32,
}

impl HttpRangeSource {
    /// Create a new HTTP Range source.
    ///
    /// Sends a HEAD request to verify Range support and learn the size.
    pub async fn connect(url: String) -> io::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(io::Error::other)?;

        let resp = client.head(&url).send().await.map_err(io::Error::other)?;

        if !resp.status().is_success() {
            return Err(io::Error::other(format!(
                "HTTP request failed with status: {}",
                resp.status()
            )));
        }

        let accept_ranges = resp
            .headers()
            .get("accept-ranges")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("none");
        if !accept_ranges.contains("bytes") {
            return Err(io::Error::other(
                "remote server does not support Range requests",
            ));
        }

        let size = resp
            .headers()
            .get("content-length")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| io::Error::other("remote server did not return Content-Length"))?;

        Ok(Self {
            client,
            url,
            size,
            transferred_bytes: AtomicU64::new(0),
            max_retry: 10,
        })
    }

    /// Total bytes transferred from the network so far.
    pub fn transferred_bytes(&self) -> u64 {
        self.transferred_bytes.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl RandomAccess for HttpRangeSource {
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() || offset >= self.size {
            return Ok(0);
        }

        let end = (offset + buf.len() as u64 - 1).min(self.size - 1);
        let expected_size = (end - offset + 1) as usize;

        let mut received = 0;
        let mut retry_count = 0;

        while received < expected_size {
            let current_start = offset + received as u64;
            let range = format!("bytes={}-{}", current_start, end);

            let result = self
                .client
                .get(&self.url)
                .header("Range", &range)
                .send()
                .await;

            match result {
                Ok(resp) => {
                    if resp.status() != reqwest::StatusCode::PARTIAL_CONTENT {
                        return Err(io::Error::other(format!(
                            "HTTP range request failed with status: {}",
                            resp.status()
                        )));
                    }

                    let bytes = resp.bytes().await.map_err(io::Error::other)?;
                    let chunk_len = bytes.len().min(expected_size - received);
                    buf[received..received + chunk_len].copy_from_slice(&bytes[..chunk_len]);
                    received += chunk_len;

                    self.transferred_bytes
                        .fetch_add(chunk_len as u64, Ordering::Relaxed);
                }
                Err(e) if e.is_timeout() || e.is_connect() => {
                    retry_count += 1;
                    if retry_count >= self.max_retry {
                        return Err(io::Error::other("max retries exceeded"));
                    }
                    warn!(retry = retry_count, max = self.max_retry, error = %e, "connection error, retrying");
                    tokio::time::sleep(Duration::from_millis(500 * u64::from(retry_count))).await;
                }
                Err(e) => return Err(io::Error::other(e)),
            }
        }

        Ok(received)
    }

    fn size(&self) -> u64 {
        self.size
    }
}
