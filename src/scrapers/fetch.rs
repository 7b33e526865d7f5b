//! Page fetching with exponential backoff retry logic.
//!
//! # Architecture
//!
//! - [`PageFetch`]: core trait, fetch a URL and return its body as text
//! - [`HttpFetcher`]: `reqwest`-backed implementation
//! - [`RetryFetch`]: decorator adding retries to any `PageFetch`
//!
//! # Retry Strategy
//!
//! Only transient failures are retried (transport errors, 429 and 5xx).
//! The delay doubles from `base_delay` up to `max_delay`, with 0-250ms of
//! random jitter on top so concurrent sources don't retry in lockstep.

use crate::error::ScrapeError;
use async_trait::async_trait;
use rand::{rng, Rng};
use reqwest::Client;
use std::fmt;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{error, instrument, warn};

#[async_trait]
pub trait PageFetch: Send + Sync + fmt::Debug {
    /// Fetch `url` and return the response body.
    async fn fetch(&self, url: &str) -> Result<String, ScrapeError>;
}

/// Plain HTTP fetcher with a request timeout and a fixed user agent.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetch for HttpFetcher {
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, url: &str) -> Result<String, ScrapeError> {
        let http = |source| ScrapeError::Http {
            url: url.to_string(),
            source,
        };
        let response = self.client.get(url).send().await.map_err(http)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        response.text().await.map_err(http)
    }
}

/// Wrapper that adds exponential backoff retries to a [`PageFetch`].
///
/// The delay before retry `n` (1-based) is:
/// ```text
/// delay = min(base_delay * 2^(n-1), max_delay) + random_jitter(0..=250ms)
/// ```
pub struct RetryFetch<T> {
    inner: T,
    max_retries: usize,
    base_delay: Duration,
    max_delay: Duration,
}

impl<T: PageFetch> RetryFetch<T> {
    pub fn new(inner: T, max_retries: usize, base_delay: Duration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: Duration::from_secs(10),
        }
    }

    fn backoff(&self, attempt: usize) -> Duration {
        let exp = u32::try_from(attempt.saturating_sub(1)).unwrap_or(u32::MAX).min(16);
        let delay = self.base_delay.saturating_mul(1 << exp).min(self.max_delay);
        let jitter_ms: u64 = rng().random_range(0..=250);
        delay + Duration::from_millis(jitter_ms)
    }
}

impl<T> fmt::Debug for RetryFetch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryFetch")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

#[async_trait]
impl<T: PageFetch> PageFetch for RetryFetch<T> {
    #[instrument(level = "info", skip(self))]
    async fn fetch(&self, url: &str) -> Result<String, ScrapeError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            match self.inner.fetch(url).await {
                Ok(body) => return Ok(body),
                Err(e) => {
                    attempt += 1;
                    let elapsed_ms_total = total_t0.elapsed().as_millis();

                    if !e.is_transient() || attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_total,
                            error = %e,
                            "fetch gave up"
                        );
                        return Err(e);
                    }

                    let delay = self.backoff(attempt);
                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_total,
                        ?delay,
                        error = %e,
                        "fetch attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fails with `status` for the first `failures` calls, then succeeds.
    #[derive(Debug)]
    struct Flaky {
        failures: usize,
        status: u16,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PageFetch for Flaky {
        async fn fetch(&self, url: &str) -> Result<String, ScrapeError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(ScrapeError::Status {
                    url: url.to_string(),
                    status: self.status,
                })
            } else {
                Ok("<html></html>".to_string())
            }
        }
    }

    fn flaky(failures: usize, status: u16) -> Flaky {
        Flaky {
            failures,
            status,
            calls: AtomicUsize::new(0),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_transient_then_succeeds() {
        let fetcher = RetryFetch::new(flaky(2, 503), 3, Duration::from_millis(500));
        let body = fetcher.fetch("https://example.org").await.unwrap();
        assert_eq!(body, "<html></html>");
        assert_eq!(fetcher.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_retries() {
        let fetcher = RetryFetch::new(flaky(10, 502), 2, Duration::from_millis(500));
        let err = fetcher.fetch("https://example.org").await.unwrap_err();
        assert!(matches!(err, ScrapeError::Status { status: 502, .. }));
        assert_eq!(fetcher.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_does_not_retry_client_errors() {
        let fetcher = RetryFetch::new(flaky(10, 404), 3, Duration::from_millis(500));
        assert!(fetcher.fetch("https://example.org").await.is_err());
        assert_eq!(fetcher.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_backoff_is_capped() {
        let fetcher = RetryFetch::new(flaky(0, 500), 3, Duration::from_secs(1));
        let first = fetcher.backoff(1);
        assert!(first >= Duration::from_secs(1) && first <= Duration::from_millis(1250));
        let late = fetcher.backoff(40);
        assert!(late <= Duration::from_millis(10_250));
    }
}
