//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with the configured user agent and timeouts
//! - GET requests returning either a streaming response or the body text
//! - Bounded retries with linearly increasing backoff
//!
//! Every failure (transport error or non-200 status) is retried; once the
//! attempts are exhausted the call fails with `RetriesExhausted` and the
//! caller decides how far that failure reaches.

use crate::config::{HttpConfig, UserAgentConfig};
use crate::CrawlError;
use reqwest::{Client, Response, StatusCode};
use std::future::Future;
use std::time::Duration;

/// Query parameters attached to a GET request
pub type QueryParams<'a> = &'a [(&'a str, String)];

/// Retry schedule for a single request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,

    /// Delay after the first failed attempt
    pub base_delay: Duration,

    /// Added to the delay for each further failed attempt
    pub step: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &HttpConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
            step: Duration::from_millis(config.retry_step_ms),
        }
    }

    /// Delay to wait after the failed attempt with the given zero-based index
    ///
    /// ```
    /// use board_pdf_crawler::crawler::RetryPolicy;
    /// use std::time::Duration;
    ///
    /// let policy = RetryPolicy {
    ///     max_attempts: 3,
    ///     base_delay: Duration::from_secs(1),
    ///     step: Duration::from_secs(1),
    /// };
    /// assert_eq!(policy.delay_for(0), Duration::from_secs(1));
    /// assert_eq!(policy.delay_for(2), Duration::from_secs(3));
    /// ```
    pub fn delay_for(&self, attempt_index: u32) -> Duration {
        self.base_delay + self.step * attempt_index
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&HttpConfig::default())
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `user_agent` - The user agent configuration
/// * `http` - Timeouts for the client
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    http: &HttpConfig,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(Duration::from_secs(http.timeout_secs))
        .connect_timeout(Duration::from_secs(http.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
}

/// GET-only client with bounded retries
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    policy: RetryPolicy,
}

impl HttpFetcher {
    pub fn new(client: Client, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    /// Builds a fetcher from the crawler configuration
    pub fn from_config(user_agent: &UserAgentConfig, http: &HttpConfig) -> Result<Self, CrawlError> {
        let client = build_http_client(user_agent, http)?;
        Ok(Self::new(client, RetryPolicy::from_config(http)))
    }

    /// Sends a GET request and returns the response with its body unread
    ///
    /// The body can then be consumed chunk by chunk, so large files never have
    /// to sit in memory. Only a 200 response counts as success.
    pub async fn get(&self, url: &str, params: QueryParams<'_>) -> Result<Response, CrawlError> {
        self.with_retry(url, move || self.send_once(url, params))
            .await
    }

    /// Sends a GET request and reads the whole body as text
    ///
    /// A failure while reading the body is retried like a failed request.
    pub async fn get_text(&self, url: &str, params: QueryParams<'_>) -> Result<String, CrawlError> {
        self.with_retry(url, move || async move {
            let response = self.send_once(url, params).await?;
            response.text().await.map_err(|source| CrawlError::Http {
                url: url.to_string(),
                source,
            })
        })
        .await
    }

    /// Issues exactly one request; any non-200 status is an error
    async fn send_once(&self, url: &str, params: QueryParams<'_>) -> Result<Response, CrawlError> {
        let mut request = self.client.get(url);
        if !params.is_empty() {
            request = request.query(params);
        }

        let response = request.send().await.map_err(|source| CrawlError::Http {
            url: url.to_string(),
            source,
        })?;

        if response.status() != StatusCode::OK {
            return Err(CrawlError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        Ok(response)
    }

    /// Runs `op` until it succeeds or the policy's attempts are used up
    async fn with_retry<T, F, Fut>(&self, url: &str, mut op: F) -> Result<T, CrawlError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CrawlError>>,
    {
        let attempts = self.policy.max_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 0..attempts {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    tracing::debug!(
                        url = %url,
                        attempt = attempt + 1,
                        max_attempts = attempts,
                        "Request failed: {}",
                        e
                    );
                    last_error = e.to_string();
                }
            }

            if attempt + 1 < attempts {
                tokio::time::sleep(self.policy.delay_for(attempt)).await;
            }
        }

        Err(CrawlError::RetriesExhausted {
            url: url.to_string(),
            attempts,
            last_error,
        })
    }
}
