//! HTTP transport: headers, cookies, jitter and retry.
//!
//! Every request goes through [`Transport::execute`], which waits out the
//! jitter before each attempt. Nothing outside this module can reach the
//! underlying `reqwest::Client`.

use crate::envelope::Envelope;
use crate::error::{ClientError, Result};
use crate::jitter::Jitter;
use registry_core::ClientConfig;
use reqwest::header::{HeaderMap, HeaderValue, COOKIE, ORIGIN, REFERER, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use zeroize::Zeroizing;

/// Backoff multiplier applied when the platform rate-limits us.
pub const RATE_LIMIT_BACKOFF_MULTIPLIER: u32 = 3;

/// Retry schedule for transient failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts after the first
    pub max_retries: u32,
    /// Linear backoff unit
    pub retry_delay: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32, rate_limited: bool) -> Duration {
        let multiplier = if rate_limited {
            RATE_LIMIT_BACKOFF_MULTIPLIER
        } else {
            1
        };
        self.retry_delay
            .saturating_mul(multiplier)
            .saturating_mul(attempt)
    }

    /// Longest wait a `Retry-After` header may impose: the largest backoff
    /// this policy would pick on its own.
    pub fn retry_after_ceiling(&self) -> Duration {
        self.backoff(self.max_retries.max(1), true)
    }

    /// Delay before retry number `attempt` after `error`.
    pub fn delay_for(&self, attempt: u32, error: &ClientError) -> Duration {
        match error {
            ClientError::RateLimited {
                retry_after: Some(after),
            } => (*after).min(self.retry_after_ceiling()),
            e => self.backoff(attempt, e.is_rate_limited()),
        }
    }
}

/// Authenticated HTTP access to the platform.
pub struct Transport {
    client: Client,
    base_url: String,
    jitter: Jitter,
    retry: RetryPolicy,
}

impl Transport {
    /// Build a transport sending `credential` as the `Cookie` header.
    pub fn new(config: &ClientConfig, credential: Option<&Zeroizing<String>>) -> Result<Self> {
        let base_url = config.base_url.trim_end_matches('/').to_string();

        let mut headers = HeaderMap::new();
        let origin = HeaderValue::from_str(&base_url)
            .map_err(|e| ClientError::Config(format!("base URL is not a header value: {e}")))?;
        let referer = HeaderValue::from_str(&format!("{base_url}/"))
            .map_err(|e| ClientError::Config(format!("base URL is not a header value: {e}")))?;
        headers.insert(ORIGIN, origin);
        headers.insert(REFERER, referer);
        if let Some(cookie) = credential.filter(|c| !c.trim().is_empty()) {
            let mut value = HeaderValue::from_str(cookie.as_str())
                .map_err(|_| ClientError::Config("cookie string is not a header value".to_string()))?;
            value.set_sensitive(true);
            headers.insert(COOKIE, value);
        }

        let mut builder = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .default_headers(headers);
        if let Some(proxy) = config.proxy.as_deref().filter(|p| !p.trim().is_empty()) {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| ClientError::Config(format!("invalid proxy URL: {e}")))?;
            builder = builder.proxy(proxy);
        }
        let client = builder
            .build()
            .map_err(|e| ClientError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            jitter: Jitter::new(config.jitter_min_ms, config.jitter_max_ms),
            retry: RetryPolicy {
                max_retries: config.max_retries,
                retry_delay: Duration::from_millis(config.retry_delay_ms),
            },
        })
    }

    /// Platform origin without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Pre-request delay shared by every path to the platform.
    pub fn jitter(&self) -> Jitter {
        self.jitter
    }

    /// Absolute URL for `path`.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// GET a JSON endpoint and unwrap its envelope.
    pub async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let url = self.url(path);
        let body = self
            .execute(&url, |client| client.get(&url).query(query))
            .await?;
        Envelope::parse(&body.text)?.into_data(path)
    }

    /// GET a page and return its body and final URL.
    pub async fn get_page(&self, path: &str) -> Result<PageBody> {
        let url = self.url(path);
        self.execute(&url, |client| client.get(&url)).await
    }

    /// Send with jitter before every attempt and retry transient failures.
    async fn execute<F>(&self, url: &str, build: F) -> Result<PageBody>
    where
        F: Fn(&Client) -> reqwest::RequestBuilder,
    {
        let mut attempt = 0;
        loop {
            self.jitter.wait().await;

            let error = match self.send_once(build(&self.client)).await {
                Ok(body) => return Ok(body),
                Err(e) => e,
            };

            if !error.is_retryable() || attempt >= self.retry.max_retries {
                if error.is_retryable() {
                    tracing::error!(
                        url,
                        attempts = attempt + 1,
                        "Request failed after retries: {}",
                        error
                    );
                }
                return Err(error);
            }

            attempt += 1;
            let delay = self.retry.delay_for(attempt, &error);
            tracing::warn!(
                url,
                "Request failed (attempt {}/{}), retrying in {:?}: {}",
                attempt,
                self.retry.max_retries + 1,
                delay,
                error
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn send_once(&self, request: reqwest::RequestBuilder) -> Result<PageBody> {
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(ClientError::RateLimited { retry_after });
        }
        if !status.is_success() {
            return Err(ClientError::Network {
                status: Some(status.as_u16()),
                message: format!("unexpected status {status}"),
            });
        }

        let final_url = response.url().to_string();
        let text = response.text().await?;
        Ok(PageBody { final_url, text })
    }
}

/// Response body with the URL it was served from after redirects.
#[derive(Debug, Clone)]
pub struct PageBody {
    /// URL after redirects
    pub final_url: String,
    /// Body text
    pub text: String,
}
