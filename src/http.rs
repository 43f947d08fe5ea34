//! HTTP transport for the advertising platform API.
//!
//! This module provides:
//! - Authenticated GET/POST helpers (`Access-Token` header)
//! - Retry with exponential backoff and jitter, for read requests only
//! - The platform's `{code, message, data}` response envelope

use crate::config::Config;
use crate::error::{CampaignError, Result};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Header carrying the access token.
pub const ACCESS_TOKEN_HEADER: &str = "Access-Token";

/// HTTP client wrapper for platform API calls.
#[derive(Debug, Clone)]
pub struct AdsHttpClient {
    client: Client,
    config: Config,
}

impl AdsHttpClient {
    /// Creates a client with the given configuration.
    pub fn with_config(config: Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .user_agent(&config.http.user_agent)
            .build()?;

        Ok(Self { client, config })
    }

    fn url(&self, endpoint: &str) -> String {
        format!(
            "{}{}",
            self.config.http.base_url.trim_end_matches('/'),
            endpoint
        )
    }

    /// GET with query parameters. Retried while the failure is retryable:
    /// network errors, 429, 5xx and the platform's throttling codes.
    pub async fn get_json(&self, endpoint: &str, query: &[(String, String)]) -> Result<Value> {
        let url = self.url(endpoint);
        let url = url.as_str();
        self.execute_with_retry(|| async move {
            let response = self
                .client
                .get(url)
                .header(ACCESS_TOKEN_HEADER, &self.config.account.access_token)
                .query(query)
                .send()
                .await?;
            let response = Self::check_status(response).await?;
            let body = Self::read_body(response).await?;
            Self::check_throttled(&body)?;
            Ok(body)
        })
        .await
    }

    /// POST with a JSON body. Sent exactly once: creation calls are not idempotent.
    pub async fn post_json<T: Serialize + ?Sized>(&self, endpoint: &str, body: &T) -> Result<Value> {
        let response = self
            .client
            .post(self.url(endpoint))
            .header(ACCESS_TOKEN_HEADER, &self.config.account.access_token)
            .json(body)
            .send()
            .await
            .map_err(|e| CampaignError::transport(e.to_string()))?;

        let response = Self::check_status(response).await?;
        Self::read_body(response).await
    }

    async fn check_status(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(CampaignError::Http {
            status: status.as_u16(),
            message: text,
        })
    }

    /// Surfaces a throttling envelope as an error so the retry loop sees it.
    /// Any other envelope is left for the caller to interpret.
    fn check_throttled(body: &Value) -> Result<()> {
        let Some(code) = body.get("code").and_then(Value::as_i64) else {
            return Ok(());
        };
        if code == 0 {
            return Ok(());
        }
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let error = CampaignError::from_api_response(code, message);
        if error.is_retryable() {
            return Err(error);
        }
        Ok(())
    }

    async fn read_body(response: Response) -> Result<Value> {
        let bytes = response
            .bytes()
            .await
            .map_err(|e| CampaignError::transport(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| {
            CampaignError::from_api_response(-1, format!("Malformed response body: {e}"))
        })
    }

    /// Runs a read operation until it succeeds, fails with a non-retryable
    /// error, or runs out of attempts.
    async fn execute_with_retry<F, Fut, T>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let max_attempts = self.config.retry.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(error) if error.is_retryable() && attempt < max_attempts => {
                    let delay = self.backoff_delay(attempt);
                    warn!(
                        "Request failed (attempt {}/{}), retrying in {:?}: {}",
                        attempt, max_attempts, delay, error
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }

    fn backoff_delay(&self, attempt: u32) -> Duration {
        let base = self.config.retry_base_delay();
        let jitter = if self.config.retry.enable_jitter {
            Duration::from_millis(fastrand::u64(0..=base.as_millis() as u64 / 4))
        } else {
            Duration::ZERO
        };
        let exponent = (attempt.saturating_sub(1) as f64).min(4.0);
        let scaled = Duration::from_millis(
            ((base + jitter).as_millis() as f64 * self.config.retry.backoff_factor.powf(exponent))
                as u64,
        );
        std::cmp::min(scaled, self.config.retry_max_delay())
    }
}

/// Standard platform response envelope.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiEnvelope {
    /// 0 for success
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

impl ApiEnvelope {
    /// Reads an envelope from a raw body. A body that is not an envelope counts
    /// as a rejection.
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| {
            CampaignError::from_api_response(-1, format!("Unexpected response shape: {e}"))
        })
    }

    /// Converts the envelope to its data, checking for API errors.
    pub fn into_data(self) -> Result<Value> {
        if self.code != 0 {
            debug!(
                "Platform rejected request {:?}: [{}] {}",
                self.request_id, self.code, self.message
            );
            return Err(CampaignError::from_api_response(self.code, self.message));
        }
        Ok(self.data.unwrap_or(Value::Null))
    }
}
