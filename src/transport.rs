use async_trait::async_trait;
use rand::Rng;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tokio::time::sleep;

#[cfg(test)]
use mockall::automock;

use crate::config::Config;
use crate::error::{AssistError, Result};
use crate::models::{GroqRequest, GroqResponse};

/// Cap on a single backoff pause
const MAX_BACKOFF: Duration = Duration::from_secs(5);

#[cfg_attr(test, automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn chat(&self, req: &GroqRequest) -> Result<GroqResponse>;
}

pub struct GroqTransport {
    client: Client,
    api_key: String,
    api_url: String,
    max_retries: u8,
    initial_backoff: Duration,
}

impl GroqTransport {
    pub fn new(cfg: &Config) -> Result<Self> {
        if !cfg.has_credentials() {
            return Err(AssistError::ConfigurationMissing);
        }

        let client = Client::builder()
            .timeout(cfg.request_timeout())
            .build()
            .map_err(|e| AssistError::Transport(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: cfg.groq.api_key.clone(),
            api_url: cfg.groq.api_url.clone(),
            max_retries: cfg.gateway.max_retries,
            initial_backoff: Duration::from_millis(cfg.gateway.initial_backoff_ms),
        })
    }

    /// Rate limits and server errors may clear up; other statuses will not.
    fn is_retryable(status: StatusCode) -> bool {
        status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let base = self.initial_backoff.as_millis() as f64 * 2f64.powi(attempt.saturating_sub(1) as i32);
        let jitter = rand::thread_rng().gen_range(0.8..=1.2);
        Duration::from_millis((base * jitter) as u64).min(MAX_BACKOFF)
    }
}

#[async_trait]
impl Transport for GroqTransport {
    async fn chat(&self, req: &GroqRequest) -> Result<GroqResponse> {
        let max_attempts = u32::from(self.max_retries) + 1;
        let mut attempts = 0;

        loop {
            attempts += 1;

            let (failure, retryable) = match self
                .client
                .post(&self.api_url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .json(req)
                .send()
                .await
            {
                Ok(response) if response.status().is_success() => {
                    return response.json().await.map_err(|e| {
                        AssistError::MalformedResponse(format!(
                            "Failed to parse Groq API response: {e}"
                        ))
                    });
                }
                Ok(response) => {
                    let status = response.status();
                    let body = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Unknown error".to_string());
                    (
                        format!("Groq API returned {status}: {body}"),
                        Self::is_retryable(status),
                    )
                }
                Err(e) if e.is_timeout() => (format!("Groq API request timed out: {e}"), true),
                Err(e) => (format!("Failed to send request to Groq API: {e}"), true),
            };

            if !retryable || attempts >= max_attempts {
                return Err(AssistError::Transport(format!(
                    "{failure} (after {attempts} attempts)"
                )));
            }

            let delay = self.backoff(attempts);
            tracing::warn!(
                attempt = attempts,
                delay_ms = delay.as_millis() as u64,
                "{failure}; retrying"
            );
            sleep(delay).await;
        }
    }
}
