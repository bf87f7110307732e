//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the harvester, including:
//! - Building the HTTP client with a per-attempt timeout
//! - Rotating the User-Agent across attempts
//! - Retry logic with increasing delays for transient failures
//! - Error classification

use crate::config::{FetchConfig, DEFAULT_IDENTITIES};
use rand::seq::IndexedRandom;
use rand::Rng;
use reqwest::{header::USER_AGENT, Client, StatusCode};
use std::time::Duration;

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchResult {
    /// The server answered 200
    Success {
        /// Final URL after redirects
        final_url: String,
        /// Page body decoded as UTF-8
        body: String,
    },

    /// The server answered 404; never retried
    NotFound,

    /// Every attempt failed
    Exhausted {
        /// Number of attempts made
        attempts: u32,
        /// Description of the last failure
        last_error: String,
    },
}

/// Why a single attempt failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptFailure {
    /// Timeout, connection error or interrupted body
    Transport,

    /// Any status other than 200 and 404
    Status(u16),
}

/// Outcome of one attempt
enum Attempt {
    Body { final_url: String, body: String },
    NotFound,
    Failed(AttemptFailure, String),
}

/// Retry schedule for a fetch
///
/// | Condition | Delay before the next attempt |
/// |-----------|-------------------------------|
/// | Transport error after attempt `n` | `backoff_base * n` |
/// | Unexpected status after attempt `n` | `status_pause + backoff_base * (n - 1)` |
/// | Last attempt failed | none, give up |
///
/// Both schedules grow with every attempt.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff_base: Duration,
    status_pause: Duration,
    jitter_min_ms: u64,
    jitter_max_ms: u64,
}

impl RetryPolicy {
    pub fn from_config(config: &FetchConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            backoff_base: Duration::from_millis(config.backoff_base_ms),
            status_pause: Duration::from_millis(config.status_pause_ms),
            jitter_min_ms: config.jitter_min_ms,
            jitter_max_ms: config.jitter_max_ms,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before retrying after the 1-based `attempt` failed
    ///
    /// Returns `None` once no attempts remain.
    pub fn delay_after(&self, attempt: u32, failure: AttemptFailure) -> Option<Duration> {
        if attempt >= self.max_attempts {
            return None;
        }

        Some(match failure {
            AttemptFailure::Transport => self.backoff_base * attempt,
            AttemptFailure::Status(_) => self.status_pause + self.backoff_base * (attempt - 1),
        })
    }

    /// Random delay taken before every attempt
    pub fn jitter(&self) -> Duration {
        let millis = if self.jitter_max_ms > self.jitter_min_ms {
            rand::rng().random_range(self.jitter_min_ms..=self.jitter_max_ms)
        } else {
            self.jitter_min_ms
        };
        Duration::from_millis(millis)
    }
}

/// Builds an HTTP client for the given fetch settings
///
/// The client carries no default User-Agent; [`Fetcher`] sets one per attempt.
pub fn build_http_client(config: &FetchConfig) -> Result<Client, reqwest::Error> {
    let timeout = config.attempt_timeout();

    Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout)
        .danger_accept_invalid_certs(config.accept_invalid_certs)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Page fetcher with retries and identity rotation
pub struct Fetcher {
    client: Client,
    identities: Vec<String>,
    policy: RetryPolicy,
}

impl Fetcher {
    /// Creates a fetcher from the fetch configuration
    pub fn new(config: &FetchConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
            identities: config.identities.clone(),
            policy: RetryPolicy::from_config(config),
        })
    }

    /// Fetches a URL, retrying transient failures
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | HTTP 200 | Return body |
    /// | HTTP 404 | Immediate → NotFound |
    /// | Other status | Pause, retry |
    /// | Timeout / connection error | Back off, retry |
    /// | Attempts exhausted | Exhausted |
    pub async fn fetch(&self, url: &str) -> FetchResult {
        let mut last_error = String::new();
        let mut attempts = 0;

        for attempt in 1..=self.policy.max_attempts() {
            attempts = attempt;
            tokio::time::sleep(self.policy.jitter()).await;

            let failure = match self.attempt(url).await {
                Attempt::Body { final_url, body } => {
                    return FetchResult::Success { final_url, body };
                }
                Attempt::NotFound => {
                    tracing::debug!("{} returned 404", url);
                    return FetchResult::NotFound;
                }
                Attempt::Failed(failure, error) => {
                    last_error = error;
                    failure
                }
            };

            match self.policy.delay_after(attempt, failure) {
                Some(delay) => {
                    tracing::debug!(
                        "Attempt {}/{} for {} failed ({}), retrying in {:?}",
                        attempt,
                        self.policy.max_attempts(),
                        url,
                        last_error,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                None => break,
            }
        }

        tracing::warn!(
            "Giving up on {} after {} attempts: {}",
            url,
            attempts,
            last_error
        );
        FetchResult::Exhausted {
            attempts,
            last_error,
        }
    }

    async fn attempt(&self, url: &str) -> Attempt {
        let response = match self
            .client
            .get(url)
            .header(USER_AGENT, self.pick_identity())
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return Attempt::Failed(AttemptFailure::Transport, describe_error(&e)),
        };

        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Attempt::NotFound;
        }

        if status != StatusCode::OK {
            return Attempt::Failed(
                AttemptFailure::Status(status.as_u16()),
                format!("HTTP {}", status.as_u16()),
            );
        }

        let final_url = response.url().to_string();

        // Decode as UTF-8 whatever charset the server declares
        match response.bytes().await {
            Ok(bytes) => Attempt::Body {
                final_url,
                body: String::from_utf8_lossy(&bytes).into_owned(),
            },
            Err(e) => Attempt::Failed(AttemptFailure::Transport, describe_error(&e)),
        }
    }

    fn pick_identity(&self) -> &str {
        self.identities
            .choose(&mut rand::rng())
            .map(String::as_str)
            .unwrap_or(DEFAULT_IDENTITIES[0])
    }
}

fn describe_error(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        "Request timeout".to_string()
    } else if error.is_connect() {
        "Connection failed".to_string()
    } else {
        error.to_string()
    }
}
