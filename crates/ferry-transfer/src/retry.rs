//! Backoff for REST calls against a destination.
//!
//! [`RestClient`](crate::http::RestClient) runs every call through
//! [`with_retry`]. Only answers that say "try again later" are repeated:
//! throttling (429), gateway trouble (502/503/504) and transport timeouts or
//! refused connections. A conflict or validation error is returned at once so
//! the importer can record the item as failed.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Status codes worth another attempt.
const RETRYABLE_STATUSES: [u16; 4] = [429, 502, 503, 504];

/// How often and how patiently a call is repeated.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Attempts after the first one.
    pub max_retries: u32,
    /// Wait before the first retry.
    pub initial_delay: Duration,
    /// Upper bound for any single wait.
    pub max_delay: Duration,
    /// Growth factor between consecutive waits.
    pub backoff_multiplier: f64,
    /// Adds up to a quarter of the wait at random.
    pub add_jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            add_jitter: true,
        }
    }
}

impl RetryConfig {
    /// Patient settings for hosted APIs that throttle bulk imports.
    #[must_use]
    pub fn for_rate_limits() -> Self {
        Self {
            max_retries: 5,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            ..Self::default()
        }
    }

    /// Single attempt.
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
            add_jitter: false,
        }
    }

    /// Wait before retry number `retry` (1-based).
    #[must_use]
    pub fn backoff(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }
        let exponent = i32::try_from(retry - 1).unwrap_or(i32::MAX);
        let wait = (self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent))
            .min(self.max_delay.as_secs_f64());
        let jitter = if self.add_jitter {
            wait * 0.25 * jitter_fraction()
        } else {
            0.0
        };
        Duration::from_secs_f64(wait + jitter)
    }
}

/// Uniform-ish value in `[0, 1)`.
fn jitter_fraction() -> f64 {
    (Uuid::new_v4().as_u128() % 1024) as f64 / 1024.0
}

/// Whether `error` may succeed when the same call is made again.
#[must_use]
pub fn is_retryable_error(error: &Error) -> bool {
    match error {
        Error::Http { status, .. } => RETRYABLE_STATUSES.contains(status),
        Error::Transport(e) => e.is_timeout() || e.is_connect(),
        Error::Io(_) => true,
        _ => false,
    }
}

/// Runs `call` until it succeeds, fails for good, or retries run out.
///
/// # Errors
///
/// Returns the first non-retryable error, or the last retryable one once
/// `config.max_retries` is exhausted.
pub async fn with_retry<F, Fut, T>(config: &RetryConfig, operation: &str, mut call: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut retry = 0;
    loop {
        match call().await {
            Ok(value) => {
                if retry > 0 {
                    debug!(operation, retries = retry, "Succeeded after retrying");
                }
                return Ok(value);
            }
            Err(e) if retry < config.max_retries && is_retryable_error(&e) => {
                retry += 1;
                let delay = config.backoff(retry);
                warn!(operation, retry, ?delay, "Retrying after: {}", e);
                sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::RestClient;
    use reqwest::Method;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn quick(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            initial_delay: Duration::from_millis(1),
            add_jitter: false,
            ..RetryConfig::default()
        }
    }

    fn rest(server: &MockServer, retry: RetryConfig) -> RestClient {
        RestClient::new(server.uri())
            .with_header("Content-Type", "application/json")
            .with_retry(retry)
    }

    #[test]
    fn test_only_transient_answers_are_retryable() {
        let http = |status| Error::Http {
            status,
            body: String::new(),
        };
        for status in [429, 502, 503, 504] {
            assert!(is_retryable_error(&http(status)), "{}", status);
        }
        for status in [400, 401, 404, 409, 500] {
            assert!(!is_retryable_error(&http(status)), "{}", status);
        }
        assert!(!is_retryable_error(&Error::invalid_credential(
            "u1",
            "password hash is empty"
        )));
        assert!(!is_retryable_error(&Error::Authentication(
            "HTTP 401".to_string()
        )));
    }

    #[test]
    fn test_backoff_grows_and_is_capped() {
        let config = RetryConfig {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
            add_jitter: false,
            ..RetryConfig::default()
        };
        let waits: Vec<_> = (0..=4).map(|retry| config.backoff(retry)).collect();
        assert_eq!(
            waits,
            vec![
                Duration::ZERO,
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4),
                Duration::from_secs(5),
            ]
        );
    }

    #[test]
    fn test_jitter_stays_within_a_quarter() {
        let config = RetryConfig {
            initial_delay: Duration::from_secs(4),
            ..RetryConfig::default()
        };
        for _ in 0..20 {
            let wait = config.backoff(1);
            assert!(wait >= Duration::from_secs(4));
            assert!(wait < Duration::from_secs(5));
        }
    }

    #[tokio::test]
    async fn test_create_call_retried_after_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/users/bcrypt"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/users/bcrypt"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"$id": "u1"})))
            .expect(1)
            .mount(&server)
            .await;

        let body = rest(&server, quick(2))
            .call(Method::POST, "/users/bcrypt", &[], &json!({"userId": "u1"}))
            .await
            .unwrap();

        assert_eq!(body["$id"], "u1");
    }

    #[tokio::test]
    async fn test_conflict_is_returned_without_retrying() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/users"))
            .respond_with(ResponseTemplate::new(409).set_body_string("user already exists"))
            .expect(1)
            .mount(&server)
            .await;

        let err = rest(&server, quick(5))
            .call(Method::POST, "/users", &[], &json!({"userId": "u1"}))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Http { status: 409, .. }));
    }

    #[tokio::test]
    async fn test_throttling_gives_up_after_max_retries() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/databases"))
            .respond_with(ResponseTemplate::new(429))
            .expect(3)
            .mount(&server)
            .await;

        let err = rest(&server, quick(2))
            .call(Method::POST, "/databases", &[], &json!({"databaseId": "public"}))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Http { status: 429, .. }));
    }
}
