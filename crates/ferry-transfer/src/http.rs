//! REST call collaborator used by HTTP-backed adapters.

use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::Form;
use reqwest::{Client, Method};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::error::{Error, Result};
use crate::retry::{with_retry, RetryConfig};

/// Default HTTP timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Creates a configured HTTP client with timeout.
#[must_use]
pub fn create_http_client() -> Client {
    Client::builder()
        .timeout(DEFAULT_TIMEOUT)
        .connect_timeout(Duration::from_secs(10))
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Validates that `url` is an http(s) endpoint.
pub fn validate_endpoint(url: &str) -> Result<()> {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(Error::Config(format!(
            "Invalid URL scheme in '{}'. Allowed: http, https",
            url
        )));
    }
    if url.len() < 10 {
        return Err(Error::Config(format!("Invalid URL format: {}", url)));
    }
    Ok(())
}

/// Thin JSON-over-HTTP client bound to one endpoint.
///
/// Request encoding follows the merged `Content-Type`:
/// `application/json` sends a JSON body, `multipart/form-data` sends the
/// flattened params as text parts, anything else sends a query string for
/// `GET` and a url-encoded form otherwise.
#[derive(Debug, Clone)]
pub struct RestClient {
    client: Client,
    endpoint: String,
    headers: Vec<(String, String)>,
    retry: RetryConfig,
}

impl RestClient {
    /// Creates a client for `endpoint` with no default headers.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: create_http_client(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            headers: Vec::new(),
            retry: RetryConfig::for_rate_limits(),
        }
    }

    /// Adds a header sent with every call.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Replaces the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Endpoint relative paths are appended to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Performs a call and returns the decoded body.
    ///
    /// Paths starting with `http` are used as absolute URLs. JSON responses are
    /// decoded; anything else comes back as a string value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] for any status >= 400 and [`Error::Transport`]
    /// when the request could not be performed. Throttling and gateway
    /// failures are retried first.
    pub async fn call(
        &self,
        method: Method,
        path: &str,
        headers: &[(&str, &str)],
        params: &Value,
    ) -> Result<Value> {
        let name = format!("{} {}", method, path);
        with_retry(&self.retry, &name, move || {
            self.send(method.clone(), path, headers, params)
        })
        .await
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        headers: &[(&str, &str)],
        params: &Value,
    ) -> Result<Value> {
        let headers = self.merge_headers(headers);
        let content_type = headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(CONTENT_TYPE.as_str()))
            .map(|(_, value)| value.to_ascii_lowercase())
            .unwrap_or_default();
        let multipart = content_type.starts_with("multipart/form-data");

        let url = if path.starts_with("http") {
            path.to_string()
        } else {
            format!("{}{}", self.endpoint, path)
        };
        debug!(%method, %url, "REST call");

        let mut request = self.client.request(method.clone(), &url);
        for (name, value) in &headers {
            // reqwest writes the multipart boundary itself
            if multipart && name.eq_ignore_ascii_case(CONTENT_TYPE.as_str()) {
                continue;
            }
            request = request.header(name.as_str(), value.as_str());
        }

        if method == Method::GET {
            let query = flatten(params);
            if !query.is_empty() {
                request = request.query(&query);
            }
        } else if content_type.starts_with("application/json") {
            request = request.json(params);
        } else if multipart {
            let form = flatten(params)
                .into_iter()
                .fold(Form::new(), |form, (key, value)| form.text(key, value));
            request = request.multipart(form);
        } else {
            request = request.form(&flatten(params));
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/json"));
        let text = response.text().await?;

        let body = if is_json && !text.is_empty() {
            match serde_json::from_str(&text) {
                Ok(value) => value,
                Err(_) => Value::String(text),
            }
        } else {
            Value::String(text)
        };

        if status >= 400 {
            let body = match body {
                Value::String(s) => s,
                other => other.to_string(),
            };
            return Err(Error::Http { status, body });
        }
        Ok(body)
    }

    /// Default headers overlaid with per-call headers (case-insensitive names).
    fn merge_headers(&self, headers: &[(&str, &str)]) -> Vec<(String, String)> {
        let mut merged: Vec<(String, String)> = self
            .headers
            .iter()
            .filter(|(name, _)| !headers.iter().any(|(n, _)| n.eq_ignore_ascii_case(name)))
            .cloned()
            .collect();
        merged.extend(
            headers
                .iter()
                .map(|(name, value)| ((*name).to_string(), (*value).to_string())),
        );
        merged
    }
}

/// Flattens nested params into bracketed keys: `{"a": {"b": [1]}}` becomes
/// `a[b][0]=1`.
#[must_use]
pub fn flatten(params: &Value) -> Vec<(String, String)> {
    let mut out = Vec::new();
    flatten_into(params, "", &mut out);
    out
}

fn flatten_into(value: &Value, prefix: &str, out: &mut Vec<(String, String)>) {
    let child = |key: &str| {
        if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}[{}]", prefix, key)
        }
    };
    match value {
        Value::Object(map) => {
            for (key, value) in map {
                flatten_into(value, &child(key), out);
            }
        }
        Value::Array(items) => {
            for (i, value) in items.iter().enumerate() {
                flatten_into(value, &child(&i.to_string()), out);
            }
        }
        _ if prefix.is_empty() => {}
        Value::Null => out.push((prefix.to_string(), String::new())),
        Value::String(s) => out.push((prefix.to_string(), s.clone())),
        Value::Bool(b) => out.push((prefix.to_string(), b.to_string())),
        Value::Number(n) => out.push((prefix.to_string(), n.to_string())),
    }
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
