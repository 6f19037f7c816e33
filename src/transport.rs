//! Wire transport abstraction and the reqwest-backed implementation.
//!
//! Defines the [`Transport`] trait used by every resolver, enabling the
//! mock transports the test suite relies on. The HTTP implementation
//! carries the API key on every request and never interprets payloads:
//! bodies come back as raw text because the backend is known to return
//! non-JSON error bodies.
//!
//! # Filter encoding
//!
//! Listing endpoints take a JSON-encoded predicate in the `where` query
//! parameter, e.g. `GET /documents?where={"corpusId":"general"}`. Use
//! [`where_clause`] to build one.

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use crate::config::ApiConfig;
use crate::error::{Error, Result};

/// One part of a multipart submission.
#[derive(Debug, Clone)]
pub enum FormPart {
    Text(String),
    File { file_name: String, bytes: Vec<u8> },
}

/// A raw response: status plus unparsed body text.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parse the body as JSON, mapping failure to a shape error.
    pub fn json(&self) -> Result<Value> {
        serde_json::from_str(&self.body)
            .map_err(|e| Error::Shape(format!("response body is not valid JSON: {}", e)))
    }

    /// Best-effort human-readable message from an error body.
    ///
    /// Prefers the named field of a JSON body (the backend uses `error` on
    /// some endpoints and `detail` on others), then the raw body text, then
    /// a generic status line. Never returns an empty string.
    pub fn error_message(&self, field: &str) -> String {
        if let Ok(value) = serde_json::from_str::<Value>(&self.body) {
            if let Some(message) = value.get(field).and_then(Value::as_str) {
                if !message.is_empty() {
                    return message.to_string();
                }
            }
        }
        let trimmed = self.body.trim();
        if trimmed.is_empty() {
            format!("request failed with status {}", self.status)
        } else {
            trimmed.to_string()
        }
    }
}

/// Build the JSON `where` predicate for a single-field equality filter.
pub fn where_clause(field: &str, value: &str) -> String {
    let mut map = serde_json::Map::new();
    map.insert(field.to_string(), Value::String(value.to_string()));
    Value::Object(map).to_string()
}

/// Abstract wire transport for the retrieval backend.
///
/// All operations are async (via `async-trait`). Implementations return
/// `Ok(RawResponse)` for any response the server produced, reserving
/// `Err(Error::Transport)` for failures to reach the server at all —
/// status interpretation belongs to the callers.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<RawResponse>;

    async fn post_json(&self, path: &str, body: &Value) -> Result<RawResponse>;

    async fn post_form(&self, path: &str, parts: Vec<(String, FormPart)>) -> Result<RawResponse>;

    async fn delete(&self, path: &str) -> Result<RawResponse>;
}

/// HTTP transport over reqwest.
///
/// Holds the base URL and API key injected from [`ApiConfig`] at
/// construction; nothing here reads the environment.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpTransport {
    pub fn new(config: &ApiConfig) -> AnyResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.key.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn finish(&self, request: reqwest::RequestBuilder) -> Result<RawResponse> {
        let response = request.header("X-API-KEY", &self.api_key).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(RawResponse { status, body })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<RawResponse> {
        self.finish(self.client.get(self.url(path)).query(query)).await
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<RawResponse> {
        self.finish(self.client.post(self.url(path)).json(body)).await
    }

    async fn post_form(&self, path: &str, parts: Vec<(String, FormPart)>) -> Result<RawResponse> {
        let mut form = reqwest::multipart::Form::new();
        for (name, part) in parts {
            form = match part {
                FormPart::Text(value) => form.text(name, value),
                FormPart::File { file_name, bytes } => form.part(
                    name,
                    reqwest::multipart::Part::bytes(bytes).file_name(file_name),
                ),
            };
        }
        self.finish(self.client.post(self.url(path)).multipart(form)).await
    }

    async fn delete(&self, path: &str) -> Result<RawResponse> {
        self.finish(self.client.delete(self.url(path))).await
    }
}
