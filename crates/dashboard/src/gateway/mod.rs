//! Commerce API client.
//!
//! Talks to the club's commerce backend (a proxy in front of `WooCommerce`)
//! for subscriptions, orders, event products and customers.
//!
//! # API Reference
//!
//! - List endpoints: `GET {base}/{resource}?status&page&per_page&search`,
//!   answering `{data, total, totalPages, page}`
//! - Single record: `GET {base}/{resource}?id=<id>`
//! - Aggregates: `GET {base}/stats`, `GET {base}/sync-status`
//! - Sync trigger: `POST {sync_url}` with `{"entity": ...}`
//! - Authentication: optional key sent as `apikey` and `Authorization: Bearer <key>`
//!
//! The gateway performs exactly one request per call. Retrying and caching
//! live in [`crate::query`].

mod resources;

use std::sync::Arc;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::config::CommerceConfig;

/// Errors that can occur when talking to the commerce API.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Transport failure (connection refused, timeout, TLS).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// API returned a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Response body did not have the expected shape.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Endpoint URL could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl GatewayError {
    /// HTTP status for API errors.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Commerce API client.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct CommerceGateway {
    inner: Arc<CommerceGatewayInner>,
}

struct CommerceGatewayInner {
    client: reqwest::Client,
    base_url: String,
    sync_url: String,
}

impl CommerceGateway {
    /// Create a new commerce API client.
    ///
    /// # Errors
    ///
    /// Returns error if the API key is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &CommerceConfig) -> Result<Self, GatewayError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(api_key) = &config.api_key {
            let key = api_key.expose_secret();
            let invalid = |e: reqwest::header::InvalidHeaderValue| {
                GatewayError::Decode(format!("Invalid API key format: {e}"))
            };
            headers.insert("apikey", HeaderValue::from_str(key).map_err(invalid)?);
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {key}")).map_err(invalid)?,
            );
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(CommerceGatewayInner {
                client,
                base_url: config.api_url.as_str().trim_end_matches('/').to_string(),
                sync_url: config.sync_url.to_string(),
            }),
        })
    }

    /// Base URL all resource paths are relative to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    fn endpoint(&self, path: &str) -> Result<reqwest::Url, GatewayError> {
        let raw = format!("{}/{}", self.inner.base_url, path.trim_start_matches('/'));
        reqwest::Url::parse(&raw).map_err(|e| GatewayError::InvalidUrl(format!("{raw}: {e}")))
    }

    /// Execute a GET request with query pairs in the given order.
    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, GatewayError> {
        let url = self.endpoint(path)?;
        let mut request = self.inner.client.get(url);
        if !query.is_empty() {
            request = request.query(query);
        }
        let response = request.send().await?;
        Self::handle_response(response).await
    }

    /// Execute a POST request against the sync endpoint.
    pub(crate) async fn post_sync<T: DeserializeOwned, B: serde::Serialize + Sync>(
        &self,
        body: &B,
    ) -> Result<T, GatewayError> {
        let response = self
            .inner
            .client
            .post(&self.inner.sync_url)
            .json(body)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    /// Handle API response and parse JSON.
    async fn handle_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, GatewayError> {
        let status = response.status();

        if status.is_success() {
            let bytes = response.bytes().await?;
            return serde_json::from_slice(&bytes)
                .map_err(|e| GatewayError::Decode(format!("Failed to parse response: {e}")));
        }

        Err(Self::parse_error(response).await)
    }

    /// Parse error response, preferring an `error` or `message` field.
    async fn parse_error(response: reqwest::Response) -> GatewayError {
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| {
                ["error", "message"]
                    .iter()
                    .find_map(|k| v.get(*k).and_then(Value::as_str).map(str::to_string))
            })
            .unwrap_or(body);

        GatewayError::Api { status, message }
    }
}

impl std::fmt::Debug for CommerceGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommerceGateway")
            .field("base_url", &self.inner.base_url)
            .field("sync_url", &self.inner.sync_url)
            .finish_non_exhaustive()
    }
}

/// Resolve a single-record response body.
///
/// - `{"data": [first, ...]}` yields `first`
/// - `{"data": []}` or `{"data": null}` yields `None`
/// - an object without `data` is decoded as the record itself
/// - anything else (including `{}`) yields `None`
///
/// # Errors
///
/// Returns `GatewayError::Decode` if the selected value is not a valid `T`.
pub fn single_from_body<T: DeserializeOwned>(body: Value) -> Result<Option<T>, GatewayError> {
    let decode = |value: Value| {
        serde_json::from_value(value)
            .map_err(|e| GatewayError::Decode(format!("Failed to parse record: {e}")))
    };

    match body {
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => items.into_iter().next().map(decode).transpose(),
            Some(Value::Null) => Ok(None),
            Some(record @ Value::Object(_)) => decode(record).map(Some),
            Some(other) => Err(GatewayError::Decode(format!(
                "Unexpected data field: {other}"
            ))),
            None if map.is_empty() => Ok(None),
            None => decode(Value::Object(map)).map(Some),
        },
        _ => Ok(None),
    }
}
