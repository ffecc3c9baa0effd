//! # routesync-client
//!
//! HTTP client for the upstream dispatch tracking API.
//!
//! The API authenticates with a static `X-AUTH-TOKEN` header (not a bearer
//! token). List endpoints wrap their payload in `{"response": [...]}` and
//! signal end-of-pagination with an empty array; the route detail endpoint
//! optionally wraps its payload in `{"response": {"route": {...}}}`.

use std::time::Duration;

use reqwest::{header, Client, StatusCode};
use serde_json::Value as JsonValue;
use tracing::{debug, info};

use routesync_core::{Config, Error, Result};

/// Timeout for upstream requests (seconds).
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Client for the upstream tracking API.
#[derive(Debug, Clone)]
pub struct TrackClient {
    client: Client,
    base_url: String,
    token: String,
}

impl TrackClient {
    /// Create a new client for the given base URL and token.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {e}")))?;

        let base_url = base_url.into();
        info!(base_url = %base_url, "Initializing tracking API client");

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    /// Create a client from process configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.base_url.clone(), config.token.clone())
    }

    /// Fetch one page of the route listing for a date.
    ///
    /// Returns the raw route items; an empty vector means the listing is
    /// exhausted (that is the normal end-of-pagination signal, not an error).
    pub async fn fetch_routes_page(&self, date: &str, page: u32) -> Result<Vec<JsonValue>> {
        let url = format!("{}/routes?date={}&page={}", self.base_url, date, page);
        let body = self.get_json(&url).await?;

        let routes = match body.get("response") {
            Some(JsonValue::Array(items)) => items.clone(),
            _ => Vec::new(),
        };
        debug!(date, page, count = routes.len(), "Fetched routes page");
        Ok(routes)
    }

    /// Fetch the full detail payload for one route.
    pub async fn fetch_route_details(&self, route_key: &str) -> Result<JsonValue> {
        let url = format!("{}/routes/{}", self.base_url, route_key);
        let body = self.get_json(&url).await?;
        Ok(unwrap_route_envelope(body))
    }

    async fn get_json(&self, url: &str) -> Result<JsonValue> {
        debug!(url, "GET upstream");
        let response = self
            .client
            .get(url)
            .header("X-AUTH-TOKEN", &self.token)
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(Error::Unauthorized(format!(
                "401 when calling {url}. Check DISPATCHTRACK_TOKEN matches the \
                 X-AUTH-TOKEN the upstream expects."
            )));
        }
        if !status.is_success() {
            return Err(Error::Upstream {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response.json::<JsonValue>().await?)
    }
}

/// Unwrap the optional `{"response": {"route": {...}}}` envelope around a
/// route detail payload. Each layer is peeled only when present.
pub fn unwrap_route_envelope(mut body: JsonValue) -> JsonValue {
    if let Some(inner) = body.get_mut("response") {
        body = inner.take();
    }
    if let Some(route) = body.get_mut("route") {
        body = route.take();
    }
    body
}
