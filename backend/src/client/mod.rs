//! Freight exchange API client.
//!
//! One call per (offer kind × verb): list, get, create, delete. Every call
//! uses basic auth and carries the company id as `timocom_id`. No retries,
//! caching or pagination here; bulk retry lives in [`crate::bulk`].
//!
//! ```rust,ignore
//! use freightload::client::{OfferApi, TimocomClient};
//! use freightload::models::OfferKind;
//!
//! let client = TimocomClient::from_env()?;
//! let mine = client.list(OfferKind::Freight).await?;
//! println!("{}", mine.data);
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{header, Method, RequestBuilder, Response, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{Environment, TimocomConfig};
use crate::error::{ApiError, ApiResult, ConfigError};
use crate::models::OfferKind;

const USER_AGENT: &str = concat!("freightload/", env!("CARGO_PKG_VERSION"));

/// Envelope returned by every successful call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Value,
    pub timestamp: DateTime<Utc>,
}

impl ApiResponse {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data,
            timestamp: Utc::now(),
        }
    }
}

/// Operations the rest of the crate needs from the exchange.
#[async_trait]
pub trait OfferApi: Send + Sync {
    /// Offers published by our company.
    async fn list(&self, kind: OfferKind) -> ApiResult<ApiResponse>;

    async fn get(&self, kind: OfferKind, id: &str) -> ApiResult<ApiResponse>;

    async fn create(&self, kind: OfferKind, offer: &Value) -> ApiResult<ApiResponse>;

    async fn delete(&self, kind: OfferKind, id: &str) -> ApiResult<ApiResponse>;
}

// =============================================================================
// HTTP implementation
// =============================================================================

/// reqwest-backed client.
#[derive(Clone)]
pub struct TimocomClient {
    http: reqwest::Client,
    config: TimocomConfig,
    base: Url,
}

impl TimocomClient {
    /// Build a client; the timeout is fixed for its lifetime.
    pub fn new(config: TimocomConfig) -> Result<Self, ConfigError> {
        let base = Url::parse(&config.base_url)
            .map_err(|e| e.to_string())
            .and_then(|url| {
                if url.cannot_be_a_base() {
                    Err("not a hierarchical URL".to_string())
                } else {
                    Ok(url)
                }
            })
            .map_err(|message| ConfigError::InvalidVar {
                var: "TIMOCOM_BASE_URL",
                message: format!("'{}': {}", config.base_url, message),
            })?;

        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self { http, config, base })
    }

    /// Build a client from `TIMOCOM_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = TimocomConfig::from_env()?;
        Self::new(config)
    }

    pub fn environment(&self) -> Environment {
        self.config.environment
    }

    /// `<base>/<upstream path>[/<id>]`, with the id encoded as one segment.
    fn url(&self, kind: OfferKind, id: Option<&str>) -> Url {
        let mut url = self.base.clone();
        // `new` rejects cannot-be-a-base URLs, so segments are always available
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(kind.upstream_path());
            if let Some(id) = id {
                segments.push(id);
            }
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http
            .request(method, url)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .query(&[("timocom_id", self.config.company_id.as_str())])
    }

    async fn send(&self, builder: RequestBuilder) -> ApiResult<ApiResponse> {
        let response = builder.send().await?;
        into_envelope(response).await
    }
}

#[async_trait]
impl OfferApi for TimocomClient {
    async fn list(&self, kind: OfferKind) -> ApiResult<ApiResponse> {
        let url = self.url(kind, None);
        self.send(self.request(Method::GET, url)).await
    }

    async fn get(&self, kind: OfferKind, id: &str) -> ApiResult<ApiResponse> {
        let url = self.url(kind, Some(id));
        self.send(self.request(Method::GET, url)).await
    }

    async fn create(&self, kind: OfferKind, offer: &Value) -> ApiResult<ApiResponse> {
        let url = self.url(kind, None);
        self.send(self.request(Method::POST, url).json(offer)).await
    }

    async fn delete(&self, kind: OfferKind, id: &str) -> ApiResult<ApiResponse> {
        let url = self.url(kind, Some(id));
        self.send(self.request(Method::DELETE, url)).await
    }
}

/// Map a response to the envelope or to [`ApiError::Upstream`].
async fn into_envelope(response: Response) -> ApiResult<ApiResponse> {
    let status = response.status();
    let text = response.text().await?;
    let body = parse_body(&text);

    if !status.is_success() {
        return Err(ApiError::Upstream {
            status: status.as_u16(),
            body,
        });
    }

    Ok(ApiResponse::ok(body))
}

/// JSON when possible, raw text otherwise, null when empty.
fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

// =============================================================================
// Response helpers
// =============================================================================

/// Offers contained in a list response.
///
/// Accepts a bare array or an object wrapping it in `payload`, `items`,
/// `offers` or `data`.
pub fn extract_offers(data: &Value) -> Vec<Value> {
    if let Some(items) = data.as_array() {
        return items.clone();
    }
    ["payload", "items", "offers", "data"]
        .iter()
        .find_map(|key| data.get(*key).and_then(|v| v.as_array()))
        .cloned()
        .unwrap_or_default()
}

/// Identifier of an offer object (`id` or `publicOfferId`, string or number).
pub fn offer_id(offer: &Value) -> Option<String> {
    let target = offer.get("payload").filter(|p| p.is_object()).unwrap_or(offer);
    ["id", "publicOfferId"]
        .iter()
        .find_map(|key| match target.get(*key) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
}
