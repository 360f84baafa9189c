use std::sync::Arc;

use axum::body::Bytes;
use axum::response::{IntoResponse, Response};
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderValue};
use reqwest::{Client, Method, StatusCode, Url};
use serde::de::IgnoredAny;
use serde_json::{Map, Value};

use crate::cache::TokenManager;
use crate::error::ProxyError;

/// Targets under this prefix get the default `ayanamsa` and `la` query parameters.
const ASTROLOGY_PREFIX: &str = "/v2/astrology/";

/// A validated call to make against the upstream API.
#[derive(Debug, Clone, PartialEq)]
pub struct ForwardRequest {
    pub target_path: String,
    pub method: Method,
    pub payload: Map<String, Value>,
}

/// Downstream body bytes, tagged by whether they parse as JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayBody {
    Json(Bytes),
    Text(Bytes),
}

/// Downstream status and body, passed back to the caller unchanged.
#[derive(Debug)]
pub struct Relayed {
    pub status: StatusCode,
    pub content_type: Option<HeaderValue>,
    pub body: RelayBody,
}

impl Relayed {
    /// The bytes are kept as received in both cases; JSON is only checked,
    /// never re-encoded.
    pub fn from_bytes(status: StatusCode, content_type: Option<HeaderValue>, bytes: Bytes) -> Self {
        let is_json = std::str::from_utf8(&bytes)
            .is_ok_and(|text| serde_json::from_str::<IgnoredAny>(text).is_ok());
        let body = if is_json {
            RelayBody::Json(bytes)
        } else {
            RelayBody::Text(bytes)
        };
        Relayed {
            status,
            content_type,
            body,
        }
    }
}

impl IntoResponse for Relayed {
    fn into_response(self) -> Response {
        let (content_type, bytes) = match self.body {
            RelayBody::Json(bytes) => (HeaderValue::from_static("application/json"), bytes),
            RelayBody::Text(bytes) => (
                self.content_type
                    .unwrap_or(HeaderValue::from_static("text/plain")),
                bytes,
            ),
        };
        (self.status, [(CONTENT_TYPE, content_type)], bytes).into_response()
    }
}

pub struct Forwarder {
    client: Client,
    base_url: Url,
    defaults: Vec<(String, String)>,
    tokens: Arc<TokenManager>,
}

impl Forwarder {
    /// `defaults` are merged into GET queries for astrology targets.
    pub fn new(
        client: Client,
        base_url: Url,
        defaults: Vec<(String, String)>,
        tokens: Arc<TokenManager>,
    ) -> Self {
        Forwarder {
            client,
            base_url,
            defaults,
            tokens,
        }
    }

    pub async fn forward(&self, request: ForwardRequest) -> Result<Relayed, ProxyError> {
        let mut url = self.upstream_url(&request.target_path)?;
        let token = self.tokens.acquire_token().await?;

        tracing::info!("Forwarding {} {}", request.method, request.target_path);

        let builder = if request.method == Method::GET {
            let pairs = self.query_pairs(&request);
            if !pairs.is_empty() {
                url.query_pairs_mut().extend_pairs(pairs);
            }
            self.client.get(url)
        } else {
            self.client
                .request(request.method.clone(), url)
                .header(CONTENT_TYPE, "application/json")
                .body(Value::Object(request.payload).to_string())
        };

        let response = builder
            .bearer_auth(token)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Upstream request to {} failed: {}", request.target_path, e);
                ProxyError::UpstreamUnavailable(e)
            })?;

        let status = response.status();
        let content_type = response.headers().get(CONTENT_TYPE).cloned();
        let bytes = response
            .bytes()
            .await
            .map_err(ProxyError::UpstreamUnavailable)?;

        if status.is_success() {
            tracing::debug!("Upstream answered {}", status);
        } else {
            tracing::warn!("Upstream answered {} for {}, relaying", status, request.target_path);
        }

        Ok(Relayed::from_bytes(status, content_type, bytes))
    }

    fn upstream_url(&self, target_path: &str) -> Result<Url, ProxyError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let url = Url::parse(&format!("{base}{target_path}"))
            .map_err(|_| ProxyError::Validation(format!("Invalid \"path\": {target_path}")))?;

        if url.host_str() != self.base_url.host_str()
            || url.port_or_known_default() != self.base_url.port_or_known_default()
        {
            return Err(ProxyError::Validation(format!(
                "\"path\" must stay on the upstream host: {target_path}"
            )));
        }
        Ok(url)
    }

    fn query_pairs(&self, request: &ForwardRequest) -> Vec<(String, String)> {
        let mut pairs = Vec::new();

        if request.target_path.starts_with(ASTROLOGY_PREFIX) {
            pairs.extend(
                self.defaults
                    .iter()
                    .filter(|(key, _)| !request.payload.contains_key(key))
                    .cloned(),
            );
        }

        pairs.extend(
            request
                .payload
                .iter()
                .filter_map(|(key, value)| query_value(value).map(|v| (key.clone(), v))),
        );
        pairs
    }
}

fn query_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
