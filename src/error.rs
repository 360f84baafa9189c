use axum::Json;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;

/// Every way a proxied call can fail before a downstream response exists.
///
/// A downstream non-success status is not an error here: it is relayed as-is.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("{0}")]
    Validation(String),

    #[error(
        "Server not configured. Set PROKERALA_CLIENT_ID and PROKERALA_CLIENT_SECRET in the environment."
    )]
    MissingCredentials,

    #[error("{reason}")]
    UpstreamAuth {
        reason: &'static str,
        status: Option<u16>,
        body: Value,
    },

    #[error("Upstream service unavailable")]
    UpstreamUnavailable(#[source] reqwest::Error),

    #[error("Method not allowed, use POST")]
    MethodNotAllowed,
}

impl ProxyError {
    pub fn missing(field: &str) -> Self {
        ProxyError::Validation(format!(
            "Missing \"{field}\" in request body. Example: {{ \"path\": \"/v2/astrology/natal\", \"method\": \"GET\", \"payload\": {{...}} }}"
        ))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::Validation(_) => StatusCode::BAD_REQUEST,
            ProxyError::MissingCredentials => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::UpstreamAuth { .. } => StatusCode::BAD_GATEWAY,
            ProxyError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
            ProxyError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        }
    }
}

/// Failures while wiring up the service at start-up.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("invalid PROKERALA_BASE_URL {url:?}: {reason}")]
    BaseUrl { url: String, reason: String },

    #[error("failed to build HTTP client")]
    HttpClient(#[from] reqwest::Error),
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    code: u16,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let mut payload = ErrorResponse {
            code: status.as_u16(),
            error: self.to_string(),
            status: None,
            body: None,
            detail: None,
        };

        match self {
            ProxyError::UpstreamAuth {
                status: upstream,
                body,
                ..
            } => {
                payload.status = upstream;
                payload.body = Some(body);
            }
            ProxyError::UpstreamUnavailable(e) => {
                payload.detail = Some(e.without_url().to_string());
            }
            _ => {}
        }

        (status, Json(payload)).into_response()
    }
}
