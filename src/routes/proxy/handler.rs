use axum::{body::Bytes, extract::State, http::StatusCode};

use crate::{AppState, error::ProxyError, upstream::Relayed};

use super::model::ProxyRequest;

#[axum::debug_handler]
pub async fn proxy(State(state): State<AppState>, body: Bytes) -> Result<Relayed, ProxyError> {
    let request = ProxyRequest::parse(&body)
        .and_then(ProxyRequest::validate)
        .inspect_err(|e| {
            tracing::info!("Rejected proxy request: {}", e);
        })?;

    state.forwarder.forward(request).await.inspect_err(|e| {
        tracing::warn!("Proxy request failed: {}", e);
    })
}

/// CORS preflight, answered without touching the upstream.
pub async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

pub async fn method_not_allowed() -> ProxyError {
    ProxyError::MethodNotAllowed
}
