use axum::{
    body::{Body, HttpBody, to_bytes},
    http::Request,
    middleware::Next,
    response::Response,
};
use tracing::error;

/// Longest body excerpt written to the log.
const LOGGED_BODY_CHARS: usize = 1024;

/// 5xx bodies larger than this, or of unknown length, are passed through
/// without being buffered for the log.
const MAX_BUFFERED_BODY: u64 = 64 * 1024;

pub async fn log_errors(req: Request<Body>, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let response = next.run(req).await;

    if !response.status().is_server_error() {
        return response;
    }

    let bounded = response
        .body()
        .size_hint()
        .upper()
        .is_some_and(|len| len <= MAX_BUFFERED_BODY);
    if !bounded {
        error!(
            "Server error occurred - {} {} - Status: {}, Body: <not logged>",
            method,
            uri,
            response.status()
        );
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match to_bytes(body, MAX_BUFFERED_BODY as usize).await {
        Ok(b) => b,
        Err(e) => {
            error!("Failed to read error response body: {}", e);
            return Response::from_parts(parts, Body::empty());
        }
    };
    let body_str: String = String::from_utf8_lossy(&bytes)
        .chars()
        .take(LOGGED_BODY_CHARS)
        .collect();

    error!(
        "Server error occurred - {} {} - Status: {}, Body: {}",
        method, uri, parts.status, body_str
    );

    // body is re-attached unchanged
    parts.headers.remove(axum::http::header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, http::StatusCode, routing::get};
    use tower::ServiceExt;

    fn app(body: &'static [u8]) -> Router {
        Router::new()
            .route(
                "/",
                get(move || async move { (StatusCode::BAD_GATEWAY, body) }),
            )
            .layer(axum::middleware::from_fn(log_errors))
    }

    async fn call(body: &'static [u8]) -> (StatusCode, Vec<u8>) {
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        let response = app(body).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    #[tokio::test]
    async fn small_error_body_is_kept() {
        let (status, body) = call(b"upstream exploded").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body, b"upstream exploded");
    }

    #[tokio::test]
    async fn large_error_body_passes_through_intact() {
        static LARGE: [u8; 200 * 1024] = [b'x'; 200 * 1024];
        let (status, body) = call(&LARGE).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body.len(), LARGE.len());
    }
}
