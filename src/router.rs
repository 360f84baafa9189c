use axum::{
    Router,
    routing::{get, post},
};

use crate::{
    AppState,
    middleware::{log_errors, with_cors},
    routes,
};

/// Full application: proxy and ping routes under `api_base_uri`, error
/// logging, CORS headers.
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route(
            "/prokerala",
            post(routes::proxy::proxy)
                .options(routes::proxy::preflight)
                .fallback(routes::proxy::method_not_allowed),
        )
        .route("/ping", get(routes::ping::ping));

    let base = state.config.api_base_uri.trim_matches('/');
    let router: Router<AppState> = if base.is_empty() {
        Router::new().merge(api)
    } else {
        Router::new().nest(&format!("/{base}"), api)
    };

    let router = router
        .layer(axum::middleware::from_fn(log_errors))
        .with_state(state);

    with_cors(router)
}
