use crate::{AppState, guard::UNAUTHORIZED_PATH, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Endpoints that never consult the Role Guard.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Monitoring and load balancer check.
        .route("/health", get(|| async { "ok" }))
        // GET /unauthorized
        // Access Denied page. Must stay public: the guard redirects denied visitors here.
        .route(UNAUTHORIZED_PATH, get(handlers::unauthorized_page))
        // Legacy link kept working for bookmarks and the dashboard.
        .route("/unauthorized.php", get(handlers::unauthorized_page))
}
