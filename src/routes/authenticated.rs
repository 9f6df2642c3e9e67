use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Authenticated Router Module
///
/// Routes available to any resolved session, whatever its roles.
pub fn authenticated_routes() -> Router<AppState> {
    Router::new()
        // GET /me
        // The current actor's id and roles.
        .route("/me", get(handlers::get_me))
}
