use axum::{Router, extract::FromRef, http::HeaderName};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

pub mod auth;
pub mod backup;
pub mod config;
pub mod error;
pub mod guard;
pub mod handlers;
pub mod models;
pub mod pages;
pub mod repository;
pub mod roles;

// Public, authenticated and admin route tables.
pub mod routes;
use routes::{admin, authenticated, public};

pub use config::AppConfig;
pub use repository::{InMemoryRepository, RepositoryState};

/// ApiDoc
///
/// Aggregates the JSON endpoints and their schemas into the OpenAPI document
/// served at `/api-docs/openapi.json`. The HTML pages are not part of it.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::get_me, handlers::export_backup, handlers::export_backup_csv,
        handlers::staff_template_csv, handlers::restore_backup,
        handlers::restore_backup_csv, handlers::wipe_data
    ),
    components(
        schemas(
            models::BackupDocument, models::RestoreRequest, models::RestoreSummary,
            models::WipeRequest, models::WipeSummary, models::MeResponse,
            roles::Role, roles::RoleSet,
        )
    ),
    tags(
        (name = "simpeg-portal", description = "SIMPEG staff data backup API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Handed to every handler: the staff data store and the loaded configuration.
#[derive(Clone)]
pub struct AppState {
    /// Staff data store read by backups and replaced by restores.
    pub repo: RepositoryState,
    /// The loaded, immutable environment configuration.
    pub config: AppConfig,
}

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Builds the full router: API docs, the three route tables, request ids,
/// tracing and CORS.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(authenticated::authenticated_routes())
        .merge(admin::admin_routes())
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // Copies the request id onto the response.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span for one request, tagged with its method, URI and `x-request-id`.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
