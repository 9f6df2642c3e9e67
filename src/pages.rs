//! Askama templates for the server-rendered pages.

use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

/// Backup & Restore page. Only rendered after the admin gate has passed.
#[derive(Template)]
#[template(path = "backup.html")]
pub struct BackupTemplate {
    pub actor: String,
    pub record_count: usize,
    /// Outcome of the form that was just submitted, if any.
    pub notice: Option<String>,
    pub error: Option<String>,
}

/// Access Denied page
#[derive(Template)]
#[template(path = "unauthorized.html")]
pub struct UnauthorizedTemplate {
    pub dashboard_url: String,
}

/// Renders a template into an HTML response with `status`, or a plain 500 if
/// rendering fails.
pub fn render<T: Template>(status: StatusCode, template: &T) -> Response {
    match template.render() {
        Ok(body) => (status, Html(body)).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "template render failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to render page").into_response()
        }
    }
}
