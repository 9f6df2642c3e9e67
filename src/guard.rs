//! Role Guard.
//!
//! Inspects the current session's roles and decides whether a request may
//! continue. The check runs while the request head is extracted, so a denied
//! caller is answered before any body is read.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, header, request::Parts},
    response::{IntoResponse, Redirect, Response},
};

use crate::{
    auth::{AuthUser, resolve_session},
    config::AppConfig,
    error::AppError,
    roles::Role,
};

/// Route of the Access Denied page.
pub const UNAUTHORIZED_PATH: &str = "/unauthorized";

/// Roles allowed to open the Backup & Restore page and run its operations.
pub const BACKUP_ROLES: &[Role] = &[Role::Admin];

/// Why the guard halted a request.
#[derive(Debug, Clone, PartialEq)]
pub enum Denial {
    /// No session could be resolved.
    Unauthenticated { login_url: String },
    /// A session exists but holds none of the required roles.
    Forbidden { required: Vec<Role> },
}

/// How a denial is reported back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    /// 303 to the login page or the Access Denied page.
    Redirect,
    /// 401/403 with a JSON error body.
    Json,
}

impl ResponseFormat {
    /// `Json` when the `Accept` header lists `application/json`.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let wants_json = headers
            .get_all(header::ACCEPT)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(','))
            .filter_map(|media| media.split(';').next())
            .any(|media| media.trim().eq_ignore_ascii_case("application/json"));

        if wants_json {
            ResponseFormat::Json
        } else {
            ResponseFormat::Redirect
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GuardRejection {
    pub denial: Denial,
    pub format: ResponseFormat,
}

impl IntoResponse for GuardRejection {
    fn into_response(self) -> Response {
        match (self.format, self.denial) {
            (ResponseFormat::Json, denial) => AppError::from(denial).into_response(),
            (ResponseFormat::Redirect, Denial::Unauthenticated { login_url }) => {
                Redirect::to(&login_url).into_response()
            }
            (ResponseFormat::Redirect, Denial::Forbidden { .. }) => {
                Redirect::to(UNAUTHORIZED_PATH).into_response()
            }
        }
    }
}

/// require_roles
///
/// Lets the request continue only when `actor` holds at least one of `roles`.
pub fn require_roles(actor: &AuthUser, roles: &[Role]) -> Result<(), Denial> {
    if actor.roles.intersects(roles) {
        return Ok(());
    }

    tracing::warn!(
        actor = %actor.id,
        held = %actor.roles,
        required = ?roles,
        "role guard denied request"
    );
    Err(Denial::Forbidden {
        required: roles.to_vec(),
    })
}

fn admit(parts: &Parts, config: &AppConfig, roles: &[Role]) -> Result<AuthUser, Denial> {
    let actor = resolve_session(parts, config)?;
    require_roles(&actor, roles)?;
    Ok(actor)
}

/// AdminUser
///
/// A session holding one of `BACKUP_ROLES`, for the HTML pages and forms.
/// Denials follow the caller's `Accept` header.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = GuardRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AppConfig::from_ref(state);
        admit(parts, &config, BACKUP_ROLES)
            .map(AdminUser)
            .map_err(|denial| GuardRejection {
                denial,
                format: ResponseFormat::from_headers(&parts.headers),
            })
    }
}

/// AdminApiUser
///
/// A session holding one of `BACKUP_ROLES`, for the `/api` endpoints.
/// Denials are always JSON 401/403.
#[derive(Debug, Clone)]
pub struct AdminApiUser(pub AuthUser);

impl<S> FromRequestParts<S> for AdminApiUser
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AppConfig::from_ref(state);
        admit(parts, &config, BACKUP_ROLES)
            .map(AdminApiUser)
            .map_err(AppError::from)
    }
}
