use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, header, request::Parts},
};
use axum_extra::extract::CookieJar;
use jsonwebtoken::{DecodingKey, Validation, decode, errors::ErrorKind};
use serde::{Deserialize, Serialize};

use crate::{
    config::{AppConfig, Env},
    error::AppError,
    guard::{Denial, GuardRejection, ResponseFormat},
    roles::RoleSet,
};

/// Cookie carrying the upstream session token for browser navigation.
pub const SESSION_COOKIE: &str = "simpeg_session";

/// Claims
///
/// Payload of the session token issued by the upstream login service.
/// This service only verifies the signature and expiry; it never issues tokens.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the username or account id of the actor.
    pub sub: String,
    /// Role names as stored by the upstream role store ("Admin", "Supervisor", ...).
    #[serde(default)]
    pub roles: Vec<String>,
    /// Expiration Time (exp): Timestamp after which the token must not be accepted.
    pub exp: usize,
    /// Issued At (iat): Timestamp when the token was issued.
    pub iat: usize,
}

/// AuthUser
///
/// The resolved identity of the current session. Role-gated handlers receive it
/// through the extractors in `guard`, which have already checked its roles.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
    pub roles: RoleSet,
}

/// AuthUser Extractor Implementation
///
/// Rejection: `GuardRejection` carrying `Denial::Unauthenticated`. Browsers are
/// redirected to the login page, `Accept: application/json` callers get a 401.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = GuardRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AppConfig::from_ref(state);
        resolve_session(parts, &config).map_err(|denial| GuardRejection {
            denial,
            format: ResponseFormat::from_headers(&parts.headers),
        })
    }
}

/// ApiUser
///
/// Same resolution as `AuthUser`, but always rejects with a JSON `401`.
#[derive(Debug, Clone)]
pub struct ApiUser(pub AuthUser);

impl<S> FromRequestParts<S> for ApiUser
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AppConfig::from_ref(state);
        resolve_session(parts, &config)
            .map(ApiUser)
            .map_err(AppError::from)
    }
}

/// resolve_session
///
/// Resolves the session from the request head, in this order:
/// 1. Local Bypass: `x-user-id` / `x-user-roles` headers, honoured only in `Env::Local`.
/// 2. `Authorization: Bearer <token>`.
/// 3. The `simpeg_session` cookie.
pub fn resolve_session(parts: &Parts, config: &AppConfig) -> Result<AuthUser, Denial> {
    if config.env == Env::Local {
        if let Some(user) = local_bypass(&parts.headers) {
            return Ok(user);
        }
    }

    let token = bearer_token(&parts.headers)
        .map(str::to_string)
        .or_else(|| session_cookie(&parts.headers));

    let claims = match token {
        Some(token) => decode_session(&token, &config.session_secret),
        None => {
            tracing::warn!(uri = %parts.uri, "role guard denied request: no session presented");
            None
        }
    };

    let Some(claims) = claims else {
        return Err(Denial::Unauthenticated {
            login_url: config.login_url.clone(),
        });
    };

    Ok(AuthUser {
        roles: RoleSet::from_names(&claims.roles),
        id: claims.sub,
    })
}

/// Verifies a session token and returns its claims. Expired, malformed and
/// wrongly signed tokens all resolve to `None`.
pub fn decode_session(token: &str, secret: &str) -> Option<Claims> {
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let mut validation = Validation::default();
    validation.validate_exp = true;

    match decode::<Claims>(token, &decoding_key, &validation) {
        Ok(data) => Some(data.claims),
        Err(e) => {
            match e.kind() {
                ErrorKind::ExpiredSignature => {
                    tracing::warn!("role guard denied request: session token expired")
                }
                kind => tracing::warn!(?kind, "role guard denied request: invalid session token"),
            }
            None
        }
    }
}

fn local_bypass(headers: &HeaderMap) -> Option<AuthUser> {
    let id = headers.get("x-user-id")?.to_str().ok()?.trim();
    if id.is_empty() {
        return None;
    }
    let roles = headers
        .get("x-user-roles")
        .and_then(|value| value.to_str().ok())
        .map(|value| RoleSet::from_names(value.split(',')))
        .unwrap_or_default();

    Some(AuthUser {
        id: id.to_string(),
        roles,
    })
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

fn session_cookie(headers: &HeaderMap) -> Option<String> {
    CookieJar::from_headers(headers)
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
}
