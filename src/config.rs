use std::env;

use thiserror::Error;

/// Fallback session secret used only when `APP_ENV` is not production.
const LOCAL_SESSION_SECRET: &str = "super-secure-test-secret-value-local";

/// AppConfig
///
/// Holds the application's entire configuration state. It is loaded once at startup
/// and pulled into handlers and extractors via `FromRef`, so every request sees the
/// same immutable values.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls feature activation (e.g., Dev Bypass).
    pub env: Env,
    // Shared secret used to verify session tokens issued by the upstream login service.
    pub session_secret: String,
    // Socket address the HTTP server binds to.
    pub bind_addr: String,
    // Target of the "Kembali ke Dashboard" link on the Access Denied page.
    pub dashboard_url: String,
    // Where anonymous visitors are sent when a guarded page is requested.
    pub login_url: String,
}

/// Env
///
/// Defines the runtime context, used to switch between development utilities
/// (header bypass, pretty logs) and the hardened production setup.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

/// Errors raised while resolving configuration at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set in production")]
    MissingVar(&'static str),
}

impl Default for AppConfig {
    /// Provides a safe local configuration, primarily used for test setup.
    fn default() -> Self {
        Self {
            env: Env::Local,
            session_secret: LOCAL_SESSION_SECRET.to_string(),
            bind_addr: "0.0.0.0:3000".to_string(),
            dashboard_url: "dashboard.php".to_string(),
            login_url: "login.php".to_string(),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads all parameters from environment variables and fails fast when a value
    /// required by the current runtime environment is missing.
    ///
    /// # Errors
    /// Returns `ConfigError::MissingVar` if `SESSION_SECRET` is absent in production.
    pub fn load() -> Result<Self, ConfigError> {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        // The production secret is mandatory; local runs fall back to a known value.
        let session_secret = match env {
            Env::Production => {
                env::var("SESSION_SECRET").map_err(|_| ConfigError::MissingVar("SESSION_SECRET"))?
            }
            Env::Local => {
                env::var("SESSION_SECRET").unwrap_or_else(|_| LOCAL_SESSION_SECRET.to_string())
            }
        };

        let defaults = Self::default();

        Ok(Self {
            env,
            session_secret,
            bind_addr: env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            dashboard_url: env::var("DASHBOARD_URL").unwrap_or(defaults.dashboard_url),
            login_url: env::var("LOGIN_URL").unwrap_or(defaults.login_url),
        })
    }
}
