use axum::http::HeaderValue;
use std::sync::Arc;
use thiserror::Error;
use url::Url;

use crate::model::ResourceModel;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DATABASE_URI: &str = "memory://staff";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("FRONT_END_URL is not a valid URL: {0}")]
    InvalidFrontEndUrl(#[from] url::ParseError),
    #[error("FRONT_END_URL has no usable origin: {0}")]
    OpaqueOrigin(String),
}

/// Settings read from the environment at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Port to listen on, from `PORT`.
    pub port: u16,
    /// The single origin allowed to make cross-origin requests, from
    /// `FRONT_END_URL`. Unset means no cross-origin access.
    pub front_end_origin: Option<HeaderValue>,
    /// Store connection string, from `DB_URI`.
    pub database_uri: String,
}

impl Config {
    /// Reads configuration from the process environment, falling back to
    /// defaults (with a warning) for missing values.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`, which maps a variable name to
    /// its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = lookup("PORT")
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(|| {
                tracing::warn!("PORT not set or invalid, using default: {}", DEFAULT_PORT);
                DEFAULT_PORT
            });

        let front_end_origin = match lookup("FRONT_END_URL").filter(|s| !s.is_empty()) {
            Some(raw) => Some(parse_origin(&raw)?),
            None => {
                tracing::warn!("FRONT_END_URL not set, cross-origin requests will be refused");
                None
            }
        };

        let database_uri = lookup("DB_URI").unwrap_or_else(|| {
            tracing::warn!("DB_URI not set, using default: {}", DEFAULT_DATABASE_URI);
            DEFAULT_DATABASE_URI.to_string()
        });

        Ok(Self {
            port,
            front_end_origin,
            database_uri,
        })
    }
}

/// Reduces a front-end URL to the origin browsers send, e.g.
/// `https://app.example.org:8443/some/path` to `https://app.example.org:8443`.
fn parse_origin(raw: &str) -> Result<HeaderValue, ConfigError> {
    let url = Url::parse(raw)?;
    let origin = url.origin();
    if !origin.is_tuple() {
        return Err(ConfigError::OpaqueOrigin(raw.to_string()));
    }

    HeaderValue::from_str(&origin.ascii_serialization())
        .map_err(|_| ConfigError::OpaqueOrigin(raw.to_string()))
}

/// The application state shared across routers.
#[derive(Clone)]
pub struct AppState {
    pub departments: Arc<dyn ResourceModel>,
    pub employees: Arc<dyn ResourceModel>,
    /// Origin allowed by the CORS layer, if any
    pub allowed_origin: Option<HeaderValue>,
}
