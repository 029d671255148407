/*
 * Responsibility
 * - Load settings from the environment (.env supported): listen address, CORS, auth
 * - Validate them up front (startup fails on missing/invalid values)
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::services::auth::key_cache::{DEFAULT_FETCH_TIMEOUT, DEFAULT_TTL};
use crate::services::auth::permission::MissingPermissions;
use crate::services::auth::verifier::SigningAlgorithm;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(value: Option<String>) -> Self {
        match value
            .unwrap_or_else(|| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,

    pub app_env: AppEnv,
    pub cors_allowed_origins: Vec<String>,

    pub auth_issuer: String,
    pub auth_audience: String,
    pub auth_jwks_url: Url,
    pub auth_algorithm: SigningAlgorithm,
    pub access_token_leeway_seconds: u64,
    pub missing_permissions: MissingPermissions,

    pub jwks_cache_ttl: Duration,
    pub jwks_fetch_timeout: Duration,
    pub jwks_min_refresh_interval: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port: u16 = var("PORT").and_then(|s| s.parse().ok()).unwrap_or(3000);

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::parse(var("APP_ENV"));

        let cors_allowed_origins = var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        let auth_issuer = var("AUTH_ISSUER")
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::Missing("AUTH_ISSUER"))?;

        let auth_audience = var("AUTH_AUDIENCE")
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::Missing("AUTH_AUDIENCE"))?;

        // Auth0-style default: <issuer>/.well-known/jwks.json
        let auth_jwks_url = match var("AUTH_JWKS_URL") {
            Some(url) => Url::parse(&url).map_err(|_| ConfigError::Invalid("AUTH_JWKS_URL"))?,
            None => Url::parse(&format!(
                "{}/.well-known/jwks.json",
                auth_issuer.trim_end_matches('/')
            ))
            .map_err(|_| ConfigError::Invalid("AUTH_ISSUER"))?,
        };

        let auth_algorithm = var("AUTH_ALGORITHM")
            .unwrap_or_else(|| "RS256".to_string())
            .parse::<SigningAlgorithm>()
            .map_err(|_| ConfigError::Invalid("AUTH_ALGORITHM"))?;

        let access_token_leeway_seconds = var("AUTH_LEEWAY_SECONDS")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0);

        let missing_permissions = match var("AUTH_MISSING_PERMISSIONS") {
            Some(v) => v
                .parse::<MissingPermissions>()
                .map_err(|_| ConfigError::Invalid("AUTH_MISSING_PERMISSIONS"))?,
            None => MissingPermissions::default(),
        };

        let seconds = |key: &str, default: Duration| {
            var(key)
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(default)
        };

        let jwks_cache_ttl = seconds("AUTH_JWKS_CACHE_TTL_SECONDS", DEFAULT_TTL);
        let jwks_fetch_timeout = seconds("AUTH_JWKS_FETCH_TIMEOUT_SECONDS", DEFAULT_FETCH_TIMEOUT);
        let jwks_min_refresh_interval = seconds("AUTH_JWKS_MIN_REFRESH_SECONDS", Duration::ZERO);

        if jwks_fetch_timeout.is_zero() {
            return Err(ConfigError::Invalid("AUTH_JWKS_FETCH_TIMEOUT_SECONDS"));
        }

        Ok(Self {
            addr,
            app_env,
            cors_allowed_origins,
            auth_issuer,
            auth_audience,
            auth_jwks_url,
            auth_algorithm,
            access_token_leeway_seconds,
            missing_permissions,
            jwks_cache_ttl,
            jwks_fetch_timeout,
            jwks_min_refresh_interval,
        })
    }
}
