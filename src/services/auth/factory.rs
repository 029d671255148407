//! Factory: build the `AuthorizationGuard` from application `Config`.
use std::sync::Arc;

use crate::config::Config;
use crate::services::auth::{
    AuthorizationGuard, KeySetCache, PermissionChecker, TokenVerifier,
    key_source::{HttpKeySource, KeySource, KeySourceError},
};

pub fn build_authorization_guard(config: &Config) -> Result<Arc<AuthorizationGuard>, KeySourceError> {
    let source = HttpKeySource::new(config.auth_jwks_url.clone(), config.jwks_fetch_timeout)?;
    tracing::debug!(jwks_url = %source.url(), algorithm = config.auth_algorithm.name(), "key source configured");

    let cache = KeySetCache::builder(Arc::new(source) as Arc<dyn KeySource>)
        .ttl(config.jwks_cache_ttl)
        .fetch_timeout(config.jwks_fetch_timeout)
        .min_refresh_interval(config.jwks_min_refresh_interval)
        .build();

    let verifier = TokenVerifier::new(
        Arc::new(cache),
        config.auth_algorithm.clone(),
        &config.auth_issuer,
        &config.auth_audience,
        config.access_token_leeway_seconds,
    );

    Ok(Arc::new(AuthorizationGuard::new(
        verifier,
        PermissionChecker::new(config.missing_permissions),
    )))
}
