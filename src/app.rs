/*
 * Responsibility
 * - tracing + panic hook
 * - Config → AuthorizationGuard (+ key warm-up) → AppState → Router
 * - Router-level middleware, then axum::serve()
 */
use std::{panic, process, sync::Arc};

use anyhow::Result;
use axum::Router;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api;
use crate::config::Config;
use crate::error::AppError;
use crate::middleware::{cors, http, security_headers};
use crate::repos::drink_repo::InMemoryDrinkRepo;
use crate::services::auth::build_authorization_guard;
use crate::state::AppState;

fn init_tracing() {
    // RUST_LOG=info,coffee_shop_api=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        tracing::error!(?info, "panic");

        // Development crashes loudly. Production keeps serving.
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env()?;
    init_panic_hook(!config.app_env.is_production());

    tracing::info!(
        "starting API in {:?} mode on {}",
        config.app_env,
        config.addr
    );

    let state = build_state(&config).await?;
    let app = build_router(state, &config);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn build_state(config: &Config) -> Result<AppState> {
    let guard = build_authorization_guard(config)?;

    // Warm-up only. An unreachable key endpoint must not keep the API down; requests retry.
    match guard.verifier().key_cache().refresh().await {
        Ok(keys) if keys.is_empty() => tracing::warn!(
            jwks_url = %config.auth_jwks_url,
            "key document has no usable signing keys"
        ),
        Ok(keys) => tracing::info!(
            jwks_url = %config.auth_jwks_url,
            keys = keys.len(),
            "signing keys loaded"
        ),
        Err(err) => tracing::warn!(
            jwks_url = %config.auth_jwks_url,
            error = %err,
            "signing keys unavailable at startup"
        ),
    }

    Ok(AppState::new(guard, Arc::new(InMemoryDrinkRepo::new())))
}

async fn not_found() -> AppError {
    AppError::NotFound
}

pub fn build_router(state: AppState, config: &Config) -> Router {
    let router = api::routes().fallback(not_found).with_state(state);

    let router = security_headers::apply(router);
    let router = cors::apply(router, config);
    http::apply(router)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use crate::services::auth::{
        permission::POST_DRINKS,
        testutil::{TestSigner, eddsa_guard, valid_claims},
    };

    const SIGNER_SEED: u8 = 3;

    fn app(vars: &[(&str, &str)]) -> Router {
        let mut vars: Vec<(String, String)> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        vars.push(("AUTH_ISSUER".into(), "https://coffee-shop.test/".into()));
        vars.push(("AUTH_AUDIENCE".into(), "drinks".into()));
        let config = Config::from_lookup(|key| {
            vars.iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        })
        .unwrap();

        let signer = TestSigner::new("k", SIGNER_SEED);
        let state = AppState::new(eddsa_guard(&signer), Arc::new(InMemoryDrinkRepo::new()));
        build_router(state, &config)
    }

    #[tokio::test]
    async fn unknown_routes_get_the_json_envelope() {
        let res = app(&[])
            .oneshot(Request::get("/coffee").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], 404);
    }

    #[tokio::test]
    async fn responses_carry_request_id_and_security_headers() {
        let res = app(&[])
            .oneshot(
                Request::get("/health")
                    .header("x-request-id", "abc-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()["x-request-id"], "abc-123");
        assert_eq!(res.headers()["x-frame-options"], "DENY");
        assert_eq!(res.headers()["x-content-type-options"], "nosniff");
    }

    #[tokio::test]
    async fn request_ids_are_generated_when_absent() {
        let res = app(&[])
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert!(res.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn oversized_bodies_are_payload_too_large() {
        let token = TestSigner::new("k", SIGNER_SEED).sign(&valid_claims(&[POST_DRINKS]));
        let title = "a".repeat(2 * http::BODY_LIMIT_BYTES);
        let body = format!(r#"{{"title":"{title}","recipe":[]}}"#);

        let res = app(&[])
            .oneshot(
                Request::post("/drinks")
                    .header("authorization", format!("Bearer {token}"))
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], 413);
        assert_eq!(body["message"], "payload too large");
    }

    #[tokio::test]
    async fn production_cors_only_echoes_allowed_origins() {
        let router = app(&[
            ("APP_ENV", "production"),
            ("CORS_ALLOWED_ORIGINS", "https://shop.test"),
        ]);

        let allowed = router
            .clone()
            .oneshot(
                Request::get("/drinks")
                    .header("origin", "https://shop.test")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            allowed.headers()["access-control-allow-origin"],
            "https://shop.test"
        );

        let denied = router
            .oneshot(
                Request::get("/drinks")
                    .header("origin", "https://evil.test")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(
            !denied
                .headers()
                .contains_key("access-control-allow-origin")
        );
    }
}
