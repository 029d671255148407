//! The one entry point protected handlers call.
//!
//! ```text
//! Start → HeaderExtracted → SignatureVerified/ClaimsValidated → PermissionGranted
//!   └────────────┴───────────────────┴───────────────────────────→ Denied(AuthError)
//! ```
use axum::http::HeaderMap;
use tracing::{debug, warn};

use crate::services::auth::{
    error::AuthError,
    extractor::extract_bearer,
    permission::PermissionChecker,
    verifier::{Claims, TokenVerifier},
};

#[derive(Debug)]
pub struct AuthorizationGuard {
    verifier: TokenVerifier,
    checker: PermissionChecker,
}

impl AuthorizationGuard {
    pub fn new(verifier: TokenVerifier, checker: PermissionChecker) -> Self {
        Self { verifier, checker }
    }

    pub fn verifier(&self) -> &TokenVerifier {
        &self.verifier
    }

    /// Extract → verify → check. Claims are returned only if all three pass.
    pub async fn authorize(&self, headers: &HeaderMap, required: &str) -> Result<Claims, AuthError> {
        let result = self.run(headers, required).await;

        match &result {
            Ok(claims) => debug!(
                subject = claims.subject.as_deref().unwrap_or("-"),
                permission = required,
                "authorized"
            ),
            Err(err) => warn!(
                code = err.code(),
                status = err.status_code().as_u16(),
                permission = required,
                "authorization denied"
            ),
        }

        result
    }

    async fn run(&self, headers: &HeaderMap, required: &str) -> Result<Claims, AuthError> {
        let token = extract_bearer(headers)?;
        let claims = self.verifier.verify(token).await?;
        self.checker.check(&claims, required)?;
        Ok(claims)
    }
}
