//! Authorization failure taxonomy.
//!
//! Every step of the guard fails with the most specific variant. The `Display` text is what
//! clients see, so it never carries key material, cache state or upstream error details;
//! those are logged where they happen.
use axum::http::StatusCode;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("authorization header is expected")]
    MissingHeader,
    #[error("authorization header must be a bearer token")]
    MalformedHeader,
    #[error("authorization header must start with \"Bearer\"")]
    UnsupportedScheme,
    #[error("unable to parse authentication token")]
    InvalidTokenFormat,
    #[error("token algorithm is not accepted")]
    InvalidAlgorithm,
    #[error("unable to find the appropriate key")]
    KeyNotFound,
    #[error("authorization service unavailable")]
    KeySourceUnavailable,
    #[error("token signature is invalid")]
    InvalidSignature,
    #[error("token expired")]
    TokenExpired,
    #[error("token is not valid yet")]
    TokenNotYetValid,
    #[error("incorrect claims, please check the issuer")]
    InvalidIssuer,
    #[error("incorrect claims, please check the audience")]
    InvalidAudience,
    #[error("permissions not included in token")]
    PermissionsClaimMissing,
    #[error("permission not found")]
    PermissionDenied,
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::PermissionDenied => StatusCode::FORBIDDEN,
            AuthError::KeySourceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    /// Stable machine-readable code, used in logs.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingHeader => "authorization_header_missing",
            AuthError::MalformedHeader => "invalid_header",
            AuthError::UnsupportedScheme => "unsupported_scheme",
            AuthError::InvalidTokenFormat => "invalid_token_format",
            AuthError::InvalidAlgorithm => "invalid_algorithm",
            AuthError::KeyNotFound => "key_not_found",
            AuthError::KeySourceUnavailable => "key_source_unavailable",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::TokenExpired => "token_expired",
            AuthError::TokenNotYetValid => "token_not_yet_valid",
            AuthError::InvalidIssuer => "invalid_issuer",
            AuthError::InvalidAudience => "invalid_audience",
            AuthError::PermissionsClaimMissing => "permissions_claim_missing",
            AuthError::PermissionDenied => "permission_denied",
        }
    }
}
