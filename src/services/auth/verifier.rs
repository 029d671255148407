use std::{collections::BTreeSet, str::FromStr, sync::Arc};

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{Algorithm, Validation, errors::ErrorKind};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::services::auth::{error::AuthError, key_cache::KeySetCache};

/// Verified access-token claims handed to handlers.
///
/// Only `TokenVerifier::verify` constructs this, so holding one means signature,
/// issuer, audience and lifetime all checked out.
#[derive(Debug, Clone)]
pub struct Claims {
    pub issuer: String,
    pub audience: Vec<String>,
    pub subject: Option<String>,
    pub expires_at: i64,
    pub not_before: Option<i64>,
    pub issued_at: Option<i64>,
    pub permissions: BTreeSet<String>,
    permissions_present: bool,
}

impl Claims {
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }

    /// False when the token carried no `permissions` claim at all.
    pub fn permissions_present(&self) -> bool {
        self.permissions_present
    }
}

#[derive(Debug, Deserialize)]
struct TokenHeader {
    alg: String,
    #[serde(default)]
    kid: Option<String>,
}

// `aud` may be a string or an array of strings (RFC 7519 §4.1.3).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Audience {
    One(String),
    Many(Vec<String>),
}

impl Audience {
    fn into_vec(self) -> Vec<String> {
        match self {
            Audience::One(aud) => vec![aud],
            Audience::Many(auds) => auds,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenPayload {
    #[serde(default)]
    iss: Option<String>,
    #[serde(default)]
    aud: Option<Audience>,
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    exp: Option<i64>,
    #[serde(default)]
    nbf: Option<i64>,
    #[serde(default)]
    iat: Option<i64>,
    #[serde(default)]
    permissions: Option<BTreeSet<String>>,
}

struct DecodedToken {
    header: TokenHeader,
    payload: TokenPayload,
}

#[derive(Debug, Error)]
#[error("unsupported signing algorithm: {0}")]
pub struct UnsupportedAlgorithm(pub String);

/// The single asymmetric algorithm tokens must be signed with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningAlgorithm {
    name: String,
    algorithm: Algorithm,
}

impl SigningAlgorithm {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }
}

impl FromStr for SigningAlgorithm {
    type Err = UnsupportedAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let algorithm = match s {
            "RS256" => Algorithm::RS256,
            "RS384" => Algorithm::RS384,
            "RS512" => Algorithm::RS512,
            "PS256" => Algorithm::PS256,
            "PS384" => Algorithm::PS384,
            "PS512" => Algorithm::PS512,
            "ES256" => Algorithm::ES256,
            "ES384" => Algorithm::ES384,
            "EdDSA" => Algorithm::EdDSA,
            // HS* would let anyone holding the public key mint tokens.
            _ => return Err(UnsupportedAlgorithm(s.to_string())),
        };

        Ok(Self {
            name: s.to_string(),
            algorithm,
        })
    }
}

/// Offline access-token verifier backed by the issuer's published keys.
#[derive(Debug)]
pub struct TokenVerifier {
    keys: Arc<KeySetCache>,
    algorithm: SigningAlgorithm,
    issuer: String,
    audience: String,
    leeway_seconds: i64,
}

impl TokenVerifier {
    pub fn new(
        keys: Arc<KeySetCache>,
        algorithm: SigningAlgorithm,
        issuer: impl Into<String>,
        audience: impl Into<String>,
        leeway_seconds: u64,
    ) -> Self {
        Self {
            keys,
            algorithm,
            issuer: issuer.into(),
            audience: audience.into(),
            leeway_seconds: i64::try_from(leeway_seconds).unwrap_or(i64::MAX),
        }
    }

    pub fn key_cache(&self) -> &Arc<KeySetCache> {
        &self.keys
    }

    /// Verify a compact JWS access token.
    ///
    /// Checks run in a fixed order and stop at the first failure:
    /// structure → `alg` → `kid`/key lookup → signature → `exp`/`nbf`/`iss`/`aud`.
    pub async fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let decoded = decode_segments(token)?;

        // Checked before any key lookup so `none`/HS* tokens never reach a verifier.
        if decoded.header.alg != self.algorithm.name() {
            debug!(alg = %decoded.header.alg, "token algorithm mismatch");
            return Err(AuthError::InvalidAlgorithm);
        }

        let kid = decoded
            .header
            .kid
            .as_deref()
            .ok_or(AuthError::InvalidTokenFormat)?;
        let key = self.keys.get_key(kid).await?;

        if let Some(key_alg) = key.algorithm()
            && key_alg != self.algorithm.name()
        {
            debug!(kid, key_alg, "key is published for a different algorithm");
            return Err(AuthError::InvalidAlgorithm);
        }

        self.verify_signature(token, key.decoding_key())
            .inspect_err(|err| debug!(kid = key.key_id(), code = err.code(), "signature check failed"))?;

        let now = chrono::Utc::now().timestamp();
        self.validate_claims(decoded.payload, now)
    }

    fn verify_signature(
        &self,
        token: &str,
        key: &jsonwebtoken::DecodingKey,
    ) -> Result<(), AuthError> {
        // jsonwebtoken only checks the signature here; claim checks are ours so each
        // failure keeps its own error kind.
        let mut validation = Validation::new(self.algorithm.algorithm());
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        jsonwebtoken::decode::<serde_json::Value>(token, key, &validation)
            .map(|_| ())
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                ErrorKind::InvalidAlgorithm => AuthError::InvalidAlgorithm,
                _ => {
                    debug!(error = %e, "token rejected during signature verification");
                    AuthError::InvalidTokenFormat
                }
            })
    }

    fn validate_claims(&self, payload: TokenPayload, now: i64) -> Result<Claims, AuthError> {
        let expires_at = payload.exp.ok_or(AuthError::TokenExpired)?;
        if expires_at.saturating_add(self.leeway_seconds) <= now {
            return Err(AuthError::TokenExpired);
        }

        if let Some(nbf) = payload.nbf
            && nbf > now.saturating_add(self.leeway_seconds)
        {
            return Err(AuthError::TokenNotYetValid);
        }

        let issuer = payload.iss.ok_or(AuthError::InvalidIssuer)?;
        if issuer != self.issuer {
            return Err(AuthError::InvalidIssuer);
        }

        let audience = payload.aud.map(Audience::into_vec).unwrap_or_default();
        if !audience.iter().any(|aud| *aud == self.audience) {
            return Err(AuthError::InvalidAudience);
        }

        let permissions_present = payload.permissions.is_some();

        Ok(Claims {
            issuer,
            audience,
            subject: payload.sub,
            expires_at,
            not_before: payload.nbf,
            issued_at: payload.iat,
            permissions: payload.permissions.unwrap_or_default(),
            permissions_present,
        })
    }
}

fn decode_segments(token: &str) -> Result<DecodedToken, AuthError> {
    let mut segments = token.split('.');
    let (Some(header), Some(payload), Some(signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(AuthError::InvalidTokenFormat);
    };

    let header = URL_SAFE_NO_PAD
        .decode(header)
        .map_err(|_| AuthError::InvalidTokenFormat)?;
    let payload = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|_| AuthError::InvalidTokenFormat)?;
    if signature.is_empty() || URL_SAFE_NO_PAD.decode(signature).is_err() {
        return Err(AuthError::InvalidTokenFormat);
    }

    let header: TokenHeader =
        serde_json::from_slice(&header).map_err(|_| AuthError::InvalidTokenFormat)?;
    let payload: TokenPayload =
        serde_json::from_slice(&payload).map_err(|_| AuthError::InvalidTokenFormat)?;

    Ok(DecodedToken { header, payload })
}
