//! Test helpers: Ed25519 token minting and in-memory key sources.
//!
//! Tokens are assembled by hand (`base64url(header).base64url(payload)` signed with
//! Ed25519) so tests can also craft tokens a real issuer would never produce.
use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use ed25519_dalek::{Signer, SigningKey as Ed25519Key};
use serde_json::{Value, json};

use crate::services::auth::{
    guard::AuthorizationGuard,
    key_cache::KeySetCache,
    key_set::KeySet,
    key_source::{KeySource, KeySourceError},
    permission::{MissingPermissions, PermissionChecker},
    verifier::{SigningAlgorithm, TokenVerifier},
};

pub const ISSUER: &str = "https://coffee-shop.test/";
pub const AUDIENCE: &str = "drinks";

pub fn b64url_json(value: &Value) -> String {
    URL_SAFE_NO_PAD.encode(serde_json::to_vec(value).unwrap())
}

pub fn now_unix() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Claims that pass every check for `ISSUER`/`AUDIENCE`.
pub fn valid_claims(permissions: &[&str]) -> Value {
    let now = now_unix();
    json!({
        "iss": ISSUER,
        "aud": AUDIENCE,
        "sub": "auth0|barista",
        "iat": now,
        "exp": now + 3600,
        "permissions": permissions,
    })
}

pub struct TestSigner {
    kid: String,
    key: Ed25519Key,
}

impl TestSigner {
    /// Deterministic key derived from `seed`.
    pub fn new(kid: &str, seed: u8) -> Self {
        Self {
            kid: kid.to_string(),
            key: Ed25519Key::from_bytes(&[seed; 32]),
        }
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    pub fn jwk(&self) -> Value {
        json!({
            "kty": "OKP",
            "crv": "Ed25519",
            "use": "sig",
            "alg": "EdDSA",
            "kid": self.kid,
            "x": URL_SAFE_NO_PAD.encode(self.key.verifying_key().to_bytes()),
        })
    }

    pub fn header(&self) -> Value {
        json!({ "alg": "EdDSA", "typ": "JWT", "kid": self.kid })
    }

    pub fn sign_with_header(&self, header: &Value, claims: &Value) -> String {
        let signing_input = format!("{}.{}", b64url_json(header), b64url_json(claims));
        let signature = self.key.sign(signing_input.as_bytes());
        format!(
            "{}.{}",
            signing_input,
            URL_SAFE_NO_PAD.encode(signature.to_bytes())
        )
    }

    pub fn sign(&self, claims: &Value) -> String {
        self.sign_with_header(&self.header(), claims)
    }
}

pub fn key_document(signers: &[&TestSigner]) -> Value {
    json!({ "keys": signers.iter().map(|s| s.jwk()).collect::<Vec<_>>() })
}

/// In-memory key source that counts fetches.
pub struct StaticKeySource {
    document: Mutex<Value>,
    fetches: AtomicUsize,
    failing: AtomicBool,
    delay: Option<Duration>,
}

impl StaticKeySource {
    pub fn new(document: Value) -> Self {
        Self {
            document: Mutex::new(document),
            fetches: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
            delay: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn publish(&self, document: Value) {
        *self.document.lock().unwrap() = document;
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeySource for StaticKeySource {
    async fn fetch(&self) -> Result<KeySet, KeySourceError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.load(Ordering::SeqCst) {
            return Err(KeySourceError::Status(reqwest::StatusCode::BAD_GATEWAY));
        }

        let document = self.document.lock().unwrap().clone();
        Ok(KeySet::from_value(document)?)
    }
}

/// EdDSA guard for `ISSUER`/`AUDIENCE` that trusts `signer` only.
pub fn eddsa_guard(signer: &TestSigner) -> Arc<AuthorizationGuard> {
    let source = Arc::new(StaticKeySource::new(key_document(&[signer])));
    let cache = KeySetCache::builder(source as Arc<dyn KeySource>).build();
    let algorithm = "EdDSA".parse::<SigningAlgorithm>().unwrap();
    let verifier = TokenVerifier::new(Arc::new(cache), algorithm, ISSUER, AUDIENCE, 0);

    Arc::new(AuthorizationGuard::new(
        verifier,
        PermissionChecker::new(MissingPermissions::Reject),
    ))
}
