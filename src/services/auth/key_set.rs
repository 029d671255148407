//! Published signing keys (JWK Set, RFC 7517) as used by the verifier.
use std::{collections::HashMap, fmt, sync::Arc, time::Instant};

use jsonwebtoken::{DecodingKey, jwk::Jwk};
use serde::Deserialize;
use tracing::{debug, warn};

/// One verification key from the issuer's key document.
///
/// - Key material is intentionally not printable via Debug.
pub struct SigningKey {
    key_id: String,
    algorithm: Option<String>,
    decoding_key: DecodingKey,
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("key_id", &self.key_id)
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

impl SigningKey {
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// `alg` as declared by the key document, if any.
    pub fn algorithm(&self) -> Option<&str> {
        self.algorithm.as_deref()
    }

    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }
}

#[derive(Debug, Deserialize)]
struct KeyDocument {
    keys: Vec<serde_json::Value>,
}

/// Immutable snapshot of the issuer's keys, indexed by `kid`.
#[derive(Debug)]
pub struct KeySet {
    keys: HashMap<String, Arc<SigningKey>>,
    fetched_at: Instant,
}

impl KeySet {
    /// Parse a raw JWKS response body.
    pub fn parse(body: &[u8]) -> Result<Self, serde_json::Error> {
        let document: KeyDocument = serde_json::from_slice(body)?;
        Ok(Self::from_entries(document.keys))
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        let document: KeyDocument = serde_json::from_value(value)?;
        Ok(Self::from_entries(document.keys))
    }

    // Unusable entries are skipped, not fatal: one odd key must not take the others down.
    fn from_entries(entries: Vec<serde_json::Value>) -> Self {
        let mut keys = HashMap::with_capacity(entries.len());

        for entry in entries {
            let Some(kid) = entry.get("kid").and_then(|v| v.as_str()).map(str::to_owned) else {
                debug!("skipping jwk without kid");
                continue;
            };

            if let Some(key_use) = entry.get("use").and_then(|v| v.as_str())
                && key_use != "sig"
            {
                debug!(kid = %kid, key_use, "skipping non-signature jwk");
                continue;
            }

            let algorithm = entry.get("alg").and_then(|v| v.as_str()).map(str::to_owned);

            let decoding_key = match serde_json::from_value::<Jwk>(entry)
                .map_err(|e| e.to_string())
                .and_then(|jwk| DecodingKey::from_jwk(&jwk).map_err(|e| e.to_string()))
            {
                Ok(key) => key,
                Err(error) => {
                    warn!(kid = %kid, error = %error, "skipping unusable jwk");
                    continue;
                }
            };

            if keys.contains_key(&kid) {
                warn!(kid = %kid, "duplicate kid in key document, keeping the first");
                continue;
            }

            keys.insert(
                kid.clone(),
                Arc::new(SigningKey {
                    key_id: kid,
                    algorithm,
                    decoding_key,
                }),
            );
        }

        Self {
            keys,
            fetched_at: Instant::now(),
        }
    }

    pub fn get(&self, kid: &str) -> Option<Arc<SigningKey>> {
        self.keys.get(kid).cloned()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn fetched_at(&self) -> Instant {
        self.fetched_at
    }
}
