pub mod error;
pub mod extractor;
pub mod factory;
pub mod guard;
pub mod key_cache;
pub mod key_set;
pub mod key_source;
pub mod permission;
pub mod verifier;

#[cfg(test)]
pub mod testutil;

pub use error::AuthError;
pub use factory::build_authorization_guard;
pub use guard::AuthorizationGuard;
pub use key_cache::KeySetCache;
pub use permission::PermissionChecker;
pub use verifier::{Claims, TokenVerifier};
