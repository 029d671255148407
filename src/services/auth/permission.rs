use std::str::FromStr;

use crate::services::auth::{error::AuthError, verifier::Claims};

pub const GET_DRINKS_DETAIL: &str = "get:drinks-detail";
pub const POST_DRINKS: &str = "post:drinks";
pub const PATCH_DRINKS: &str = "patch:drinks";
pub const DELETE_DRINKS: &str = "delete:drinks";

/// What to do with a token that has no `permissions` claim at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingPermissions {
    /// Fail with `PermissionsClaimMissing`.
    #[default]
    Reject,
    /// Behave as if the claim were an empty list.
    TreatAsEmpty,
}

impl FromStr for MissingPermissions {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "empty" | "treat_as_empty" => Ok(Self::TreatAsEmpty),
            _ => Err(()),
        }
    }
}

/// Exact-match permission check. No wildcards, no prefixes.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissionChecker {
    missing: MissingPermissions,
}

impl PermissionChecker {
    pub fn new(missing: MissingPermissions) -> Self {
        Self { missing }
    }

    pub fn check(&self, claims: &Claims, required: &str) -> Result<(), AuthError> {
        if !claims.permissions_present() && self.missing == MissingPermissions::Reject {
            return Err(AuthError::PermissionsClaimMissing);
        }

        if !claims.has_permission(required) {
            return Err(AuthError::PermissionDenied);
        }

        Ok(())
    }
}
