/*
 * Responsibility
 * - Shared context bound to the Router (AppState)
 *   - guard: bearer token authorization, drinks: storage
 * - Cheap to clone (everything behind Arc)
 */
use std::sync::Arc;

use crate::repos::drink_repo::DrinkRepo;
use crate::services::auth::AuthorizationGuard;

#[derive(Clone)]
pub struct AppState {
    pub guard: Arc<AuthorizationGuard>,
    pub drinks: Arc<dyn DrinkRepo>,
}

impl AppState {
    pub fn new(guard: Arc<AuthorizationGuard>, drinks: Arc<dyn DrinkRepo>) -> Self {
        Self { guard, drinks }
    }
}
