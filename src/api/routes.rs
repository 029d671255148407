/*
 * Responsibility
 * - URL layout of the drinks API
 * - /drinks is public; everything else is guarded per handler (see handlers::drinks)
 */
use axum::{
    Router,
    routing::{get, patch},
};

use crate::api::handlers::{
    drinks::{create_drink, delete_drink, list_drink_details, list_drinks, update_drink},
    health::health,
};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/drinks", get(list_drinks).post(create_drink))
        .route("/drinks-detail", get(list_drink_details))
        .route("/drinks/{drink_id}", patch(update_drink).delete(delete_drink))
}
