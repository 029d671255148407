/*
 * Responsibility
 * - /drinks CRUD handlers
 * - Protected handlers call the AuthorizationGuard first, before touching the body or the repo
 */
use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::HeaderMap,
};
use tracing::info;

use crate::{
    api::dto::drinks::{
        CreateDrinkRequest, DeleteDrinkResponse, DrinkLong, DrinkShort, DrinksResponse,
        UpdateDrinkRequest,
    },
    error::AppError,
    services::auth::permission::{DELETE_DRINKS, GET_DRINKS_DETAIL, PATCH_DRINKS, POST_DRINKS},
    state::AppState,
};

pub async fn list_drinks(
    State(state): State<AppState>,
) -> Result<Json<DrinksResponse<DrinkShort>>, AppError> {
    let rows = state.drinks.list().await?;

    Ok(Json(DrinksResponse::new(
        rows.into_iter().map(DrinkShort::from).collect(),
    )))
}

pub async fn list_drink_details(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<DrinksResponse<DrinkLong>>, AppError> {
    state.guard.authorize(&headers, GET_DRINKS_DETAIL).await?;

    let rows = state.drinks.list().await?;

    Ok(Json(DrinksResponse::new(
        rows.into_iter().map(DrinkLong::from).collect(),
    )))
}

pub async fn create_drink(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<CreateDrinkRequest>, JsonRejection>,
) -> Result<Json<DrinksResponse<DrinkLong>>, AppError> {
    let claims = state.guard.authorize(&headers, POST_DRINKS).await?;

    let Json(req) = payload?;
    let (title, recipe) = req.validate().map_err(|_| AppError::Unprocessable)?;

    let row = state.drinks.create(&title, recipe).await?;
    info!(
        drink_id = row.id,
        subject = claims.subject.as_deref().unwrap_or("-"),
        "drink created"
    );

    Ok(Json(DrinksResponse::new(vec![DrinkLong::from(row)])))
}

pub async fn update_drink(
    State(state): State<AppState>,
    drink_id: Result<Path<i64>, PathRejection>,
    headers: HeaderMap,
    payload: Result<Json<UpdateDrinkRequest>, JsonRejection>,
) -> Result<Json<DrinksResponse<DrinkLong>>, AppError> {
    let claims = state.guard.authorize(&headers, PATCH_DRINKS).await?;

    let Json(req) = payload?;
    let Path(drink_id) = drink_id.map_err(|_| AppError::NotFound)?;
    req.validate().map_err(|_| AppError::Unprocessable)?;

    let row = state
        .drinks
        .update(
            drink_id,
            req.title.as_deref(),
            req.recipe.map(|recipe| recipe.into_parts()),
        )
        .await?
        .ok_or(AppError::NotFound)?;
    info!(
        drink_id,
        subject = claims.subject.as_deref().unwrap_or("-"),
        "drink updated"
    );

    Ok(Json(DrinksResponse::new(vec![DrinkLong::from(row)])))
}

pub async fn delete_drink(
    State(state): State<AppState>,
    drink_id: Result<Path<i64>, PathRejection>,
    headers: HeaderMap,
) -> Result<Json<DeleteDrinkResponse>, AppError> {
    let claims = state.guard.authorize(&headers, DELETE_DRINKS).await?;

    let Path(drink_id) = drink_id.map_err(|_| AppError::NotFound)?;

    if !state.drinks.delete(drink_id).await? {
        return Err(AppError::NotFound);
    }
    info!(
        drink_id,
        subject = claims.subject.as_deref().unwrap_or("-"),
        "drink deleted"
    );

    Ok(Json(DeleteDrinkResponse {
        success: true,
        deleted: drink_id,
    }))
}
