/*
 * Responsibility
 * - App-wide ApiError definition
 * - IntoResponse: HTTP status + `{ "success": false, "error": <status>, "message": ... }`
 * - Unifies repo errors, JSON body rejections and authorization errors
 */
use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::repos::error::RepoError;
use crate::services::auth::AuthError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: u16,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("bad request")]
    BadRequest,
    #[error("resource not found")]
    NotFound,
    #[error("payload too large")]
    PayloadTooLarge,
    #[error("unprocessable")]
    Unprocessable,
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("request timeout")]
    Timeout,
    #[error("internal server")]
    Internal,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Unprocessable => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Auth(e) => e.status_code(),
            AppError::Timeout => StatusCode::REQUEST_TIMEOUT,
            AppError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = ErrorResponse {
            success: false,
            error: status.as_u16(),
            message: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<RepoError> for AppError {
    fn from(e: RepoError) -> Self {
        match e {
            // Unique title violation
            RepoError::Conflict => AppError::Unprocessable,
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(e: JsonRejection) -> Self {
        match e {
            // Well-formed JSON of the wrong shape
            JsonRejection::JsonDataError(_) => AppError::Unprocessable,
            // Body cut off by the request size limit
            e if e.status() == StatusCode::PAYLOAD_TOO_LARGE => AppError::PayloadTooLarge,
            // Missing content type, syntax errors, unreadable body
            _ => AppError::BadRequest,
        }
    }
}
