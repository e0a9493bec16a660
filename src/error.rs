use axum::{http::StatusCode, response::{IntoResponse, Json}};
use thiserror::Error;

use crate::domain::clone::CloneResponse;

pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("URL is required")]
    MissingUrl,
    #[error("{0}")]
    BadRequest(String),
    #[error("{0:#}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Status used when the service runs with strict status codes.
    pub fn strict_status(&self) -> StatusCode {
        match self {
            AppError::MissingUrl | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Lenient rendering: clients only ever look at the `error` field, so the
/// status stays 200. Handlers that run in strict mode pair the body with
/// `strict_status` themselves.
impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        if let AppError::Internal(e) = &self {
            tracing::error!(error = %format!("{e:#}"), "clone request failed");
        }
        (StatusCode::OK, Json(CloneResponse::failure(self.to_string()))).into_response()
    }
}
