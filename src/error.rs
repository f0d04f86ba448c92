use axum::{
    http::{header, StatusCode},
    response::{AppendHeaders, Html, IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use crate::web::{clear_cookie, flash::FLASH_COOKIE, views};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Username already exists. Please choose another one.")]
    DuplicateUsername,

    #[error("Invalid username or password.")]
    InvalidCredentials,

    #[error("Username is required.")]
    MissingCredentials,

    #[error("Invalid amount: {0:?}")]
    InvalidAmount(String),

    #[error("Not found")]
    NotFound,

    #[error("storage failure: {0}")]
    StorageFailure(anyhow::Error),

    #[error("internal error: {0}")]
    Internal(anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::StorageFailure(err.into())
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::DuplicateUsername => StatusCode::CONFLICT,
            AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::MissingCredentials | AppError::InvalidAmount(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::StorageFailure(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            AppError::StorageFailure(e) => {
                error!(error = %e, "storage failure");
                "Internal server error".to_string()
            }
            AppError::Internal(e) => {
                error!(error = %e, "internal error");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        // expire any pending notice along with the error page
        (
            status,
            AppendHeaders([(header::SET_COOKIE, clear_cookie(FLASH_COOKIE))]),
            Html(views::error_page(status, &message)),
        )
            .into_response()
    }
}
