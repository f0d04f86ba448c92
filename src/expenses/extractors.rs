use axum::{
    async_trait,
    extract::{FromRequestParts, Path},
    http::request::Parts,
};
use tracing::debug;

use crate::error::AppError;

/// Expense id taken from the path. A segment that is not an integer names no
/// expense, so it is rejected as not found.
#[derive(Debug, Clone, Copy)]
pub struct ExpenseId(pub i64);

#[async_trait]
impl<S> FromRequestParts<S> for ExpenseId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| {
                debug!(error = %e, "expense id missing from path");
                AppError::NotFound
            })?;
        raw.parse::<i64>().map(ExpenseId).map_err(|_| {
            debug!(%raw, "expense id is not an integer");
            AppError::NotFound
        })
    }
}
