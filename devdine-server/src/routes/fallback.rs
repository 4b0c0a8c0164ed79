//! Fallback routes.

use crate::error::AppError;

/// 404 fallback.
pub async fn notfound_404() -> AppError {
    AppError::not_found("Route does not exist")
}
