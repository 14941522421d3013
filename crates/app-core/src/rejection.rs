//! Maps Axum's extractor rejections onto [`AppError`].

use axum::extract::rejection::JsonRejection;

use super::error::AppError;

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(status = %rejection.status(), "Rejected request body: {}", rejection.body_text());
        match rejection {
            JsonRejection::MissingJsonContentType(_) => {
                AppError::BadRequest("Request body must be JSON with a `Content-Type: application/json` header".into())
            },
            other => AppError::BadRequest(other.body_text()),
        }
    }
}
