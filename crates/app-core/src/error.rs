//! A centralized and idiomatic error handling module for the Axum web
//! application.
//!
//! Every failure that reaches a client is rendered by [`AppError`] into the
//! same JSON shape: `{error, message, status_code, details?}`.

use std::fmt::Debug;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::{Map, Value, json};
use thiserror::Error;

use super::config::ConfigError;
use super::identity::TokenError;

pub const INTERNAL_ERROR_MSG: &str = "An internal server error occurred";
pub const DATABASE_ERROR_MSG: &str = "A database error occurred";
pub const VALIDATION_ERROR_MSG: &str = "Invalid input data";
pub const EXTERNAL_SERVICE_ERROR_MSG: &str = "Failed to communicate with the authentication service";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Validation failed")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("Database operation failed: {0}")]
    Database(String),

    #[error("External service failed: {0}")]
    ExternalService(String),

    /// A failure raised by the HTTP framework itself (rejections, fallbacks,
    /// layers) rather than by application code.
    #[error("{message}")]
    Http { status: StatusCode, message: String },

    // Internal Libraries
    #[error("Config operation failed")]
    Config(#[from] ConfigError),

    #[error("An internal server error occurred")]
    Internal,
}

impl AppError {
    /// Logs the underlying cause and returns a `Database` error whose message
    /// is safe to show to clients.
    pub fn database<E: Debug>(message: &str, err: E) -> Self {
        tracing::error!("Database error: {:?}", err);
        AppError::Database(message.to_string())
    }

    pub fn http(status: StatusCode, message: impl Into<String>) -> Self {
        AppError::Http { status, message: message.into() }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::RateLimit(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ExternalService(_) => StatusCode::BAD_GATEWAY,
            AppError::Http { status, .. } => *status,
            AppError::Config(_) | AppError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable error code placed in the `error` field.
    pub fn error_code(&self) -> String {
        match self {
            AppError::BadRequest(_) => "bad_request".to_string(),
            AppError::Unauthorized(_) => "unauthorized".to_string(),
            AppError::Forbidden(_) => "forbidden".to_string(),
            AppError::NotFound(_) => "not_found".to_string(),
            AppError::Validation(_) => "validation_error".to_string(),
            AppError::RateLimit(_) => "rate_limit_exceeded".to_string(),
            AppError::Database(_) => "database_error".to_string(),
            AppError::ExternalService(_) => "external_service_error".to_string(),
            AppError::Http { status, .. } => http_error_code(*status),
            AppError::Config(_) | AppError::Internal => "internal_error".to_string(),
        }
    }
}

/// Derives a lower-snake-case code from the status' canonical reason, e.g.
/// `405 Method Not Allowed` becomes `method_not_allowed`.
pub fn http_error_code(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map(|reason| reason.to_lowercase().replace([' ', '-'], "_"))
        .unwrap_or_else(|| format!("http_{}", status.as_u16()))
}

/// Flattens validator output into `field -> [message, ...]`.
fn field_messages(errors: &validator::ValidationErrors) -> Map<String, Value> {
    errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let messages = errs
                .iter()
                .map(|e| Value::String(e.message.as_ref().map(|m| m.to_string()).unwrap_or_else(|| e.code.to_string())))
                .collect();
            (field.to_string(), Value::Array(messages))
        })
        .collect()
}

impl From<sea_orm::DbErr> for AppError {
    fn from(err: sea_orm::DbErr) -> Self {
        AppError::database(DATABASE_ERROR_MSG, err)
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Invalid(reason) => {
                tracing::warn!(reason = %reason, "Invalid authentication token");
                AppError::Unauthorized("Invalid authentication token".to_string())
            },
            TokenError::Expired => {
                tracing::warn!("Expired authentication token");
                AppError::Unauthorized("Authentication token has expired".to_string())
            },
            TokenError::Revoked => {
                tracing::warn!("Revoked authentication token");
                AppError::Unauthorized("Authentication token has been revoked".to_string())
            },
            TokenError::CertificateFetch(reason) => {
                tracing::error!(reason = %reason, "Failed to fetch identity provider certificates");
                AppError::ExternalService(EXTERNAL_SERVICE_ERROR_MSG.to_string())
            },
            TokenError::Other(reason) => {
                tracing::error!(reason = %reason, "Authentication error");
                AppError::Unauthorized(format!("Authentication error: {reason}"))
            },
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    status_code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error = self.error_code();

        let (message, details) = match self {
            AppError::Validation(err) => {
                (VALIDATION_ERROR_MSG.to_string(), Some(json!({ "errors": field_messages(&err) })))
            },
            AppError::BadRequest(msg)
            | AppError::Unauthorized(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::RateLimit(msg)
            | AppError::Database(msg)
            | AppError::ExternalService(msg) => (msg, None),
            AppError::Http { message, .. } => (message, None),

            // Internal Libraries
            AppError::Config(err) => {
                tracing::error!("Config getter error: {:?}", err);
                (INTERNAL_ERROR_MSG.to_string(), None)
            },
            AppError::Internal => (INTERNAL_ERROR_MSG.to_string(), None),
        };

        (status, Json(ErrorResponse { error, message, status_code: status.as_u16(), details })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use sea_orm::DbErr;
    use serde_json::Value;
    use validator::{ValidationError, ValidationErrors};

    use super::*;

    /// Helper function to extract JSON response body from an Axum response
    async fn extract_json_response(response: Response<Body>) -> (StatusCode, Value) {
        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read response body");
        let json: Value = serde_json::from_slice(&body_bytes).expect("Failed to parse JSON response");
        (status, json)
    }

    fn create_validation_errors() -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        let mut name_error = ValidationError::new("length");
        name_error.message = Some("Length must be between 1 and 100.".into());
        errors.add("display_name", name_error);

        let mut website_error = ValidationError::new("length");
        website_error.message = Some("Longer than maximum length 255.".into());
        errors.add("website", website_error);

        errors
    }

    #[tokio::test]
    async fn test_taxonomy_status_and_codes() {
        let cases = vec![
            (AppError::BadRequest("no data".into()), StatusCode::BAD_REQUEST, "bad_request"),
            (AppError::Unauthorized("no token".into()), StatusCode::UNAUTHORIZED, "unauthorized"),
            (AppError::Forbidden("no role".into()), StatusCode::FORBIDDEN, "forbidden"),
            (AppError::NotFound("missing".into()), StatusCode::NOT_FOUND, "not_found"),
            (AppError::RateLimit("slow down".into()), StatusCode::TOO_MANY_REQUESTS, "rate_limit_exceeded"),
            (AppError::Database("write failed".into()), StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
            (AppError::ExternalService("down".into()), StatusCode::BAD_GATEWAY, "external_service_error"),
        ];

        for (error, expected_status, expected_code) in cases {
            let message = match &error {
                AppError::BadRequest(m)
                | AppError::Unauthorized(m)
                | AppError::Forbidden(m)
                | AppError::NotFound(m)
                | AppError::RateLimit(m)
                | AppError::Database(m)
                | AppError::ExternalService(m) => m.clone(),
                _ => unreachable!(),
            };

            let (status, json) = extract_json_response(error.into_response()).await;

            assert_eq!(status, expected_status);
            assert_eq!(json["error"], expected_code);
            assert_eq!(json["message"], message);
            assert_eq!(json["status_code"], expected_status.as_u16());
            assert!(json.get("details").is_none());
        }
    }

    #[tokio::test]
    async fn test_validation_error() {
        let error = AppError::Validation(create_validation_errors());
        let (status, json) = extract_json_response(error.into_response()).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json["error"], "validation_error");
        assert_eq!(json["message"], VALIDATION_ERROR_MSG);
        assert_eq!(json["status_code"], 422);

        let errors = &json["details"]["errors"];
        assert_eq!(errors["display_name"][0], "Length must be between 1 and 100.");
        assert_eq!(errors["website"][0], "Longer than maximum length 255.");
    }

    #[tokio::test]
    async fn test_validation_error_without_message_uses_code() {
        let mut errors = ValidationErrors::new();
        errors.add("bio", ValidationError::new("length"));

        let (_, json) = extract_json_response(AppError::Validation(errors).into_response()).await;

        assert_eq!(json["details"]["errors"]["bio"][0], "length");
    }

    #[tokio::test]
    async fn test_http_error_uses_normalized_code() {
        let error = AppError::http(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed");
        let (status, json) = extract_json_response(error.into_response()).await;

        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(json["error"], "method_not_allowed");
        assert_eq!(json["message"], "Method not allowed");
        assert_eq!(json["status_code"], 405);
    }

    #[test]
    fn test_http_error_code() {
        assert_eq!(http_error_code(StatusCode::NOT_FOUND), "not_found");
        assert_eq!(http_error_code(StatusCode::REQUEST_TIMEOUT), "request_timeout");
        assert_eq!(http_error_code(StatusCode::UNSUPPORTED_MEDIA_TYPE), "unsupported_media_type");
        assert_eq!(http_error_code(StatusCode::from_u16(599).unwrap()), "http_599");
    }

    #[tokio::test]
    async fn test_database_error_hides_cause() {
        let error = AppError::from(DbErr::Custom("relation \"user_profiles\" does not exist".into()));
        let (status, json) = extract_json_response(error.into_response()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "database_error");
        assert_eq!(json["message"], DATABASE_ERROR_MSG);
        assert!(!json.to_string().contains("user_profiles"));
    }

    #[tokio::test]
    async fn test_config_error_is_masked() {
        let error = AppError::Config(ConfigError::LockPoisoned);
        let (status, json) = extract_json_response(error.into_response()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "internal_error");
        assert_eq!(json["message"], INTERNAL_ERROR_MSG);
    }

    #[tokio::test]
    async fn test_internal_error() {
        let (status, json) = extract_json_response(AppError::Internal.into_response()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "internal_error");
        assert_eq!(json["message"], INTERNAL_ERROR_MSG);
        assert!(json.get("details").is_none());
    }

    #[test]
    fn test_token_errors_map_to_taxonomy() {
        let cases = vec![
            (TokenError::Invalid("bad kid".into()), StatusCode::UNAUTHORIZED, "Invalid authentication token"),
            (TokenError::Expired, StatusCode::UNAUTHORIZED, "Authentication token has expired"),
            (TokenError::Revoked, StatusCode::UNAUTHORIZED, "Authentication token has been revoked"),
            (TokenError::CertificateFetch("timeout".into()), StatusCode::BAD_GATEWAY, EXTERNAL_SERVICE_ERROR_MSG),
            (TokenError::Other("boom".into()), StatusCode::UNAUTHORIZED, "Authentication error: boom"),
        ];

        for (token_error, expected_status, expected_message) in cases {
            let error = AppError::from(token_error);
            assert_eq!(error.status_code(), expected_status);
            match error {
                AppError::Unauthorized(msg) | AppError::ExternalService(msg) => assert_eq!(msg, expected_message),
                other => panic!("unexpected error kind: {other:?}"),
            }
        }
    }
}
