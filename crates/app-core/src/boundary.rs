//! The outermost error boundary: every response that leaves the service is
//! either a success or the uniform [`AppError`] JSON body.

use std::any::Any;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use tower_http::catch_panic::CatchPanicLayer;

use super::error::AppError;

const NOT_FOUND_MSG: &str = "The requested URL was not found on the server";
const METHOD_NOT_ALLOWED_MSG: &str = "The method is not allowed for the requested URL";
const REQUEST_TIMEOUT_MSG: &str = "The server timed out waiting for the request";
// Framework error bodies above this size are replaced by the canonical reason.
const MAX_FRAMEWORK_BODY: usize = 16 * 1024;

pub async fn not_found() -> AppError {
    AppError::http(StatusCode::NOT_FOUND, NOT_FOUND_MSG)
}

pub async fn method_not_allowed() -> AppError {
    AppError::http(StatusCode::METHOD_NOT_ALLOWED, METHOD_NOT_ALLOWED_MSG)
}

/// Panic handler for [`CatchPanicLayer`]. The payload is logged, never sent.
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };

    tracing::error!(panic = %detail, "Request handler panicked");

    AppError::Internal.into_response()
}

/// Rewrites error responses that were not produced by [`AppError`] (axum
/// rejections, layer errors such as timeouts) into the uniform JSON body.
pub async fn normalize_errors(req: Request<Body>, next: Next) -> Response {
    let response = next.run(req).await;
    let status = response.status();

    if !(status.is_client_error() || status.is_server_error()) || is_json(&response) {
        return response;
    }

    let (parts, body) = response.into_parts();
    let text = axum::body::to_bytes(body, MAX_FRAMEWORK_BODY)
        .await
        .ok()
        .and_then(|bytes| String::from_utf8(bytes.to_vec()).ok())
        .map(|text| text.trim().to_string())
        .unwrap_or_default();

    let error = if status.is_server_error() && status != StatusCode::BAD_GATEWAY {
        tracing::error!(status = %status, body = %text, "Unstructured server error response");
        AppError::Internal
    } else {
        AppError::http(status, framework_message(status, text))
    };

    let mut normalized = error.into_response();
    if let Some(allow) = parts.headers.get(header::ALLOW) {
        normalized.headers_mut().insert(header::ALLOW, allow.clone());
    }
    normalized
}

fn framework_message(status: StatusCode, body: String) -> String {
    match status {
        StatusCode::NOT_FOUND if body.is_empty() => NOT_FOUND_MSG.to_string(),
        StatusCode::METHOD_NOT_ALLOWED if body.is_empty() => METHOD_NOT_ALLOWED_MSG.to_string(),
        StatusCode::REQUEST_TIMEOUT => REQUEST_TIMEOUT_MSG.to_string(),
        _ if body.is_empty() => status.canonical_reason().unwrap_or("Error").to_string(),
        _ => body,
    }
}

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"))
}

/// Installs the fallbacks, the error normalizer and the panic catcher. Call it
/// last so the boundary wraps every other layer.
pub fn with_error_boundary<S>(router: Router<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .layer(middleware::from_fn(normalize_errors))
        .layer(CatchPanicLayer::custom(handle_panic))
}
