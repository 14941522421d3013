//! Defines application-specific Axum middleware.

use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Request, StatusCode, header};
use axum::middleware::Next;
use axum::response::Response;

use super::error::AppError;
use super::identity::{TokenVerifier, VerifiedIdentity};

const REQUEST_ID_HEADER: &str = "x-request-id";

/// The identity attached by [`auth`]. Fails with `401` on routes that are not
/// behind the auth guard.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub VerifiedIdentity);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<VerifiedIdentity>().cloned().map(CurrentUser).ok_or_else(|| {
            tracing::warn!("Identity requested on a request that was not authenticated");
            AppError::Unauthorized("Authentication required".to_string())
        })
    }
}

/// Resolves the bearer credential to a [`VerifiedIdentity`] and attaches it to
/// the request. A header without the `Bearer ` prefix is used verbatim.
pub async fn auth(
    State(verifier): State<Arc<dyn TokenVerifier>>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(req.headers())?;

    let identity = verifier.verify(&token).await?;
    tracing::info!(uid = %identity.uid, "User authenticated");

    req.extensions_mut().insert(identity);

    Ok(next.run(req).await)
}

fn bearer_token(headers: &HeaderMap) -> Result<String, AppError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        tracing::warn!("Missing authorization header");
        return Err(AppError::Unauthorized("Missing authorization header".to_string()));
    };

    let value = value.to_str().map_err(|_| {
        tracing::warn!("Authorization header is not valid UTF-8");
        AppError::Unauthorized("Invalid authentication token".to_string())
    })?;

    Ok(value.strip_prefix("Bearer ").unwrap_or(value).to_string())
}

#[derive(Debug, Clone)]
pub struct RequiredRole(pub Arc<str>);

impl RequiredRole {
    pub fn new(role: impl Into<Arc<str>>) -> Self {
        Self(role.into())
    }
}

/// Must be layered inside [`auth`]; it only reads the attached identity.
pub async fn require_role(
    State(RequiredRole(role)): State<RequiredRole>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let Some(identity) = req.extensions().get::<VerifiedIdentity>() else {
        tracing::warn!("Role check requested on a request that was not authenticated");
        return Err(AppError::Unauthorized("Authentication required".to_string()));
    };

    if !identity.has_role(&role) {
        tracing::warn!(uid = %identity.uid, role = %role, "User lacks the required role");
        return Err(AppError::Forbidden(format!("This action requires the '{role}' role")));
    }

    Ok(next.run(req).await)
}

pub async fn request_response_logger(mut req: Request<Body>, next: Next) -> Result<Response, StatusCode> {
    let start_time = Instant::now();
    let method = req.method().clone();
    let uri = req.uri().clone();
    let version = req.version();

    let c_id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|id| id.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    req.extensions_mut().insert(c_id.clone());

    tracing::info!(
        _cID = c_id,
        method = %method,
        uri = %uri,
        version = ?version,
        "Incoming request"
    );

    let mut response = next.run(req).await;

    let duration = start_time.elapsed();
    let status = response.status();

    response.headers_mut().insert(
        HeaderName::from_static(REQUEST_ID_HEADER),
        HeaderValue::from_str(c_id.as_str()).unwrap_or_else(|_| HeaderValue::from_static("invalid-correlation-id")),
    );

    if status.is_server_error() {
        tracing::error!(
            _cID = c_id,
            method = %method,
            uri = %uri,
            status = %status,
            duration_ms = duration.as_millis(),
            "Request completed with server error"
        );
    } else if status.is_client_error() {
        tracing::warn!(
            _cID = c_id,
            method = %method,
            uri = %uri,
            status = %status,
            duration_ms = duration.as_millis(),
            "Request completed with client error"
        );
    } else {
        tracing::info!(
            _cID = c_id,
            method = %method,
            uri = %uri,
            status = %status,
            duration_ms = duration.as_millis(),
            "Request completed successfully"
        );
    }

    Ok(response)
}
