use std::sync::Arc;

use app_core::boundary::method_not_allowed;
use app_core::identity::TokenVerifier;
use app_core::middleware::{RequiredRole, auth, require_role};
use axum::routing::{get, post};
use axum::{Router, middleware};
use tower_http::cors::CorsLayer;

use crate::inbound::http::authn::*;
use crate::inbound::http::index::*;
use crate::inbound::http::profile::*;
use crate::inbound::state::ProfileState;

/// Builds the feature routes. `cors` covers the `/api` routes only. When
/// `required_role` is set, the profile routes additionally demand that role;
/// the identity routes only need a valid token.
pub fn create_router(
    state: ProfileState,
    verifier: Arc<dyn TokenVerifier>,
    required_role: Option<RequiredRole>,
    cors: CorsLayer,
) -> Router {
    let mut profile_routes =
        Router::new().route("/api/profile", get(get_profile).put(update_profile).delete(delete_profile));

    if let Some(role) = required_role {
        profile_routes = profile_routes.route_layer(middleware::from_fn_with_state(role, require_role));
    }

    let protected_routes = Router::new()
        .merge(profile_routes)
        // authentication scope
        .route("/api/auth/verify", post(verify_auth))
        .route_layer(middleware::from_fn_with_state(verifier, auth));

    let api_routes = Router::new()
        // authentication scope
        .route("/api/auth/token", post(check_token))
        .merge(protected_routes)
        // Set before `cors` so preflights on these paths are answered by the layer.
        .method_not_allowed_fallback(method_not_allowed)
        .layer(cors);

    Router::new().route("/", get(index)).merge(api_routes).with_state(state)
}
