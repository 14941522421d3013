use app_core::middleware::CurrentUser;
use axum::body::Bytes;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::{Json, debug_handler};

use crate::domain::inout::prelude::*;
use crate::inbound::model::prelude::*;
use crate::inbound::state::ProfileState;

/// The auth guard has already verified the bearer token.
#[debug_handler(state = ProfileState)]
pub async fn verify_auth(CurrentUser(identity): CurrentUser) -> impl IntoResponse {
    Json(VerifyAuthResponse { authenticated: true, user: identity.into() })
}

#[debug_handler]
pub async fn check_token(State(state): State<ProfileState>, body: Bytes) -> impl IntoResponse {
    let req = CheckTokenRequest::from_bytes(&body);

    state
        .authn
        .verify_token(VerifyTokenInput { token: req.token })
        .await
        .map(|output| Json(CheckTokenResponse { valid: true, user: output.identity.into() }))
}
