use axum::extract::State;
use axum::response::IntoResponse;
use axum::{Json, debug_handler};
use serde_json::json;

use crate::inbound::state::ProfileState;

#[debug_handler]
pub async fn index(State(state): State<ProfileState>) -> impl IntoResponse {
    Json(json!({
        "status": "running",
        "version": state.version.as_ref(),
        "message": "Profile API is running",
        "endpoints": {
            "verify": "POST /api/auth/verify",
            "token": "POST /api/auth/token",
            "profile": "GET|PUT|DELETE /api/profile",
        },
    }))
}
