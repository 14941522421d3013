use app_core::error::AppError;
use app_core::extractors::AppJson;
use app_core::middleware::CurrentUser;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::{Json, debug_handler};
use serde_json::Value;

use crate::domain::inout::prelude::*;
use crate::inbound::model::prelude::*;
use crate::inbound::state::ProfileState;

#[debug_handler]
pub async fn get_profile(
    State(state): State<ProfileState>,
    CurrentUser(identity): CurrentUser,
) -> impl IntoResponse {
    state
        .profile
        .get_profile(GetProfileInput { external_uid: identity.uid })
        .await
        .map(|output| {
            Json(GetProfileResponse {
                success: true,
                profile: output.profile.into(),
                message: output.created.then_some("Profile created"),
            })
        })
}

#[debug_handler]
pub async fn update_profile(
    State(state): State<ProfileState>,
    CurrentUser(identity): CurrentUser,
    AppJson(body): AppJson<Value>,
) -> Result<Json<UpdateProfileResponse>, AppError> {
    let input = UpdateProfileRequest(body).into_input(identity.uid)?;

    state
        .profile
        .update_profile(input)
        .await
        .map(|output| {
            Json(UpdateProfileResponse { success: true, profile: output.profile.into(), message: "Profile updated" })
        })
}

#[debug_handler]
pub async fn delete_profile(
    State(state): State<ProfileState>,
    CurrentUser(identity): CurrentUser,
) -> impl IntoResponse {
    state
        .profile
        .delete_profile(DeleteProfileInput { external_uid: identity.uid })
        .await
        .map(|output| Json(DeleteProfileResponse { success: output.success, message: "Profile deleted" }))
}
