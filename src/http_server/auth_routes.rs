//! Auth HTTP Routes
//!
//! Sign-in and current-user lookup for the back office.

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};

use super::errors::ApiResult;
use super::response::ApiResponse;
use super::state::{AppState, Session};
use crate::auth::{LoginRequest, LoginResponse, Profile};

/// Routes nested under `/api/auth`
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login_handler))
        .route("/user", get(get_user_handler))
}

async fn login_handler(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<ApiResponse<LoginResponse>> {
    let Json(request) = payload?;
    let login = state.auth.sign_in(&request.email, &request.password).await?;
    Ok(ApiResponse::ok(login).with_message("Signed in"))
}

async fn get_user_handler(Session(profile): Session) -> ApiResult<ApiResponse<Profile>> {
    Ok(ApiResponse::ok(profile))
}
