//! Authentication HTTP handlers
//!
//! Thin layer over the session service: validate the request body, call the
//! flow, and wrap the result. All policy lives in the service.

use axum::{extract::State, http::StatusCode, Json};
use validator::Validate;

use crate::error::ApiResult;
use crate::handlers::AuthenticatedUser;
use crate::models::{
    AuthResponse, CurrentUserResponse, ForgotPasswordRequest, LoginRequest, LogoutRequest,
    MessageResponse, RefreshTokenRequest, RegisterRequest, ResetPasswordRequest,
    TokenRefreshResponse,
};
use crate::state::AppState;

/// POST /auth/register - Create an account and grant a session
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    req.validate()?;
    let response = state.auth_service.register(req).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /auth/login - Authenticate and grant a session
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    req.validate()?;
    let response = state.auth_service.login(req).await?;
    Ok(Json(response))
}

/// POST /auth/forgot-password - Mail a password-reset code
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    req.validate()?;
    let response = state.auth_service.forgot_password(req).await?;
    Ok(Json(response))
}

/// POST /auth/reset-password - Reset the password with a one-time code
pub async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    req.validate()?;
    let response = state.auth_service.reset_password(req).await?;
    Ok(Json(response))
}

/// POST /auth/refresh-token - Rotate a refresh token
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(req): Json<RefreshTokenRequest>,
) -> ApiResult<Json<TokenRefreshResponse>> {
    req.validate()?;
    let response = state.auth_service.refresh(req).await?;
    Ok(Json(response))
}

/// POST /auth/logout - Revoke the session behind a refresh token
pub async fn logout(
    State(state): State<AppState>,
    Json(req): Json<LogoutRequest>,
) -> ApiResult<Json<MessageResponse>> {
    req.validate()?;
    let response = state.auth_service.logout(req).await;
    Ok(Json(response))
}

/// POST /auth/logout-all - Revoke every session for the current account
pub async fn logout_all(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<MessageResponse>> {
    let response = state.auth_service.logout_all(user.0.id).await?;
    Ok(Json(response))
}

/// GET /auth/me - Get the current authenticated account
pub async fn current_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<CurrentUserResponse>> {
    let response = state.auth_service.current_user(user.0.id).await?;
    Ok(Json(response))
}
