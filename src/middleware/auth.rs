//! Authentication middleware
//!
//! Extractor that turns a Bearer access token into the active account
//! behind it, rejecting with the uniform error envelope otherwise.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
    response::{IntoResponse, Response},
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use std::sync::Arc;

use crate::auth::AuthService;
use crate::error::ApiError;
use crate::models::UserResponse;

/// Authenticated account extracted from the Authorization header.
///
/// Verification and the active-account check happen in the session service,
/// so a revoked secret or deactivated account is rejected here before any
/// handler runs.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub UserResponse);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<AuthService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| {
                    ApiError::Authentication("Access token is required".to_string())
                        .into_response()
                })?;

        let auth_service = Arc::<AuthService>::from_ref(state);

        let user = auth_service
            .verify_token_and_get_user(bearer.token())
            .await
            .map_err(|e| e.into_response())?;

        Ok(AuthenticatedUser(user))
    }
}
