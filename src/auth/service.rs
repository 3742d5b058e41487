//! Session service
//!
//! Orchestrates register, login, refresh, password reset, and logout over
//! the credential hasher, token codec, token store, OTP manager, and
//! notifier. This is the only surface the HTTP layer calls into.
//!
//! Error policy: expected outcomes (authentication, conflict, not-found,
//! validation) pass through unchanged; anything unexpected is logged and
//! re-wrapped as a flow-specific `BadRequest` so internal detail never
//! reaches the caller.

use chrono::{Duration, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::email::{templates, Notifier};
use crate::error::{ApiError, ApiResult};
use crate::models::{
    AuthData, AuthResponse, CurrentUserData, CurrentUserResponse, ForgotPasswordRequest,
    LoginRequest, LogoutRequest, MessageResponse, RefreshTokenRequest, RegisterRequest,
    ResetPasswordRequest, TokenData, TokenRefreshResponse, User, UserResponse,
};

use super::jwt::{JwtError, TokenCodec, TokenPair};
use super::otp::{self, OtpError, OtpManager};
use super::password::{PasswordError, PasswordHasher};
use super::token_store::{TokenStore, TokenStoreError};

const INVALID_CREDENTIALS: &str = "Invalid email or password";
const ACCOUNT_DEACTIVATED: &str = "Account is deactivated";
const INVALID_REFRESH_TOKEN: &str = "Invalid refresh token";
const FORGOT_PASSWORD_MESSAGE: &str =
    "If an account with this email exists, a password reset code has been sent";

impl From<PasswordError> for ApiError {
    fn from(e: PasswordError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl From<TokenStoreError> for ApiError {
    fn from(e: TokenStoreError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl From<OtpError> for ApiError {
    fn from(e: OtpError) -> Self {
        match e {
            OtpError::InvalidOrExpired => {
                ApiError::Authentication("Invalid or expired OTP".to_string())
            }
            OtpError::Database(e) => ApiError::Internal(e.to_string()),
        }
    }
}

/// Re-wrap unexpected internal failures with a flow-specific message,
/// letting expected error kinds through unchanged.
fn wrap_unexpected(err: ApiError, flow_message: &str) -> ApiError {
    match err {
        ApiError::Internal(detail) => {
            tracing::error!(error = %detail, flow = %flow_message, "Flow failed unexpectedly");
            ApiError::BadRequest(flow_message.to_string())
        }
        expected => expected,
    }
}

/// Session service with injected collaborators
pub struct AuthService {
    pool: PgPool,
    hasher: PasswordHasher,
    codec: TokenCodec,
    tokens: TokenStore,
    otp: OtpManager,
    mailer: Arc<dyn Notifier>,
}

impl AuthService {
    pub fn new(
        pool: PgPool,
        hasher: PasswordHasher,
        codec: TokenCodec,
        otp_ttl_seconds: i64,
        mailer: Arc<dyn Notifier>,
    ) -> Self {
        let tokens = TokenStore::new(pool.clone());
        let otp = OtpManager::new(pool.clone(), otp_ttl_seconds);
        Self {
            pool,
            hasher,
            codec,
            tokens,
            otp,
            mailer,
        }
    }

    // ------------------------------------------------------------------
    // Flows
    // ------------------------------------------------------------------

    /// Register a new account and grant it a session
    pub async fn register(&self, req: RegisterRequest) -> ApiResult<AuthResponse> {
        self.register_flow(req)
            .await
            .map_err(|e| wrap_unexpected(e, "Registration failed"))
    }

    async fn register_flow(&self, req: RegisterRequest) -> ApiResult<AuthResponse> {
        // Email is checked first, so an email collision is reported even
        // when the username collides too.
        if self.find_user_by_email(&req.email).await?.is_some() {
            return Err(ApiError::Conflict("Email already registered".to_string()));
        }

        let username_taken: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
                .bind(&req.username)
                .fetch_one(&self.pool)
                .await?;

        if username_taken {
            return Err(ApiError::Conflict("Username already taken".to_string()));
        }

        let password_hash = self.hasher.hash(&req.password)?;

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: req.email,
            username: req.username,
            password_hash,
            first_name: req.first_name,
            last_name: req.last_name,
            is_active: true,
            email_verified: false,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO users (id, email, username, password_hash, first_name, last_name,
                               is_active, email_verified, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.is_active)
        .bind(user.email_verified)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        let pair = self.grant_session(&user).await?;

        let (subject, html) = templates::welcome(&user.username);
        self.notify(&user.email, &subject, &html).await;

        tracing::info!(user_id = %user.id, "Account registered");

        Ok(AuthResponse {
            success: true,
            data: AuthData {
                user: user.into(),
                access_token: pair.access_token,
                refresh_token: pair.refresh_token,
            },
        })
    }

    /// Authenticate with email and password and grant a session
    pub async fn login(&self, req: LoginRequest) -> ApiResult<AuthResponse> {
        self.login_flow(req)
            .await
            .map_err(|e| wrap_unexpected(e, "Login failed"))
    }

    async fn login_flow(&self, req: LoginRequest) -> ApiResult<AuthResponse> {
        let user = self.find_user_by_email(&req.email).await?;

        // Unknown email and wrong password are indistinguishable.
        let Some(mut user) = user else {
            return Err(ApiError::Authentication(INVALID_CREDENTIALS.to_string()));
        };

        if !self.hasher.verify(&req.password, &user.password_hash)? {
            return Err(ApiError::Authentication(INVALID_CREDENTIALS.to_string()));
        }

        // Checked after the password: a wrong password on a deactivated
        // account still gets the generic message.
        if !user.is_active {
            return Err(ApiError::Authentication(ACCOUNT_DEACTIVATED.to_string()));
        }

        let now = Utc::now();
        sqlx::query("UPDATE users SET last_login_at = $1, updated_at = $1 WHERE id = $2")
            .bind(now)
            .bind(user.id)
            .execute(&self.pool)
            .await?;
        user.last_login_at = Some(now);
        user.updated_at = now;

        let pair = self.grant_session(&user).await?;

        tracing::info!(user_id = %user.id, "Login succeeded");

        Ok(AuthResponse {
            success: true,
            data: AuthData {
                user: user.into(),
                access_token: pair.access_token,
                refresh_token: pair.refresh_token,
            },
        })
    }

    /// Start a password reset by mailing a one-time code
    pub async fn forgot_password(&self, req: ForgotPasswordRequest) -> ApiResult<MessageResponse> {
        self.forgot_password_flow(req)
            .await
            .map_err(|e| wrap_unexpected(e, "Failed to process password reset request"))
    }

    async fn forgot_password_flow(
        &self,
        req: ForgotPasswordRequest,
    ) -> ApiResult<MessageResponse> {
        let user = self.find_user_by_email(&req.email).await?;

        // Same answer whether or not the account exists.
        let Some(user) = user else {
            return Ok(MessageResponse {
                success: true,
                message: FORGOT_PASSWORD_MESSAGE.to_string(),
            });
        };

        if !user.is_active {
            return Err(ApiError::Authentication(ACCOUNT_DEACTIVATED.to_string()));
        }

        let code = otp::generate_code();
        self.otp.store(&req.email, &code, user.id).await?;

        let (subject, html) = templates::password_reset_otp(&user.username, &code);
        self.notify(&req.email, &subject, &html).await;

        Ok(MessageResponse {
            success: true,
            message: FORGOT_PASSWORD_MESSAGE.to_string(),
        })
    }

    /// Complete a password reset with a one-time code
    pub async fn reset_password(&self, req: ResetPasswordRequest) -> ApiResult<MessageResponse> {
        self.reset_password_flow(req)
            .await
            .map_err(|e| wrap_unexpected(e, "Failed to reset password"))
    }

    async fn reset_password_flow(&self, req: ResetPasswordRequest) -> ApiResult<MessageResponse> {
        let user_id = self.otp.verify(&req.email, &req.otp).await?;

        let user = self
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("User".to_string()))?;

        let password_hash = self.hasher.hash(&req.new_password)?;

        sqlx::query("UPDATE users SET password_hash = $1, updated_at = NOW() WHERE id = $2")
            .bind(&password_hash)
            .bind(user.id)
            .execute(&self.pool)
            .await?;

        // Force re-login everywhere.
        let revoked = self.tokens.revoke_all_for_user(user.id).await?;
        tracing::info!(user_id = %user.id, revoked_sessions = revoked, "Password reset completed");

        let (subject, html) = templates::password_changed(&user.username);
        self.notify(&user.email, &subject, &html).await;

        Ok(MessageResponse {
            success: true,
            message: "Password has been successfully reset".to_string(),
        })
    }

    /// Exchange a refresh token for a new pair (strict single-use rotation)
    pub async fn refresh(&self, req: RefreshTokenRequest) -> ApiResult<TokenRefreshResponse> {
        self.refresh_flow(req)
            .await
            .map_err(|e| wrap_unexpected(e, "Failed to refresh token"))
    }

    async fn refresh_flow(&self, req: RefreshTokenRequest) -> ApiResult<TokenRefreshResponse> {
        let claims = self
            .codec
            .verify_refresh(&req.refresh_token)
            .map_err(|_| ApiError::Authentication(INVALID_REFRESH_TOKEN.to_string()))?;

        let token_id = Uuid::parse_str(&claims.jti)
            .map_err(|_| ApiError::Authentication(INVALID_REFRESH_TOKEN.to_string()))?;

        let record = self
            .tokens
            .find_active(token_id, &req.refresh_token)
            .await?
            .ok_or_else(|| ApiError::Authentication(INVALID_REFRESH_TOKEN.to_string()))?;

        let user = self
            .find_user_by_id(record.user_id)
            .await?
            .ok_or_else(|| ApiError::Authentication(INVALID_REFRESH_TOKEN.to_string()))?;

        // Consume before reissuing. The loser of a concurrent rotation finds
        // the flag already flipped and fails like any other invalid token.
        if !self.tokens.revoke(token_id).await? {
            return Err(ApiError::Authentication(INVALID_REFRESH_TOKEN.to_string()));
        }

        let pair = self.grant_session(&user).await?;

        Ok(TokenRefreshResponse {
            success: true,
            data: TokenData {
                access_token: pair.access_token,
                refresh_token: pair.refresh_token,
            },
        })
    }

    /// Revoke the session behind a refresh token.
    ///
    /// Always reports success: an invalid token gets the same answer as a
    /// valid one, which keeps logout idempotent and leaks nothing.
    pub async fn logout(&self, req: LogoutRequest) -> MessageResponse {
        if let Ok(claims) = self.codec.verify_refresh(&req.refresh_token) {
            if let (Ok(token_id), Ok(user_id)) =
                (Uuid::parse_str(&claims.jti), Uuid::parse_str(&claims.sub))
            {
                match self.tokens.revoke_for_user(token_id, user_id).await {
                    Ok(revoked) => {
                        tracing::debug!(token_id = %token_id, revoked, "Logout processed")
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to revoke refresh token on logout")
                    }
                }
            }
        }

        MessageResponse {
            success: true,
            message: "Successfully logged out".to_string(),
        }
    }

    /// Revoke every outstanding session for an account
    pub async fn logout_all(&self, user_id: Uuid) -> ApiResult<MessageResponse> {
        let revoked = self
            .tokens
            .revoke_all_for_user(user_id)
            .await
            .map_err(|e| wrap_unexpected(e.into(), "Failed to log out"))?;

        tracing::info!(user_id = %user_id, revoked_sessions = revoked, "Logged out everywhere");

        Ok(MessageResponse {
            success: true,
            message: "Successfully logged out from all devices".to_string(),
        })
    }

    /// Fetch the account behind an authenticated request
    pub async fn current_user(&self, user_id: Uuid) -> ApiResult<CurrentUserResponse> {
        self.current_user_flow(user_id)
            .await
            .map_err(|e| wrap_unexpected(e, "Failed to get user information"))
    }

    async fn current_user_flow(&self, user_id: Uuid) -> ApiResult<CurrentUserResponse> {
        let user = self
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("User".to_string()))?;

        if !user.is_active {
            return Err(ApiError::Authentication(ACCOUNT_DEACTIVATED.to_string()));
        }

        Ok(CurrentUserResponse {
            success: true,
            data: CurrentUserData { user: user.into() },
        })
    }

    /// Resolve an access token to its active account.
    ///
    /// Every failure mode that is not a deliberate message collapses into a
    /// generic invalid-token answer.
    pub async fn verify_token_and_get_user(&self, token: &str) -> ApiResult<UserResponse> {
        let claims = self.codec.verify_access(token).map_err(|e| {
            ApiError::Authentication(match e {
                JwtError::Expired => "Access token expired".to_string(),
                _ => "Invalid access token".to_string(),
            })
        })?;

        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| ApiError::Authentication("Invalid token".to_string()))?;

        let user = self
            .find_user_by_id(user_id)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "User lookup failed during token verification");
                ApiError::Authentication("Invalid token".to_string())
            })?
            .ok_or_else(|| ApiError::Authentication("User not found".to_string()))?;

        if !user.is_active {
            return Err(ApiError::Authentication(ACCOUNT_DEACTIVATED.to_string()));
        }

        Ok(user.into())
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Issue a token pair and persist the refresh half
    async fn grant_session(&self, user: &User) -> ApiResult<TokenPair> {
        let pair = self
            .codec
            .issue_pair(user.id, &user.email, &user.username)
            .map_err(|e| ApiError::Internal(e.to_string()))?;

        let expires_at = Utc::now() + Duration::seconds(self.codec.refresh_ttl_seconds());
        self.tokens
            .create(pair.token_id, user.id, &pair.refresh_token, expires_at)
            .await?;

        Ok(pair)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT id, email, username, password_hash, first_name, last_name,
                   is_active, email_verified, last_login_at, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }

    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT id, email, username, password_hash, first_name, last_name,
                   is_active, email_verified, last_login_at, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Fire-and-forget mail delivery; failures are logged and swallowed
    async fn notify(&self, to: &str, subject: &str, html: &str) {
        if let Err(e) = self.mailer.send(to, subject, html).await {
            tracing::warn!(error = %e, to = %to, "Failed to send notification email");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_unexpected_hides_internal_detail() {
        let err = wrap_unexpected(
            ApiError::Internal("connection refused".to_string()),
            "Login failed",
        );
        match err {
            ApiError::BadRequest(msg) => {
                assert_eq!(msg, "Login failed");
            }
            other => panic!("expected BadRequest, got {other:?}"),
        }
    }

    #[test]
    fn test_wrap_unexpected_passes_expected_kinds() {
        let err = wrap_unexpected(
            ApiError::Authentication(INVALID_CREDENTIALS.to_string()),
            "Login failed",
        );
        assert!(matches!(err, ApiError::Authentication(msg) if msg == INVALID_CREDENTIALS));

        let err = wrap_unexpected(
            ApiError::Conflict("Email already registered".to_string()),
            "Registration failed",
        );
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[test]
    fn test_otp_error_maps_to_expected_message() {
        let err: ApiError = OtpError::InvalidOrExpired.into();
        assert!(matches!(err, ApiError::Authentication(msg) if msg == "Invalid or expired OTP"));
    }
}
