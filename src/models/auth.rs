//! Authentication rows and request/response DTOs

use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::UserResponse;

/// Refresh-token row
///
/// `id` matches the `jti` embedded in the signed token and is the join key
/// between the codec and the store. Rows are retired by setting `revoked`,
/// never deleted here.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct RefreshTokenRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
    pub created_at: DateTime<Utc>,
}

/// Password-reset one-time-code row
///
/// At most one unconsumed, unexpired row exists per email at any instant.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct PasswordResetOtp {
    pub id: Uuid,
    pub email: String,
    pub code: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Request DTOs
// ============================================================================

/// Registration request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Please provide a valid email address"))]
    pub email: String,

    #[validate(
        length(min = 3, max = 20, message = "Username must be 3-20 characters"),
        custom = "validate_username"
    )]
    pub username: String,

    #[validate(custom = "validate_password_strength")]
    pub password: String,

    #[validate(length(min = 1, max = 50, message = "First name must be 1-50 characters"))]
    pub first_name: Option<String>,

    #[validate(length(min = 1, max = 50, message = "Last name must be 1-50 characters"))]
    pub last_name: Option<String>,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Please provide a valid email address"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Forgot-password request
#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "Please provide a valid email address"))]
    pub email: String,
}

/// Reset-password request
#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(email(message = "Please provide a valid email address"))]
    pub email: String,

    #[validate(custom = "validate_otp_format")]
    pub otp: String,

    #[validate(custom = "validate_password_strength")]
    pub new_password: String,
}

/// Refresh-token request
#[derive(Debug, Deserialize, Validate)]
pub struct RefreshTokenRequest {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

/// Logout request
#[derive(Debug, Deserialize, Validate)]
pub struct LogoutRequest {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

/// Username: alphanumeric and underscore only
fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        let mut err = ValidationError::new("username_charset");
        err.message = Some("Username may only contain letters, digits, and underscore".into());
        Err(err)
    }
}

/// Password strength: 8-128 chars with lowercase, uppercase, digit, and
/// special character
fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    const SPECIALS: &str = "@$!%*?&";

    let ok = password.len() >= 8
        && password.len() <= 128
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| SPECIALS.contains(c));

    if ok {
        Ok(())
    } else {
        let mut err = ValidationError::new("password_strength");
        err.message = Some(
            "Password must be 8-128 characters with at least one uppercase letter, \
             one lowercase letter, one number, and one special character (@$!%*?&)"
                .into(),
        );
        Err(err)
    }
}

/// OTP: exactly six ASCII digits
fn validate_otp_format(otp: &str) -> Result<(), ValidationError> {
    if otp.len() == 6 && otp.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("otp_format");
        err.message = Some("OTP must be exactly 6 digits".into());
        Err(err)
    }
}

// ============================================================================
// Response DTOs
// ============================================================================

/// Response for flows that grant a session (register, login)
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub data: AuthData,
}

#[derive(Debug, Serialize)]
pub struct AuthData {
    pub user: UserResponse,
    pub access_token: String,
    pub refresh_token: String,
}

/// Response for token rotation
#[derive(Debug, Serialize)]
pub struct TokenRefreshResponse {
    pub success: bool,
    pub data: TokenData,
}

#[derive(Debug, Serialize)]
pub struct TokenData {
    pub access_token: String,
    pub refresh_token: String,
}

/// Response carrying only a message (forgot/reset password, logout)
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

/// Response for the current-user lookup
#[derive(Debug, Serialize)]
pub struct CurrentUserResponse {
    pub success: bool,
    pub data: CurrentUserData,
}

#[derive(Debug, Serialize)]
pub struct CurrentUserData {
    pub user: UserResponse,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_register() -> RegisterRequest {
        RegisterRequest {
            email: "a@x.com".to_string(),
            username: "alice".to_string(),
            password: "Aa1!aaaa".to_string(),
            first_name: None,
            last_name: None,
        }
    }

    #[test]
    fn test_register_request_valid() {
        assert!(valid_register().validate().is_ok());
    }

    #[test]
    fn test_register_request_rejects_bad_email() {
        let mut req = valid_register();
        req.email = "not-an-email".to_string();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_register_request_rejects_bad_username() {
        let mut req = valid_register();
        req.username = "al".to_string();
        assert!(req.validate().is_err());

        let mut req = valid_register();
        req.username = "alice bob".to_string();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_register_request_rejects_weak_password() {
        for weak in ["short1!", "alllower1!", "ALLUPPER1!", "NoDigits!!", "NoSpecial11"] {
            let mut req = valid_register();
            req.password = weak.to_string();
            assert!(req.validate().is_err(), "expected {weak:?} to be rejected");
        }
    }

    #[test]
    fn test_otp_format() {
        let req = ResetPasswordRequest {
            email: "a@x.com".to_string(),
            otp: "123456".to_string(),
            new_password: "Bb2@bbbb".to_string(),
        };
        assert!(req.validate().is_ok());

        let req = ResetPasswordRequest {
            email: "a@x.com".to_string(),
            otp: "12345a".to_string(),
            new_password: "Bb2@bbbb".to_string(),
        };
        assert!(req.validate().is_err());

        let req = ResetPasswordRequest {
            email: "a@x.com".to_string(),
            otp: "12345".to_string(),
            new_password: "Bb2@bbbb".to_string(),
        };
        assert!(req.validate().is_err());
    }
}
