//! One-time codes for password reset
//!
//! Six-digit numeric codes bound to an email and account. At most one
//! unconsumed, unexpired code exists per email; verification is a single
//! conditional update so a code can never be consumed twice.

use chrono::{Duration, Utc};
use rand::Rng;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::models::PasswordResetOtp;

/// One-time-code errors
#[derive(Error, Debug)]
pub enum OtpError {
    #[error("Invalid or expired OTP")]
    InvalidOrExpired,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Generate a six-digit code, uniformly drawn from 000000-999999
pub fn generate_code() -> String {
    let n: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{:06}", n)
}

/// Persistence and single-use verification for reset codes
#[derive(Clone)]
pub struct OtpManager {
    pool: PgPool,
    ttl_seconds: i64,
}

impl OtpManager {
    pub fn new(pool: PgPool, ttl_seconds: i64) -> Self {
        Self { pool, ttl_seconds }
    }

    /// Store a new code for an email, replacing any outstanding ones
    pub async fn store(&self, email: &str, code: &str, user_id: Uuid) -> Result<(), OtpError> {
        let expires_at = Utc::now() + Duration::seconds(self.ttl_seconds);

        let mut tx = self.pool.begin().await?;

        // Enforces the at-most-one-live-code invariant.
        sqlx::query("DELETE FROM password_reset_otps WHERE email = $1")
            .bind(email)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO password_reset_otps (id, email, code, user_id, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(code)
        .bind(user_id)
        .bind(expires_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }

    /// Verify and consume a code, returning the bound account ID.
    ///
    /// Check and consume are one conditional UPDATE keyed on `used = FALSE`,
    /// so of two concurrent submissions of the same code exactly one wins;
    /// the other gets `InvalidOrExpired`, indistinguishable from a bad code.
    pub async fn verify(&self, email: &str, code: &str) -> Result<Uuid, OtpError> {
        let record: Option<PasswordResetOtp> = sqlx::query_as(
            r#"
            UPDATE password_reset_otps
            SET used = TRUE
            WHERE email = $1 AND code = $2 AND used = FALSE AND expires_at > NOW()
            RETURNING id, email, code, user_id, expires_at, used, created_at
            "#,
        )
        .bind(email)
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        record
            .map(|otp| otp.user_id)
            .ok_or(OtpError::InvalidOrExpired)
    }
}
