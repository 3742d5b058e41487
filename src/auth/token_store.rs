//! Server-side refresh-token records
//!
//! One row per issued refresh token. Rotation and revocation both reduce
//! to conditional single-row updates, so concurrent callers race on the
//! database rather than on in-process state.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::models::RefreshTokenRecord;

/// Token store errors
#[derive(Error, Debug)]
pub enum TokenStoreError {
    /// A duplicate token ID on insert. Token IDs are random UUIDs, so this
    /// indicates a broken RNG or corrupted state, not a recoverable clash.
    #[error("Refresh token ID collision: {0}")]
    Integrity(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Persistence for refresh-token records
#[derive(Clone)]
pub struct TokenStore {
    pool: PgPool,
}

impl TokenStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a record for a freshly issued refresh token
    pub async fn create(
        &self,
        token_id: Uuid,
        user_id: Uuid,
        raw_token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), TokenStoreError> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (id, user_id, token, expires_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(token_id)
        .bind(user_id)
        .bind(raw_token)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                TokenStoreError::Integrity(token_id)
            } else {
                TokenStoreError::Database(e)
            }
        })?;

        Ok(())
    }

    /// Find a live record matching both the token ID and the raw token.
    ///
    /// Absent, expired, and revoked records all come back as `None`; the
    /// caller cannot tell which, so a probing client learns nothing.
    pub async fn find_active(
        &self,
        token_id: Uuid,
        raw_token: &str,
    ) -> Result<Option<RefreshTokenRecord>, TokenStoreError> {
        let record = sqlx::query_as(
            r#"
            SELECT id, user_id, token, expires_at, revoked, created_at
            FROM refresh_tokens
            WHERE id = $1 AND token = $2 AND revoked = FALSE AND expires_at > NOW()
            "#,
        )
        .bind(token_id)
        .bind(raw_token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Revoke one record. Returns whether this call flipped the flag.
    ///
    /// The `revoked = FALSE` guard makes this the rotation gate: of two
    /// concurrent refreshes with the same token, exactly one sees `true`.
    pub async fn revoke(&self, token_id: Uuid) -> Result<bool, TokenStoreError> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked = TRUE
            WHERE id = $1 AND revoked = FALSE
            "#,
        )
        .bind(token_id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows_affected > 0)
    }

    /// Revoke one record only if it belongs to the given user
    pub async fn revoke_for_user(
        &self,
        token_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, TokenStoreError> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked = TRUE
            WHERE id = $1 AND user_id = $2 AND revoked = FALSE
            "#,
        )
        .bind(token_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows_affected > 0)
    }

    /// Revoke every outstanding token for an account (password reset)
    pub async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<u64, TokenStoreError> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked = TRUE
            WHERE user_id = $1 AND revoked = FALSE
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows_affected)
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .map(|code| code == "23505")
        .unwrap_or(false)
}
