//! JWT token generation and validation
//!
//! Access and refresh tokens are signed with independent secrets and carry
//! issuer/audience tags. The refresh token embeds a random `jti` that keys
//! the server-side refresh-token record.

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

const ISSUER: &str = "chirp-api";
const AUDIENCE: &str = "chirp-users";

/// Token codec errors
#[derive(Error, Debug)]
pub enum JwtError {
    #[error("Token expired")]
    Expired,

    #[error("Invalid token: {0}")]
    Invalid(String),

    #[error("Token encoding failed: {0}")]
    Encoding(String),
}

/// Claims embedded in access tokens
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AccessClaims {
    /// Subject (user ID)
    pub sub: String,
    pub email: String,
    pub username: String,
    pub iss: String,
    pub aud: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
}

/// Claims embedded in refresh tokens
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RefreshClaims {
    /// Token ID, the join key to the refresh-token store
    pub jti: String,
    /// Subject (user ID)
    pub sub: String,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

/// A freshly issued access/refresh pair
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// `jti` of the refresh token, to be persisted alongside it
    pub token_id: Uuid,
}

/// Stateless signer/verifier for both token families
#[derive(Clone)]
pub struct TokenCodec {
    access_secret: String,
    refresh_secret: String,
    access_ttl_seconds: i64,
    refresh_ttl_seconds: i64,
}

impl TokenCodec {
    pub fn new(
        access_secret: String,
        refresh_secret: String,
        access_ttl_seconds: i64,
        refresh_ttl_seconds: i64,
    ) -> Self {
        Self {
            access_secret,
            refresh_secret,
            access_ttl_seconds,
            refresh_ttl_seconds,
        }
    }

    pub fn refresh_ttl_seconds(&self) -> i64 {
        self.refresh_ttl_seconds
    }

    /// Issue a signed access token for a user
    pub fn issue_access(
        &self,
        user_id: Uuid,
        email: &str,
        username: &str,
    ) -> Result<String, JwtError> {
        let now = Utc::now();
        let claims = AccessClaims {
            sub: user_id.to_string(),
            email: email.to_string(),
            username: username.to_string(),
            iss: ISSUER.to_string(),
            aud: AUDIENCE.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(self.access_ttl_seconds)).timestamp(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.access_secret.as_bytes()),
        )
        .map_err(|e| JwtError::Encoding(e.to_string()))
    }

    /// Issue a signed refresh token with a fresh random token ID
    pub fn issue_refresh(&self, user_id: Uuid) -> Result<(String, Uuid), JwtError> {
        let token_id = Uuid::new_v4();
        let now = Utc::now();
        let claims = RefreshClaims {
            jti: token_id.to_string(),
            sub: user_id.to_string(),
            iss: ISSUER.to_string(),
            aud: AUDIENCE.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(self.refresh_ttl_seconds)).timestamp(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.refresh_secret.as_bytes()),
        )
        .map_err(|e| JwtError::Encoding(e.to_string()))?;

        Ok((token, token_id))
    }

    /// Issue both tokens; used by every flow that grants a session
    pub fn issue_pair(
        &self,
        user_id: Uuid,
        email: &str,
        username: &str,
    ) -> Result<TokenPair, JwtError> {
        let access_token = self.issue_access(user_id, email, username)?;
        let (refresh_token, token_id) = self.issue_refresh(user_id)?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            token_id,
        })
    }

    /// Verify an access token's signature, issuer, audience, and expiry
    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, JwtError> {
        decode::<AccessClaims>(
            token,
            &DecodingKey::from_secret(self.access_secret.as_bytes()),
            &validation(),
        )
        .map(|data| data.claims)
        .map_err(map_decode_error)
    }

    /// Verify a refresh token's signature, issuer, audience, and expiry
    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, JwtError> {
        decode::<RefreshClaims>(
            token,
            &DecodingKey::from_secret(self.refresh_secret.as_bytes()),
            &validation(),
        )
        .map(|data| data.claims)
        .map_err(map_decode_error)
    }
}

fn validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.set_audience(&[AUDIENCE]);
    validation
}

fn map_decode_error(err: jsonwebtoken::errors::Error) -> JwtError {
    match err.kind() {
        ErrorKind::ExpiredSignature => JwtError::Expired,
        _ => JwtError::Invalid(err.to_string()),
    }
}

/// Decode a token's claims WITHOUT verifying the signature or expiry.
///
/// For inspection and logging only. Never make an authorization decision
/// from the result.
pub fn decode_unverified(token: &str) -> Result<serde_json::Value, JwtError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    decode::<serde_json::Value>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .map_err(|e| JwtError::Invalid(e.to_string()))
}

/// Read the expiry timestamp out of a token without verifying it
pub fn expiration_unverified(token: &str) -> Option<DateTime<Utc>> {
    let claims = decode_unverified(token).ok()?;
    let exp = claims.get("exp")?.as_i64()?;
    Utc.timestamp_opt(exp, 0).single()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> TokenCodec {
        TokenCodec::new(
            "access-secret".to_string(),
            "refresh-secret".to_string(),
            900,
            7 * 24 * 60 * 60,
        )
    }

    #[test]
    fn test_access_token_round_trip() {
        let codec = codec();
        let user_id = Uuid::new_v4();

        let token = codec.issue_access(user_id, "a@x.com", "alice").unwrap();
        let claims = codec.verify_access(&token).unwrap();

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.iss, "chirp-api");
        assert_eq!(claims.aud, "chirp-users");
    }

    #[test]
    fn test_refresh_token_round_trip() {
        let codec = codec();
        let user_id = Uuid::new_v4();

        let (token, token_id) = codec.issue_refresh(user_id).unwrap();
        let claims = codec.verify_refresh(&token).unwrap();

        assert_eq!(claims.jti, token_id.to_string());
        assert_eq!(claims.sub, user_id.to_string());
    }

    #[test]
    fn test_issue_pair_ids_match() {
        let codec = codec();
        let pair = codec.issue_pair(Uuid::new_v4(), "a@x.com", "alice").unwrap();

        let claims = codec.verify_refresh(&pair.refresh_token).unwrap();
        assert_eq!(claims.jti, pair.token_id.to_string());
    }

    #[test]
    fn test_token_families_are_not_interchangeable() {
        let codec = codec();
        let user_id = Uuid::new_v4();

        let access = codec.issue_access(user_id, "a@x.com", "alice").unwrap();
        let (refresh, _) = codec.issue_refresh(user_id).unwrap();

        // Signed with different secrets, so cross-verification must fail.
        assert!(matches!(
            codec.verify_refresh(&access),
            Err(JwtError::Invalid(_))
        ));
        assert!(matches!(
            codec.verify_access(&refresh),
            Err(JwtError::Invalid(_))
        ));
    }

    #[test]
    fn test_expired_token_is_classified() {
        // Well past the validator's default leeway.
        let codec = TokenCodec::new(
            "access-secret".to_string(),
            "refresh-secret".to_string(),
            -300,
            -300,
        );

        let token = codec.issue_access(Uuid::new_v4(), "a@x.com", "alice").unwrap();
        assert!(matches!(codec.verify_access(&token), Err(JwtError::Expired)));
    }

    #[test]
    fn test_garbage_token_is_invalid() {
        let codec = codec();
        assert!(matches!(
            codec.verify_access("not.a.token"),
            Err(JwtError::Invalid(_))
        ));
    }

    #[test]
    fn test_decode_unverified_exposes_claims() {
        let codec = codec();
        let token = codec.issue_access(Uuid::new_v4(), "a@x.com", "alice").unwrap();

        let claims = decode_unverified(&token).unwrap();
        assert_eq!(claims["username"], "alice");

        let exp = expiration_unverified(&token).unwrap();
        assert!(exp > Utc::now());
    }
}
