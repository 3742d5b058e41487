//! Token codec behavior across the session lifecycle
//!
//! Exercises issuance, verification, and the failure classifications the
//! session flows rely on.

use chirp_server::auth::{decode_unverified, JwtError, TokenCodec};
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::json;
use uuid::Uuid;

const ACCESS_SECRET: &str = "access-secret";
const REFRESH_SECRET: &str = "refresh-secret";

fn codec() -> TokenCodec {
    TokenCodec::new(
        ACCESS_SECRET.to_string(),
        REFRESH_SECRET.to_string(),
        900,
        7 * 24 * 60 * 60,
    )
}

// ============================================================================
// Issuance
// ============================================================================

#[test]
fn test_pair_tokens_are_distinct_and_linked() {
    let codec = codec();
    let user_id = Uuid::new_v4();

    let pair = codec.issue_pair(user_id, "a@x.com", "alice").unwrap();
    assert_ne!(pair.access_token, pair.refresh_token);

    let access = codec.verify_access(&pair.access_token).unwrap();
    assert_eq!(access.sub, user_id.to_string());
    assert_eq!(access.email, "a@x.com");

    let refresh = codec.verify_refresh(&pair.refresh_token).unwrap();
    assert_eq!(refresh.sub, user_id.to_string());
    assert_eq!(refresh.jti, pair.token_id.to_string());
}

#[test]
fn test_each_refresh_token_gets_a_fresh_id() {
    let codec = codec();
    let user_id = Uuid::new_v4();

    let (_, first) = codec.issue_refresh(user_id).unwrap();
    let (_, second) = codec.issue_refresh(user_id).unwrap();
    assert_ne!(first, second);
}

// ============================================================================
// Verification failures
// ============================================================================

#[test]
fn test_tampered_token_is_rejected() {
    let codec = codec();
    let token = codec
        .issue_access(Uuid::new_v4(), "a@x.com", "alice")
        .unwrap();

    // Flip one character in the payload segment.
    let mut parts: Vec<String> = token.split('.').map(String::from).collect();
    let mut payload: Vec<char> = parts[1].chars().collect();
    payload[0] = if payload[0] == 'A' { 'B' } else { 'A' };
    parts[1] = payload.into_iter().collect();
    let tampered = parts.join(".");

    assert!(matches!(
        codec.verify_access(&tampered),
        Err(JwtError::Invalid(_))
    ));
}

#[test]
fn test_wrong_issuer_is_rejected() {
    let codec = codec();
    let now = Utc::now().timestamp();

    let claims = json!({
        "sub": Uuid::new_v4().to_string(),
        "email": "a@x.com",
        "username": "alice",
        "iss": "someone-else",
        "aud": "chirp-users",
        "iat": now,
        "exp": now + 900,
    });

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(ACCESS_SECRET.as_bytes()),
    )
    .unwrap();

    assert!(matches!(
        codec.verify_access(&token),
        Err(JwtError::Invalid(_))
    ));
}

#[test]
fn test_wrong_audience_is_rejected() {
    let codec = codec();
    let now = Utc::now().timestamp();

    let claims = json!({
        "sub": Uuid::new_v4().to_string(),
        "email": "a@x.com",
        "username": "alice",
        "iss": "chirp-api",
        "aud": "someone-elses-users",
        "iat": now,
        "exp": now + 900,
    });

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(ACCESS_SECRET.as_bytes()),
    )
    .unwrap();

    assert!(matches!(
        codec.verify_access(&token),
        Err(JwtError::Invalid(_))
    ));
}

#[test]
fn test_expired_refresh_token_is_classified() {
    // Well past the validator's default leeway.
    let expired = TokenCodec::new(
        ACCESS_SECRET.to_string(),
        REFRESH_SECRET.to_string(),
        -300,
        -300,
    );

    let (token, _) = expired.issue_refresh(Uuid::new_v4()).unwrap();

    // Same secrets, so only the expiry differs.
    assert!(matches!(codec().verify_refresh(&token), Err(JwtError::Expired)));
}

#[test]
fn test_access_token_never_passes_refresh_verification() {
    let codec = codec();
    let pair = codec.issue_pair(Uuid::new_v4(), "a@x.com", "alice").unwrap();

    assert!(codec.verify_refresh(&pair.access_token).is_err());
    assert!(codec.verify_access(&pair.refresh_token).is_err());
}

// ============================================================================
// Unverified inspection
// ============================================================================

#[test]
fn test_unverified_decode_is_inspection_only() {
    let codec = codec();
    let (token, token_id) = codec.issue_refresh(Uuid::new_v4()).unwrap();

    let claims = decode_unverified(&token).unwrap();
    assert_eq!(claims["jti"], token_id.to_string());

    // The same claims are readable from a token nobody should trust.
    let forged = TokenCodec::new(
        "attacker".to_string(),
        "attacker".to_string(),
        900,
        900,
    );
    let (forged_token, _) = forged.issue_refresh(Uuid::new_v4()).unwrap();
    assert!(decode_unverified(&forged_token).is_ok());
    assert!(codec.verify_refresh(&forged_token).is_err());
}
