//! Authentication and session management
//!
//! - Password hashing and verification
//! - Dual-secret JWT issuance and verification (access + refresh)
//! - Server-side refresh-token records with single-use rotation
//! - One-time codes for password reset
//! - The session service tying it all together

mod jwt;
mod otp;
mod password;
mod service;
mod token_store;

pub use jwt::{
    decode_unverified, expiration_unverified, AccessClaims, JwtError, RefreshClaims, TokenCodec,
    TokenPair,
};
pub use otp::{generate_code, OtpManager};
pub use password::{PasswordHasher, DEFAULT_COST};
pub use service::AuthService;
pub use token_store::TokenStore;
