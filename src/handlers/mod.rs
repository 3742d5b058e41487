//! API handlers for the Chirp backend

pub mod auth;

pub use auth::*;

// Re-export the extractor for handler use
pub use crate::middleware::auth::AuthenticatedUser;
