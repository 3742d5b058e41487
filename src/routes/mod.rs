//! Route definitions for the Chirp API

mod auth;

pub use auth::auth_routes;
