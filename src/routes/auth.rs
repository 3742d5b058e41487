//! Authentication routes
//!
//! The sensitive public endpoints carry their own per-IP rate limits, on
//! top of whatever global limiting the deployment applies.

use axum::{
    body::Body,
    extract::Request,
    middleware::{from_fn, Next},
    routing::{get, post, MethodRouter},
    Router,
};
use std::time::Duration;

use crate::handlers::auth;
use crate::middleware::{rate_limit_layer, RateLimiter};
use crate::state::AppState;

/// Create authentication routes
pub fn auth_routes(window: Duration) -> Router<AppState> {
    Router::new()
        .route("/auth/register", limited(post(auth::register), 5, window))
        .route("/auth/login", limited(post(auth::login), 10, window))
        .route(
            "/auth/forgot-password",
            limited(post(auth::forgot_password), 3, window),
        )
        .route(
            "/auth/reset-password",
            limited(post(auth::reset_password), 3, window),
        )
        .route(
            "/auth/refresh-token",
            limited(post(auth::refresh_token), 20, window),
        )
        .route("/auth/logout", post(auth::logout))
        .route("/auth/logout-all", post(auth::logout_all))
        .route("/auth/me", get(auth::current_user))
}

/// Attach a dedicated fixed-window limiter to one route
fn limited(
    router: MethodRouter<AppState>,
    max_requests: u32,
    window: Duration,
) -> MethodRouter<AppState> {
    let limiter = RateLimiter::new(max_requests, window);
    router.layer(from_fn(move |request: Request<Body>, next: Next| {
        let limiter = limiter.clone();
        async move { rate_limit_layer(limiter)(request, next).await }
    }))
}
