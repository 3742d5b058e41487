//! Rate limiting middleware
//!
//! Fixed-window request counter per client IP. Deliberately approximate:
//! counters live in process memory, reset on restart, and are not shared
//! across instances.

use axum::{
    body::Body,
    extract::Request,
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::RwLock;

use crate::error::ApiError;

/// One counting window for a single client
#[derive(Debug, Clone)]
struct Window {
    count: u32,
    started: Instant,
}

/// Fixed-window rate limiter keyed by client identifier
#[derive(Clone)]
pub struct RateLimiter {
    windows: Arc<RwLock<HashMap<String, Window>>>,
    window: Duration,
    max_requests: u32,
}

impl RateLimiter {
    /// Create a limiter allowing `max_requests` per `window`
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            windows: Arc::new(RwLock::new(HashMap::new())),
            window,
            max_requests,
        }
    }

    /// Count a request; returns whether it is within the limit
    pub async fn check(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut windows = self.windows.write().await;

        let window = windows.entry(key.to_string()).or_insert(Window {
            count: 0,
            started: now,
        });

        if now.duration_since(window.started) >= self.window {
            window.count = 0;
            window.started = now;
        }

        window.count += 1;
        window.count <= self.max_requests
    }

    /// Drop windows that have been idle for longer than the window length
    pub async fn cleanup(&self) {
        let now = Instant::now();
        let window = self.window;
        let mut windows = self.windows.write().await;
        windows.retain(|_, w| now.duration_since(w.started) < window * 2);
    }
}

/// Create rate limiting middleware for one route
pub fn rate_limit_layer(
    rate_limiter: RateLimiter,
) -> impl Fn(
    Request<Body>,
    Next,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Response> + Send>>
       + Clone
       + Send {
    move |request: Request<Body>, next: Next| {
        let rate_limiter = rate_limiter.clone();
        Box::pin(async move {
            let client_key = extract_client_ip(&request);

            if !rate_limiter.check(&client_key).await {
                tracing::warn!(client = %client_key, path = %request.uri().path(), "Rate limit exceeded");
                let mut response = ApiError::RateLimit.into_response();
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, "60".parse().unwrap());
                return response;
            }

            next.run(request).await
        })
    }
}

/// Extract client IP from proxy headers, falling back to a shared bucket
fn extract_client_ip(request: &Request<Body>) -> String {
    if let Some(forwarded) = request.headers().get("x-forwarded-for") {
        if let Ok(s) = forwarded.to_str() {
            if let Some(ip) = s.split(',').next() {
                return ip.trim().to_string();
            }
        }
    }

    if let Some(real_ip) = request.headers().get("x-real-ip") {
        if let Ok(s) = real_ip.to_str() {
            return s.to_string();
        }
    }

    "unknown".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_requests_beyond_limit_are_denied() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));

        for _ in 0..3 {
            assert!(limiter.check("client-a").await);
        }
        assert!(!limiter.check("client-a").await);
        assert!(!limiter.check("client-a").await);
    }

    #[tokio::test]
    async fn test_clients_have_independent_windows() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));

        assert!(limiter.check("client-a").await);
        assert!(!limiter.check("client-a").await);
        assert!(limiter.check("client-b").await);
    }

    #[tokio::test]
    async fn test_window_resets_after_elapsing() {
        let limiter = RateLimiter::new(1, Duration::from_millis(20));

        assert!(limiter.check("client-a").await);
        assert!(!limiter.check("client-a").await);

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(limiter.check("client-a").await);
    }

    #[tokio::test]
    async fn test_cleanup_drops_stale_windows() {
        let limiter = RateLimiter::new(1, Duration::from_millis(10));

        limiter.check("client-a").await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        limiter.cleanup().await;

        assert!(limiter.windows.read().await.is_empty());
    }
}
