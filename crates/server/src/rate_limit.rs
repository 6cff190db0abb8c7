//! Per-client-IP rate limiting.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::RwLock;
use tracing::debug;

/// A token bucket: `rate` tokens per second refill up to `burst`.
#[derive(Debug, Clone, Copy)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Per-IP token-bucket rate limiter.
#[derive(Clone)]
pub struct RateLimiter {
    buckets: Arc<RwLock<HashMap<IpAddr, Bucket>>>,
    rate: f64,
    burst: f64,
}

impl RateLimiter {
    /// Global limit: 10 requests per second, burst 20.
    #[must_use]
    pub fn global() -> Self {
        Self::new(10.0, 20.0)
    }

    /// Inbox limit: 5 requests per second, burst 10.
    #[must_use]
    pub fn inbox() -> Self {
        Self::new(5.0, 10.0)
    }

    #[must_use]
    pub fn new(rate: f64, burst: f64) -> Self {
        Self {
            buckets: Arc::new(RwLock::new(HashMap::new())),
            rate,
            burst,
        }
    }

    /// Take one token for `ip`; false means over the limit.
    pub async fn check(&self, ip: IpAddr) -> bool {
        let now = Instant::now();
        let mut buckets = self.buckets.write().await;
        let bucket = buckets.entry(ip).or_insert(Bucket {
            tokens: self.burst,
            last_refill: now,
        });

        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.rate).min(self.burst);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Axum middleware enforcing a [`RateLimiter`].
pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiter>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if limiter.check(addr.ip()).await {
        next.run(request).await
    } else {
        debug!(ip = %addr.ip(), "Rate limit exceeded");
        StatusCode::TOO_MANY_REQUESTS.into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_burst_then_limit() {
        let limiter = RateLimiter::new(1.0, 3.0);
        let ip: IpAddr = "203.0.113.9".parse().unwrap();

        assert!(limiter.check(ip).await);
        assert!(limiter.check(ip).await);
        assert!(limiter.check(ip).await);
        // Burst exhausted.
        assert!(!limiter.check(ip).await);
    }

    #[tokio::test]
    async fn test_limits_are_per_ip() {
        let limiter = RateLimiter::new(1.0, 1.0);
        let a: IpAddr = "203.0.113.9".parse().unwrap();
        let b: IpAddr = "203.0.113.10".parse().unwrap();

        assert!(limiter.check(a).await);
        assert!(!limiter.check(a).await);
        assert!(limiter.check(b).await);
    }
}
