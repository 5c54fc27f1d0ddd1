//! Application state and rate limiting.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Mutex;

use super::RATE_LIMIT_WINDOW_SECS;
use crate::auth::CredentialVerifier;
use crate::pipeline::AnalysisPipeline;
use phishguard_storage::ScamLogStore;

/// In-memory per-IP rate limiter: request count and window start per IP.
pub struct RateLimiter {
    windows: Mutex<HashMap<IpAddr, (u64, Instant)>>,
    /// Maximum requests per window.
    max_requests: u64,
}

impl RateLimiter {
    pub fn new(max_requests: u64) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            max_requests,
        }
    }

    /// Check if a request from the given IP is allowed.
    /// Returns Ok(()) if allowed, Err(retry_after_secs) if rate limited.
    pub async fn check(&self, ip: IpAddr) -> Result<(), u64> {
        let mut windows = self.windows.lock().await;
        let now = Instant::now();

        let entry = windows.entry(ip).or_insert((0, now));

        let elapsed = now.duration_since(entry.1).as_secs();
        if elapsed >= RATE_LIMIT_WINDOW_SECS {
            entry.0 = 0;
            entry.1 = now;
        }

        entry.0 += 1;
        if entry.0 > self.max_requests {
            Err(RATE_LIMIT_WINDOW_SECS.saturating_sub(elapsed))
        } else {
            Ok(())
        }
    }
}

/// Application state shared across request handlers.
pub struct AppState {
    /// Verifies the caller's bearer credential before any pipeline work.
    pub verifier: Arc<dyn CredentialVerifier>,
    /// The analysis pipeline behind POST /analyze.
    pub pipeline: AnalysisPipeline,
    /// Storage handle for the read-only /logs endpoint.
    pub store: Arc<dyn ScamLogStore>,
    /// Per-IP rate limiter.
    pub rate_limiter: RateLimiter,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn limiter_allows_up_to_max_then_rejects() {
        let limiter = RateLimiter::new(3);
        let ip: IpAddr = "127.0.0.1".parse().unwrap();
        for _ in 0..3 {
            assert!(limiter.check(ip).await.is_ok());
        }
        let retry_after = limiter.check(ip).await.unwrap_err();
        assert!(retry_after <= RATE_LIMIT_WINDOW_SECS);
    }

    #[tokio::test]
    async fn limiter_tracks_ips_independently() {
        let limiter = RateLimiter::new(1);
        let a: IpAddr = "10.0.0.1".parse().unwrap();
        let b: IpAddr = "10.0.0.2".parse().unwrap();
        assert!(limiter.check(a).await.is_ok());
        assert!(limiter.check(b).await.is_ok());
        assert!(limiter.check(a).await.is_err());
    }
}
