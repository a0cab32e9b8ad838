//! Failed login rate limiting
//!
//! Tracks failed PIN attempts per IP address. Once an address has used up its
//! budget, all further attempts from it are rejected until the window expires.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use tokio::sync::Mutex;

/// Maximum number of failed attempts within the window
const MAX_ATTEMPTS: u32 = 5;

/// How long failed attempts are held against an address
const ATTEMPT_WINDOW: Duration = Duration::from_secs(60 * 60);

/// Failed attempts from a single address
#[derive(Debug)]
struct FailedAttempts {
    /// Number of failures since the window started
    count: u32,

    /// When the window expires
    reset_at: Instant,
}

/// Shared rate limiter state
#[derive(Clone)]
pub struct RateLimiter {
    /// Failed attempts per address
    attempts: Arc<Mutex<HashMap<IpAddr, FailedAttempts>>>,

    /// How long failed attempts are held against an address
    window: Duration,
}

impl RateLimiter {
    /// Create a rate limiter with the default window
    pub fn new() -> Self {
        Self {
            attempts: Arc::new(Mutex::new(HashMap::new())),
            window: ATTEMPT_WINDOW,
        }
    }

    #[cfg(test)]
    fn with_window(window: Duration) -> Self {
        Self {
            attempts: Arc::new(Mutex::new(HashMap::new())),
            window,
        }
    }

    /// Check whether an address is currently blocked
    ///
    /// Returns the time left until the block expires. Expired entries are
    /// pruned along the way.
    pub async fn check(&self, ip_address: IpAddr) -> Option<Duration> {
        let now = Instant::now();
        let mut attempts = self.attempts.lock().await;

        let entry = attempts.get(&ip_address)?;

        if entry.reset_at <= now {
            attempts.remove(&ip_address);
            return None;
        }

        if entry.count >= MAX_ATTEMPTS {
            return Some(entry.reset_at - now);
        }

        None
    }

    /// Record a failed attempt for an address
    ///
    /// An expired window starts over instead of counting up
    pub async fn record_failure(&self, ip_address: IpAddr) {
        let now = Instant::now();
        let mut attempts = self.attempts.lock().await;

        if let Some(entry) = attempts.get_mut(&ip_address)
            && entry.reset_at > now
        {
            entry.count += 1;
            return;
        }

        attempts.insert(
            ip_address,
            FailedAttempts {
                count: 1,
                reset_at: now + self.window,
            },
        );
    }

    /// Clear all failed attempts for an address
    pub async fn clear(&self, ip_address: IpAddr) {
        let mut attempts = self.attempts.lock().await;

        attempts.remove(&ip_address);
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
