//! Token-bucket rate limiting shared by every worker talking to E-utilities
//!
//! NCBI allows 3 requests per second without an API key and 10 with one;
//! exceeding that can get the caller's IP blocked, so all chunk workers draw
//! from the same bucket.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, instrument};

/// Requests per second NCBI permits without an API key
pub const NCBI_RATE_WITHOUT_KEY: f64 = 3.0;

/// Requests per second NCBI permits with an API key
pub const NCBI_RATE_WITH_KEY: f64 = 10.0;

/// Cloneable handle to one shared token bucket
#[derive(Clone)]
pub struct RateLimiter {
    bucket: Arc<Mutex<TokenBucket>>,
}

struct TokenBucket {
    tokens: f64,
    capacity: f64,
    refill_per_sec: f64,
    last_refill: Instant,
}

impl RateLimiter {
    /// Create a limiter allowing `rate` requests per second
    ///
    /// # Example
    ///
    /// ```
    /// use ncbi_corpus::rate_limit::RateLimiter;
    ///
    /// let limiter = RateLimiter::new(3.0);
    /// ```
    pub fn new(rate: f64) -> Self {
        let capacity = rate.max(1.0);
        Self {
            bucket: Arc::new(Mutex::new(TokenBucket {
                tokens: capacity,
                capacity,
                refill_per_sec: rate,
                last_refill: Instant::now(),
            })),
        }
    }

    /// Limiter matching NCBI's published limits
    pub fn ncbi(has_api_key: bool) -> Self {
        if has_api_key {
            Self::new(NCBI_RATE_WITH_KEY)
        } else {
            Self::new(NCBI_RATE_WITHOUT_KEY)
        }
    }

    /// Wait until a request slot is available and take it
    ///
    /// Waiters that lose the race for a refilled token go back to sleep, so
    /// contention only delays requests and never fails them.
    #[instrument(skip(self))]
    pub async fn acquire(&self) {
        let mut waits = 0u32;
        loop {
            let wait = {
                let mut bucket = self.bucket.lock().await;
                bucket.refill();
                if bucket.try_take() {
                    debug!(remaining_tokens = %bucket.tokens, waits, "Token acquired");
                    return;
                }
                bucket.time_to_next_token()
            };

            debug!(
                wait_duration_ms = wait.as_millis(),
                "Sleeping to respect rate limit"
            );
            sleep(wait).await;
            waits += 1;
        }
    }

    /// Whether a token could be taken right now, without taking it
    pub async fn check_available(&self) -> bool {
        let mut bucket = self.bucket.lock().await;
        bucket.refill();
        bucket.tokens >= 1.0
    }

    /// Configured requests per second
    pub async fn rate(&self) -> f64 {
        self.bucket.lock().await.refill_per_sec
    }
}

impl TokenBucket {
    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        self.last_refill = now;
    }

    fn try_take(&mut self) -> bool {
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    fn time_to_next_token(&self) -> Duration {
        let missing = (1.0 - self.tokens).max(0.0);
        Duration::from_secs_f64(missing / self.refill_per_sec)
    }
}
