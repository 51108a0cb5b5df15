/// Request throttling for the credential endpoints
/// Features:
/// - Token-bucket rate limiting keyed by client IP (signup, login,
///   password-reset-request) or by authenticated user (verification resend)
/// - Exceeding a policy maps to a 429 RateLimited failure

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use crate::configuration::RateLimitSettings;
use crate::error::AppError;

/// A windowed request allowance
#[derive(Clone, Copy)]
pub struct RateLimitPolicy {
    /// Max requests per window per key
    pub max_requests: u32,
    /// Window length in seconds
    pub window_seconds: u64,
}

/// Simple token bucket rate limiter implementation
struct TokenBucket {
    tokens: f64,
    last_refill: SystemTime,
    capacity: u32,
    refill_rate: f64, // tokens per second
}

impl TokenBucket {
    fn new(policy: RateLimitPolicy) -> Self {
        Self {
            tokens: policy.max_requests as f64,
            last_refill: SystemTime::now(),
            capacity: policy.max_requests,
            refill_rate: policy.max_requests as f64 / policy.window_seconds as f64,
        }
    }

    fn try_take_token(&mut self) -> bool {
        // Calculate elapsed time and refill tokens
        if let Ok(elapsed) = self.last_refill.elapsed() {
            let elapsed_secs = elapsed.as_secs_f64();
            self.tokens = (self.tokens + elapsed_secs * self.refill_rate).min(self.capacity as f64);
            self.last_refill = SystemTime::now();
        }

        // Try to take a token
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Rate limiter tracking one policy across many keys (IP addresses or user ids)
pub struct RateLimiter {
    policy: RateLimitPolicy,
    buckets: Arc<Mutex<HashMap<String, TokenBucket>>>,
}

impl RateLimiter {
    pub fn new(policy: RateLimitPolicy) -> Self {
        Self {
            policy,
            buckets: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Check whether a request under this key is allowed
    pub fn check(&self, key: &str) -> Result<(), AppError> {
        let mut buckets = self.buckets.lock().unwrap();

        let bucket = buckets
            .entry(key.to_string())
            .or_insert_with(|| TokenBucket::new(self.policy));

        if bucket.try_take_token() {
            Ok(())
        } else {
            Err(AppError::RateLimited(format!(
                "Too many requests: max {} per {} seconds",
                self.policy.max_requests, self.policy.window_seconds
            )))
        }
    }
}

/// The rate-limit policies applied in front of the auth endpoints
pub struct RateLimiters {
    /// Keyed by client IP: signup, login, password-reset-request
    pub credential: RateLimiter,
    /// Keyed by authenticated user: resend-verification-email
    pub resend: RateLimiter,
}

impl RateLimiters {
    pub fn new(settings: &RateLimitSettings) -> Self {
        Self {
            credential: RateLimiter::new(RateLimitPolicy {
                max_requests: settings.credential_requests,
                window_seconds: settings.credential_window_seconds,
            }),
            resend: RateLimiter::new(RateLimitPolicy {
                max_requests: settings.resend_requests,
                window_seconds: settings.resend_window_seconds,
            }),
        }
    }
}
