//! Token-bucket rate limiter for provider calls.
//!
//! The bucket holds at most `burst` tokens and refills continuously at
//! `rate_per_minute`. [`TokenBucket::acquire`] waits for a token and never
//! returns early; with a timeout it fails with [`BatonError::Timeout`] instead.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::BatonError;

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

/// Blocking token bucket shared by the callers of one provider.
#[derive(Debug)]
pub struct TokenBucket {
    capacity: f64,
    refill_per_sec: f64,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    /// Create a full bucket with `burst` capacity refilling at
    /// `rate_per_minute` tokens per minute.
    pub fn new(rate_per_minute: u32, burst: u32) -> Result<Self, BatonError> {
        if rate_per_minute == 0 || burst == 0 {
            return Err(BatonError::Configuration(
                "token bucket rate and burst must be positive".into(),
            ));
        }
        Ok(Self {
            capacity: f64::from(burst),
            refill_per_sec: f64::from(rate_per_minute) / 60.0,
            state: Mutex::new(BucketState {
                tokens: f64::from(burst),
                last_refill: Instant::now(),
            }),
        })
    }

    fn refill(&self, state: &mut BucketState, now: Instant) {
        let elapsed = now.saturating_duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        state.last_refill = now;
    }

    /// Take a token if one is available right now.
    pub async fn try_acquire(&self) -> bool {
        let mut state = self.state.lock().await;
        self.refill(&mut state, Instant::now());
        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Number of whole tokens currently available.
    pub async fn available(&self) -> u32 {
        let mut state = self.state.lock().await;
        self.refill(&mut state, Instant::now());
        state.tokens.floor() as u32
    }

    /// Wait for a token. `timeout` of `None` waits indefinitely.
    pub async fn acquire(&self, timeout: Option<Duration>) -> Result<(), BatonError> {
        let deadline = timeout.map(|t| Instant::now() + t);
        loop {
            let wait = {
                let mut state = self.state.lock().await;
                let now = Instant::now();
                self.refill(&mut state, now);
                if state.tokens >= 1.0 {
                    state.tokens -= 1.0;
                    return Ok(());
                }
                Duration::from_secs_f64((1.0 - state.tokens) / self.refill_per_sec)
            };

            let sleep_for = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now + wait > deadline {
                        tokio::time::sleep_until(deadline).await;
                        tracing::debug!(wait_ms = wait.as_millis() as u64, "rate limiter timed out");
                        let waited = timeout.unwrap_or_default();
                        return Err(BatonError::Timeout(waited.as_millis() as u64));
                    }
                    wait
                }
                None => wait,
            };
            tokio::time::sleep(sleep_for).await;
        }
    }
}
