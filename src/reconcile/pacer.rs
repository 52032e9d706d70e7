use governor::{clock::DefaultClock, state::InMemoryState, state::NotKeyed, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Token-bucket pacing for outbound processor calls.
///
/// The first call after a quiet period goes through immediately; sustained
/// calls are metered at the configured rate. This replaces a fixed sleep
/// between calls, so short runs do not pay an artificial delay.
pub struct CallPacer {
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl CallPacer {
    pub fn new(permits_per_sec: u32) -> Self {
        let quota = Quota::per_second(NonZeroU32::new(permits_per_sec.max(1)).unwrap());

        CallPacer {
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    /// Wait until the next call is allowed
    pub async fn acquire(&self) {
        self.limiter.until_ready().await;
    }
}
