use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::debug;

/// Request budget for an external API.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub time_window: Duration,
    pub burst_allowance: u32,
}

impl RateLimitConfig {
    pub fn reddit_oauth() -> Self {
        Self {
            max_requests: 100, // Reddit allows 100 requests per minute for OAuth2
            time_window: Duration::from_secs(60),
            burst_allowance: 10,
        }
    }
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

/// Token bucket that spaces API calls to stay inside the configured budget.
/// `acquire` suspends the caller until a token is available.
#[derive(Debug)]
pub struct RateLimiter {
    state: Mutex<BucketState>,
    capacity: f64,
    refill_rate: f64, // tokens per second
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        let capacity = config.burst_allowance as f64;
        let refill_rate = config.max_requests as f64 / config.time_window.as_secs_f64();

        Self {
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
            capacity,
            refill_rate,
        }
    }

    /// Take one token, sleeping until the bucket refills when it is empty.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut state = self.state.lock().await;
                let elapsed = state.last_refill.elapsed();
                state.tokens =
                    (state.tokens + elapsed.as_secs_f64() * self.refill_rate).min(self.capacity);
                state.last_refill = Instant::now();

                if state.tokens >= 1.0 {
                    state.tokens -= 1.0;
                    return;
                }
                Duration::from_secs_f64((1.0 - state.tokens) / self.refill_rate)
            };

            debug!("Rate limit reached, waiting {:?}", wait);
            sleep(wait).await;
        }
    }

    pub async fn available_tokens(&self) -> f64 {
        let mut state = self.state.lock().await;
        let elapsed = state.last_refill.elapsed();
        state.tokens =
            (state.tokens + elapsed.as_secs_f64() * self.refill_rate).min(self.capacity);
        state.last_refill = Instant::now();
        state.tokens
    }
}
