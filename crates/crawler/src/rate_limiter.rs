use governor::{
    clock::DefaultClock,
    middleware::NoOpMiddleware,
    state::{InMemoryState, NotKeyed},
    Jitter, Quota, RateLimiter as GovernorRateLimiter,
};
use std::fmt;
use std::time::Duration;
use tracing::debug;

use crate::{CrawlerError, RateLimitConfig, Result};

pub type RateLimiterImpl = GovernorRateLimiter<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>;

/// Process-wide request gate. Build one, wrap it in an `Arc` and hand it to
/// every `HttpClient`; all of them then share a single ceiling.
pub struct RateLimiter {
    config: Option<RateLimitConfig>,
    limiter: Option<RateLimiterImpl>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Result<Self> {
        let quota = Self::create_quota(&config)?;

        Ok(Self {
            config: Some(config),
            limiter: Some(GovernorRateLimiter::direct(quota)),
        })
    }

    /// A gate that never waits.
    pub fn unlimited() -> Self {
        Self {
            config: None,
            limiter: None,
        }
    }

    /// Waits until a request slot is free. Callers are delayed, never rejected.
    pub async fn until_ready(&self) {
        if let Some(limiter) = &self.limiter {
            if limiter.check().is_ok() {
                return;
            }
            debug!("Global rate limit reached, waiting for a free slot");
            limiter
                .until_ready_with_jitter(Jitter::up_to(Duration::from_millis(50)))
                .await;
        }
    }

    pub fn config(&self) -> Option<&RateLimitConfig> {
        self.config.as_ref()
    }

    fn create_quota(config: &RateLimitConfig) -> Result<Quota> {
        if config.max_requests == 0 {
            return Err(CrawlerError::InvalidConfig(
                "rate limit max_requests must be greater than zero".to_string(),
            ));
        }

        // One slot every window/max_requests with no burst, so any rolling
        // window admits at most max_requests.
        let period = config.window / config.max_requests;

        Quota::with_period(period)
            .ok_or_else(|| {
                CrawlerError::InvalidConfig(format!(
                    "rate limit window too short: {:?} for {} requests",
                    config.window, config.max_requests
                ))
            })
    }
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("config", &self.config)
            .finish()
    }
}
