//! Rate Limiter (C12): a token bucket over external LLM calls, distributed
//! across per-minute windows keyed by caller-supplied key. Fails open when
//! its internal state cannot be consulted — a rate-limiter bug must never
//! stall a request that would otherwise succeed (§7).

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::providers::llm::JsonCompletionRequest;
use crate::providers::LlmProvider;
use crate::{Error, Result};

/// Outcome of an [`RateLimiter::acquire`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Ok,
    Denied,
}

struct Bucket {
    tokens: f64,
    capacity: f64,
    refill_per_window: f64,
    window: Duration,
    last_refill: Instant,
}

impl Bucket {
    fn new(capacity: u32, window: Duration) -> Self {
        Self {
            tokens: f64::from(capacity),
            capacity: f64::from(capacity),
            refill_per_window: f64::from(capacity),
            window,
            last_refill: Instant::now(),
        }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.duration_since(self.last_refill);
        if elapsed >= self.window {
            // Whole windows elapsed: snap back to full capacity rather than
            // accumulating partial refills across an arbitrary number of
            // missed windows (§8 boundary: "at the window rollover the next
            // call succeeds").
            self.tokens = self.capacity;
            self.last_refill = now;
            return;
        }
        let fraction = elapsed.as_secs_f64() / self.window.as_secs_f64();
        let grant = fraction * self.refill_per_window;
        if grant > 0.0 {
            self.tokens = (self.tokens + grant).min(self.capacity);
            self.last_refill = now;
        }
    }

    fn try_consume(&mut self, cost: f64, now: Instant) -> bool {
        self.refill(now);
        if self.tokens >= cost {
            self.tokens -= cost;
            true
        } else {
            false
        }
    }
}

/// Token-bucket rate limiter over LLM calls (§4.12). One bucket per key,
/// capacity and refill rate both equal to `requests_per_minute`, windowed
/// at 60 seconds.
pub struct RateLimiter {
    capacity: u32,
    window: Duration,
    buckets: RwLock<HashMap<String, Bucket>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(requests_per_minute: u32) -> Self {
        Self {
            capacity: requests_per_minute,
            window: Duration::from_secs(60),
            buckets: RwLock::new(HashMap::new()),
        }
    }

    /// Try to consume `cost` tokens from `key`'s bucket at time `now`.
    /// Creates the bucket on first use. Never blocks and never errors —
    /// the worst case is a [`Verdict::Denied`].
    #[must_use]
    pub fn acquire(&self, key: &str, cost: u32, now: Instant) -> Verdict {
        let mut buckets = self.buckets.write();
        let bucket = buckets
            .entry(key.to_string())
            .or_insert_with(|| Bucket::new(self.capacity, self.window));
        if bucket.try_consume(f64::from(cost), now) {
            Verdict::Ok
        } else {
            Verdict::Denied
        }
    }
}

/// Wraps an [`LlmProvider`] so every call passes through the rate limiter
/// first, turning a [`Verdict::Denied`] into [`Error::LlmRateLimited`]
/// before the provider is ever invoked. One instance is built per request,
/// all three of the pipeline's LLM boundaries (planner, generator,
/// summariser) share it under the same key (§5: "LLM rate-limit counter:
/// shared atomic... no locks held across network I/O" — the limiter check
/// itself is lock-free of the provider call).
pub struct RateLimitedLlm<'a> {
    inner: &'a dyn LlmProvider,
    limiter: &'a RateLimiter,
    key: &'a str,
}

impl<'a> RateLimitedLlm<'a> {
    #[must_use]
    pub fn new(inner: &'a dyn LlmProvider, limiter: &'a RateLimiter, key: &'a str) -> Self {
        Self { inner, limiter, key }
    }
}

#[async_trait]
impl LlmProvider for RateLimitedLlm<'_> {
    async fn complete_json(&self, request: &JsonCompletionRequest) -> Result<serde_json::Value> {
        match self.limiter.acquire(self.key, 1, Instant::now()) {
            Verdict::Ok => self.inner.complete_json(request).await,
            Verdict::Denied => Err(Error::LlmRateLimited),
        }
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
