//! Circuit breaker for the upstream boundary calls the pipeline depends on:
//! the graph store's production backend and, were one shipped, an LLM
//! provider's HTTP transport. Closed/open/half-open state machine with
//! exponential backoff, serving the `UPSTREAM_UNAVAILABLE` reason code
//! (§7) rather than letting a downed backend hang every request on its own
//! timeout.
//!
//! This module is deliberately backend-agnostic — it wraps any
//! `FnOnce() -> Future<Output = Result<T>>`, so a [`GraphStore`] backend and
//! an [`LlmProvider`] backend can share one implementation. See
//! `graphrag_graphstore::resilient::ResilientGraphStore` for the concrete
//! application to the Bolt backend.
//!
//! [`GraphStore`]: crate::providers::GraphStore
//! [`LlmProvider`]: crate::providers::LlmProvider

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::{Error, Result};

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operation — requests pass through.
    Closed,
    /// Too many consecutive failures — requests are rejected immediately.
    Open,
    /// Timeout elapsed since opening; the next request is let through as a
    /// recovery probe.
    HalfOpen,
}

/// Circuit breaker tuning.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before the circuit opens.
    pub failure_threshold: u32,
    /// How long to stay open before probing with a half-open request.
    pub timeout: Duration,
    /// Base delay for [`CircuitBreaker::calculate_backoff`].
    pub base_delay: Duration,
    /// Cap for [`CircuitBreaker::calculate_backoff`].
    pub max_delay: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            timeout: Duration::from_secs(30),
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(1600),
        }
    }
}

/// Cumulative counters, exposed for health checks and admin diagnostics.
#[derive(Debug, Clone, Default)]
pub struct CircuitBreakerStats {
    pub total_calls: u64,
    pub successful_calls: u64,
    pub failed_calls: u64,
    pub rejected_calls: u64,
    pub consecutive_failures: u32,
    pub circuit_opened_count: u32,
}

struct State {
    circuit: CircuitState,
    stats: CircuitBreakerStats,
    last_failure_time: Option<Instant>,
}

impl Default for State {
    fn default() -> Self {
        Self {
            circuit: CircuitState::Closed,
            stats: CircuitBreakerStats::default(),
            last_failure_time: None,
        }
    }
}

/// Wraps upstream calls with failure counting and a fail-fast open state.
///
/// `name` identifies the protected backend in log lines and in the
/// `UpstreamUnavailable` message surfaced once the circuit trips, so an
/// operator can tell a Bolt outage from an LLM outage at a glance.
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    state: Arc<RwLock<State>>,
}

impl CircuitBreaker {
    #[must_use]
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        let name = name.into();
        info!(
            backend = %name,
            threshold = config.failure_threshold,
            timeout_ms = config.timeout.as_millis() as u64,
            "circuit breaker initialised"
        );
        Self {
            name,
            config,
            state: Arc::new(RwLock::new(State::default())),
        }
    }

    /// Run `operation`, protected by the circuit. Rejects immediately with
    /// `Error::UpstreamUnavailable` while the circuit is open; only errors
    /// for which [`Error::is_recoverable`] is true move the circuit towards
    /// open, so a validation-shaped error passed through by mistake never
    /// trips the breaker.
    pub async fn call<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if !self.should_allow_request().await {
            let mut state = self.state.write().await;
            state.stats.rejected_calls += 1;
            debug!(backend = %self.name, "circuit open, rejecting call");
            return Err(Error::UpstreamUnavailable(format!(
                "{} is unavailable (circuit breaker open)",
                self.name
            )));
        }

        {
            let mut state = self.state.write().await;
            state.stats.total_calls += 1;
        }

        let result = operation().await;
        self.on_result(&result).await;
        result
    }

    async fn should_allow_request(&self) -> bool {
        let now = Instant::now();
        let mut state = self.state.write().await;
        match state.circuit {
            CircuitState::Closed => true,
            CircuitState::Open => match state.last_failure_time {
                Some(last_failure) if now.duration_since(last_failure) >= self.config.timeout => {
                    info!(backend = %self.name, "circuit breaker probing half-open");
                    state.circuit = CircuitState::HalfOpen;
                    true
                }
                _ => false,
            },
            CircuitState::HalfOpen => true,
        }
    }

    async fn on_result<T>(&self, result: &Result<T>) {
        let mut state = self.state.write().await;
        match result {
            Ok(_) => {
                state.stats.successful_calls += 1;
                self.on_success(&mut state);
            }
            Err(e) if e.is_recoverable() => {
                state.stats.failed_calls += 1;
                self.on_failure(&mut state);
            }
            Err(_) => {}
        }
    }

    fn on_success(&self, state: &mut State) {
        match state.circuit {
            CircuitState::HalfOpen => {
                info!(backend = %self.name, "circuit breaker closing after recovery probe");
                state.circuit = CircuitState::Closed;
                state.stats.consecutive_failures = 0;
                state.last_failure_time = None;
            }
            CircuitState::Closed => {
                state.stats.consecutive_failures = 0;
            }
            CircuitState::Open => {
                warn!(backend = %self.name, "unexpected success while circuit open");
            }
        }
    }

    fn on_failure(&self, state: &mut State) {
        state.stats.consecutive_failures += 1;
        state.last_failure_time = Some(Instant::now());

        match state.circuit {
            CircuitState::Closed => {
                if state.stats.consecutive_failures >= self.config.failure_threshold {
                    warn!(
                        backend = %self.name,
                        failures = state.stats.consecutive_failures,
                        "circuit breaker opening"
                    );
                    state.circuit = CircuitState::Open;
                    state.stats.circuit_opened_count += 1;
                }
            }
            CircuitState::HalfOpen => {
                warn!(backend = %self.name, "recovery probe failed, reopening circuit");
                state.circuit = CircuitState::Open;
                state.stats.circuit_opened_count += 1;
            }
            CircuitState::Open => {}
        }
    }

    #[must_use]
    pub async fn state(&self) -> CircuitState {
        self.state.read().await.circuit
    }

    #[must_use]
    pub async fn stats(&self) -> CircuitBreakerStats {
        self.state.read().await.stats.clone()
    }

    /// Exponential backoff for callers that want to delay an external retry
    /// loop rather than call straight through the breaker again.
    #[must_use]
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        let delay = self.config.base_delay.as_millis() as u64 * 2u64.saturating_pow(attempt);
        std::cmp::min(Duration::from_millis(delay), self.config.max_delay)
    }

    pub async fn reset(&self) {
        let mut state = self.state.write().await;
        info!(backend = %self.name, "circuit breaker reset to closed");
        state.circuit = CircuitState::Closed;
        state.stats.consecutive_failures = 0;
        state.last_failure_time = None;
    }
}
