use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// State of a circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operation — all calls pass through.
    Closed,
    /// Breaker tripped — calls are rejected.
    Open,
    /// Cooldown elapsed — one probe call allowed.
    HalfOpen,
}

/// A circuit breaker that opens after consecutive failures exceed a
/// threshold and closes again after a successful probe during half-open
/// state. Guards connect/probe failures for a single pool (§4.1's retry
/// classification feeds this).
pub struct CircuitBreaker {
    name: String,
    failure_count: AtomicU32,
    failure_threshold: u32,
    cooldown: Duration,
    inner: Mutex<CircuitInner>,
}

struct CircuitInner {
    state: CircuitState,
    last_failure: Option<Instant>,
}

impl CircuitBreaker {
    pub fn new(name: &str, failure_threshold: u32, cooldown_seconds: u64) -> Self {
        Self {
            name: name.to_string(),
            failure_count: AtomicU32::new(0),
            failure_threshold,
            cooldown: Duration::from_secs(cooldown_seconds),
            inner: Mutex::new(CircuitInner {
                state: CircuitState::Closed,
                last_failure: None,
            }),
        }
    }

    pub fn allow(&self) -> bool {
        let mut inner = self.inner.lock().unwrap();

        match inner.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                if let Some(last) = inner.last_failure {
                    if last.elapsed() >= self.cooldown {
                        inner.state = CircuitState::HalfOpen;
                        tracing::info!(circuit = %self.name, "circuit breaker transitioning to half-open");
                        true
                    } else {
                        false
                    }
                } else {
                    inner.state = CircuitState::Closed;
                    true
                }
            }
            CircuitState::HalfOpen => true,
        }
    }

    pub fn record_success(&self) {
        self.failure_count.store(0, Ordering::Relaxed);
        let mut inner = self.inner.lock().unwrap();

        if inner.state != CircuitState::Closed {
            tracing::info!(circuit = %self.name, previous_state = ?inner.state, "circuit breaker closing after success");
            inner.state = CircuitState::Closed;
            metrics::counter!("circuit_breaker.recoveries", "circuit" => self.name.clone())
                .increment(1);
        }
    }

    pub fn record_failure(&self) {
        let count = self.failure_count.fetch_add(1, Ordering::Relaxed) + 1;
        let mut inner = self.inner.lock().unwrap();

        inner.last_failure = Some(Instant::now());

        if count >= self.failure_threshold && inner.state != CircuitState::Open {
            tracing::warn!(
                circuit = %self.name,
                failures = count,
                threshold = self.failure_threshold,
                "circuit breaker open"
            );
            inner.state = CircuitState::Open;
            metrics::counter!("circuit_breaker.trips", "circuit" => self.name.clone()).increment(1);
        }
    }

    pub fn current_state(&self) -> CircuitState {
        self.inner.lock().unwrap().state
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Emit a gauge metric for the current state (0/0.5/1), for the
    /// periodic circuit-breaker metrics reporter (§4.5 ticker).
    pub fn report_metric(&self) {
        let value = match self.current_state() {
            CircuitState::Closed => 0.0,
            CircuitState::HalfOpen => 0.5,
            CircuitState::Open => 1.0,
        };
        metrics::gauge!("circuit_breaker.state", "circuit" => self.name.clone()).set(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_after_threshold_failures() {
        let cb = CircuitBreaker::new("test", 3, 60);
        assert!(cb.allow());
        cb.record_failure();
        cb.record_failure();
        assert_eq!(cb.current_state(), CircuitState::Closed);
        cb.record_failure();
        assert_eq!(cb.current_state(), CircuitState::Open);
        assert!(!cb.allow());
    }

    #[test]
    fn success_resets_failure_count_and_closes() {
        let cb = CircuitBreaker::new("test", 2, 60);
        cb.record_failure();
        cb.record_success();
        cb.record_failure();
        assert_eq!(cb.current_state(), CircuitState::Closed);
    }
}
