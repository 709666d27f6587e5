//! Rolling-window circuit breaker, spec.md §4.9 "`WithCircuitBreaker` trips
//! on rolling error rate over a window, default window 30s, error threshold
//! 0.5, min requests 20." Jittered retries live in activities, never in
//! workflow code — the breaker itself is activity-side state, driven by a
//! caller-supplied clock so it stays deterministic-testable.

use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::config::CircuitBreakerConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
}

struct Outcome {
    ts_ms: i64,
    success: bool,
}

/// One breaker per capability (e.g. "llm", "tool:search"). Not `Send`-unsafe:
/// internal mutability is behind `parking_lot::Mutex`.
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    outcomes: Mutex<VecDeque<Outcome>>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self { config, outcomes: Mutex::new(VecDeque::new()) }
    }

    fn prune(outcomes: &mut VecDeque<Outcome>, now_ms: i64, window_ms: i64) {
        while let Some(front) = outcomes.front() {
            if now_ms - front.ts_ms > window_ms {
                outcomes.pop_front();
            } else {
                break;
            }
        }
    }

    /// Record an activity outcome and report the resulting state.
    pub fn record(&self, now_ms: i64, success: bool) -> BreakerState {
        let window_ms = (self.config.window_secs as i64) * 1000;
        let mut outcomes = self.outcomes.lock();
        Self::prune(&mut outcomes, now_ms, window_ms);
        outcomes.push_back(Outcome { ts_ms: now_ms, success });
        self.state_locked(&outcomes)
    }

    pub fn state(&self, now_ms: i64) -> BreakerState {
        let window_ms = (self.config.window_secs as i64) * 1000;
        let mut outcomes = self.outcomes.lock();
        Self::prune(&mut outcomes, now_ms, window_ms);
        self.state_locked(&outcomes)
    }

    fn state_locked(&self, outcomes: &VecDeque<Outcome>) -> BreakerState {
        let total = outcomes.len() as u64;
        if total < self.config.min_requests {
            return BreakerState::Closed;
        }
        let errors = outcomes.iter().filter(|o| !o.success).count() as f64;
        if errors / total as f64 > self.config.error_threshold {
            BreakerState::Open
        } else {
            BreakerState::Closed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> CircuitBreakerConfig {
        CircuitBreakerConfig { window_secs: 30, error_threshold: 0.5, min_requests: 20 }
    }

    #[test]
    fn stays_closed_below_min_requests() {
        let breaker = CircuitBreaker::new(cfg());
        let mut state = BreakerState::Closed;
        for i in 0..19 {
            state = breaker.record(i * 100, false);
        }
        assert_eq!(state, BreakerState::Closed);
    }

    #[test]
    fn trips_open_past_error_threshold() {
        let breaker = CircuitBreaker::new(cfg());
        let mut state = BreakerState::Closed;
        for i in 0..20 {
            state = breaker.record(i * 100, false);
        }
        assert_eq!(state, BreakerState::Open);
    }

    #[test]
    fn outcomes_outside_window_are_pruned() {
        let breaker = CircuitBreaker::new(cfg());
        for i in 0..20 {
            breaker.record(i * 100, false);
        }
        // jump far past the 30s window; all prior failures age out
        let state = breaker.record(60_000, true);
        assert_eq!(state, BreakerState::Closed);
    }

    #[test]
    fn stays_closed_with_healthy_success_rate() {
        let breaker = CircuitBreaker::new(cfg());
        let mut state = BreakerState::Closed;
        for i in 0..30 {
            state = breaker.record(i * 100, i % 5 != 0); // 20% failure rate
        }
        assert_eq!(state, BreakerState::Closed);
    }
}
