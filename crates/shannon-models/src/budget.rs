use serde::{Deserialize, Serialize};

/// Per-session and per-task counters, spec.md §3 "Budget Ledger". Monotonic;
/// only incremented via the ledger activity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetLedger {
    pub session_id: String,
    pub tokens_consumed: u64,
    pub tokens_allowed: u64,
    pub cost_consumed_usd: f64,
    pub cost_allowed_usd: f64,
    pub last_update_ms: i64,
    pub breach: Option<BudgetBreach>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BudgetBreach {
    TokensExceeded,
    CostExceeded,
}

impl BudgetLedger {
    pub fn new(session_id: impl Into<String>, tokens_allowed: u64, cost_allowed_usd: f64) -> Self {
        Self {
            session_id: session_id.into(),
            tokens_consumed: 0,
            tokens_allowed,
            cost_consumed_usd: 0.0,
            cost_allowed_usd,
            last_update_ms: 0,
            breach: None,
        }
    }

    pub fn tokens_remaining(&self) -> u64 {
        self.tokens_allowed.saturating_sub(self.tokens_consumed)
    }

    pub fn cost_remaining_usd(&self) -> f64 {
        (self.cost_allowed_usd - self.cost_consumed_usd).max(0.0)
    }

    /// Atomic increment. Breach flips status exactly once (spec.md §3
    /// invariant: "a breach flips status once and emits exactly one
    /// event") — callers check `just_breached` on the returned bool to
    /// decide whether to emit the one-time event.
    pub fn record_usage(&mut self, tokens: u64, cost_usd: f64, now_ms: i64) -> bool {
        let was_breached = self.breach.is_some();
        self.tokens_consumed += tokens;
        self.cost_consumed_usd += cost_usd;
        self.last_update_ms = now_ms;

        if self.breach.is_none() {
            if self.tokens_consumed > self.tokens_allowed {
                self.breach = Some(BudgetBreach::TokensExceeded);
            } else if self.cost_consumed_usd > self.cost_allowed_usd {
                self.breach = Some(BudgetBreach::CostExceeded);
            }
        }
        self.breach.is_some() && !was_breached
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_are_monotonic_and_breach_fires_once() {
        let mut ledger = BudgetLedger::new("s1", 100, 1.0);
        assert!(!ledger.record_usage(50, 0.1, 1));
        assert_eq!(ledger.tokens_consumed, 50);
        assert!(ledger.record_usage(60, 0.1, 2));
        assert!(ledger.breach.is_some());
        // second breach-causing call does not re-flip
        assert!(!ledger.record_usage(10, 0.0, 3));
        assert_eq!(ledger.tokens_consumed, 120);
    }
}
