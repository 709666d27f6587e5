//! Budget & policy enforcement gateway, spec.md §4.9 (C3).

pub mod circuit_breaker;
pub mod degradation;

use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use shannon_models::{BudgetBreach, BudgetLedger};
use shannon_traits::BudgetStore;

use crate::config::BudgetConfig;
use crate::error::{Result, ShannonError};
use circuit_breaker::{BreakerState, CircuitBreaker};

/// Result of `CheckTokenBudget`, spec.md §4.9.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetCheck {
    pub allow: bool,
    pub remaining: u64,
    pub reason: Option<String>,
}

/// Result of `CheckTokenBudgetWithBackpressure`: the same decision plus a
/// suggested wait before retrying, spec.md §4.9/§5 "Budget backpressure
/// returns a wait hint".
#[derive(Debug, Clone)]
pub struct BackpressureCheck {
    pub check: BudgetCheck,
    pub wait_hint_ms: Option<u64>,
}

/// Read-only snapshot, spec.md §4.9 `GenerateUsageReport`.
#[derive(Debug, Clone)]
pub struct UsageReport {
    pub session_id: String,
    pub tokens_consumed: u64,
    pub tokens_allowed: u64,
    pub cost_consumed_usd: f64,
    pub cost_allowed_usd: f64,
    pub breach: Option<BudgetBreach>,
}

/// The budget ledger + circuit breaker gateway every budgeted activity
/// consults first. One `BudgetManager` is shared process-wide; per-capability
/// breakers are created lazily, matching spec.md §5's "in-memory caches...
/// each with explicit locking" shared-resource policy.
pub struct BudgetManager<S: BudgetStore> {
    store: Arc<S>,
    config: BudgetConfig,
    breakers: DashMap<String, Arc<CircuitBreaker>>,
}

impl<S: BudgetStore> BudgetManager<S> {
    pub fn new(store: Arc<S>, config: BudgetConfig) -> Self {
        Self { store, config, breakers: DashMap::new() }
    }

    fn breaker_for(&self, capability: &str) -> Arc<CircuitBreaker> {
        self.breakers
            .entry(capability.to_string())
            .or_insert_with(|| Arc::new(CircuitBreaker::new(self.config.circuit_breaker.clone())))
            .clone()
    }

    pub async fn check_token_budget(
        &self,
        session_id: &str,
        estimated_tokens: u64,
        default_allowed: u64,
    ) -> Result<BudgetCheck> {
        let ledger = match self.store.get(session_id).await? {
            Some(l) => l,
            None => BudgetLedger::new(session_id, default_allowed, f64::MAX),
        };
        if ledger.breach.is_some() {
            return Ok(BudgetCheck {
                allow: false,
                remaining: 0,
                reason: Some("budget already breached".to_string()),
            });
        }
        let remaining = ledger.tokens_remaining();
        if estimated_tokens > remaining {
            return Ok(BudgetCheck {
                allow: false,
                remaining,
                reason: Some(format!(
                    "estimated {estimated_tokens} tokens exceeds remaining {remaining}"
                )),
            });
        }
        Ok(BudgetCheck { allow: true, remaining, reason: None })
    }

    pub async fn check_token_budget_with_backpressure(
        &self,
        session_id: &str,
        estimated_tokens: u64,
        default_allowed: u64,
        attempt: u32,
    ) -> Result<BackpressureCheck> {
        let check = self.check_token_budget(session_id, estimated_tokens, default_allowed).await?;
        let wait_hint_ms = if check.allow {
            None
        } else if attempt < self.config.max_backpressure_waits {
            // exponential: 250ms, 500ms, 1000ms...
            Some(250u64 << attempt)
        } else {
            None
        };
        Ok(BackpressureCheck { check, wait_hint_ms })
    }

    /// `WithCircuitBreaker`: consult the named capability's breaker; callers
    /// pass `now_ms` from an activity (never read wall-clock in workflow
    /// code, spec.md §9 Design Notes).
    pub fn check_circuit_breaker(&self, capability: &str, now_ms: i64) -> Result<()> {
        let breaker = self.breaker_for(capability);
        if breaker.state(now_ms) == BreakerState::Open {
            return Err(ShannonError::ServiceUnavailable(format!(
                "circuit open for capability '{capability}'"
            )));
        }
        Ok(())
    }

    pub fn record_circuit_outcome(&self, capability: &str, now_ms: i64, success: bool) {
        self.breaker_for(capability).record(now_ms, success);
    }

    /// `RecordTokenUsage`: atomic increment, returns true exactly once when
    /// this call causes a breach (spec.md §3 invariant).
    pub async fn record_token_usage(
        &self,
        session_id: &str,
        tokens: u64,
        cost_usd: f64,
        now_ms: i64,
        default_allowed: u64,
    ) -> Result<bool> {
        let mut ledger = self
            .store
            .get(session_id)
            .await?
            .unwrap_or_else(|| BudgetLedger::new(session_id, default_allowed, f64::MAX));
        let just_breached = ledger.record_usage(tokens, cost_usd, now_ms);
        self.store.put(&ledger).await?;
        Ok(just_breached)
    }

    pub async fn usage_report(&self, session_id: &str) -> Result<Option<UsageReport>> {
        let ledger = self.store.get(session_id).await?;
        Ok(ledger.map(|l| UsageReport {
            session_id: l.session_id,
            tokens_consumed: l.tokens_consumed,
            tokens_allowed: l.tokens_allowed,
            cost_consumed_usd: l.cost_consumed_usd,
            cost_allowed_usd: l.cost_allowed_usd,
            breach: l.breach,
        }))
    }
}
