use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A single turn retained in session history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryMessage {
    pub role: String,
    pub content: String,
    pub ts_ms: i64,
}

/// Persistent conversational state, spec.md §3 "Session". Created on first
/// reference; evicted on TTL or explicit deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub user_id: String,
    pub tenant_id: Option<String>,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
    pub expires_at_ms: i64,
    /// Bounded message list.
    pub history: Vec<HistoryMessage>,
    pub history_limit: usize,
    pub context: HashMap<String, String>,
    /// Per-agent memory map (agent_id -> free-form note blob).
    pub agent_states: HashMap<String, String>,

    pub total_tokens_used: u64,
    pub total_cost_usd: f64,
    pub task_count: u64,
    pub success_count: u64,
    pub failure_count: u64,
    pub budget_limit_tokens: u64,
    pub last_activity_ms: i64,
}

impl Session {
    pub fn new(
        session_id: impl Into<String>,
        user_id: impl Into<String>,
        tenant_id: Option<String>,
        ttl_ms: i64,
        now_ms: i64,
        budget_limit_tokens: u64,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            user_id: user_id.into(),
            tenant_id,
            created_at_ms: now_ms,
            updated_at_ms: now_ms,
            expires_at_ms: now_ms + ttl_ms,
            history: Vec::new(),
            history_limit: 200,
            context: HashMap::new(),
            agent_states: HashMap::new(),
            total_tokens_used: 0,
            total_cost_usd: 0.0,
            task_count: 0,
            success_count: 0,
            failure_count: 0,
            budget_limit_tokens,
            last_activity_ms: now_ms,
        }
    }

    /// Tenant-scoped visibility check, spec.md §4.11 "Sessions are
    /// tenant-scoped: lookups return NotFound if tenant mismatches", tested
    /// via property 7 in spec.md §8.
    pub fn visible_to_tenant(&self, tenant_id: Option<&str>) -> bool {
        self.tenant_id.as_deref() == tenant_id
    }

    pub fn push_history(&mut self, message: HistoryMessage) {
        self.history.push(message);
        if self.history.len() > self.history_limit {
            let excess = self.history.len() - self.history_limit;
            self.history.drain(0..excess);
        }
    }

    pub fn budget_remaining(&self) -> u64 {
        self.budget_limit_tokens.saturating_sub(self.total_tokens_used)
    }

    pub fn is_expired(&self, now_ms: i64) -> bool {
        now_ms >= self.expires_at_ms
    }
}
