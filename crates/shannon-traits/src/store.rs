//! Narrow persistence interfaces. `shannon-storage` provides the `redb`-backed
//! implementations; `shannon-core` depends only on these traits.

use async_trait::async_trait;

use shannon_models::agent::AgentInvocation;
use shannon_models::{BudgetLedger, PatternRecord, Session};

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, session_id: &str) -> anyhow::Result<Option<Session>>;
    async fn put(&self, session: &Session) -> anyhow::Result<()>;
    async fn delete(&self, session_id: &str) -> anyhow::Result<bool>;
}

#[async_trait]
pub trait BudgetStore: Send + Sync {
    async fn get(&self, session_id: &str) -> anyhow::Result<Option<BudgetLedger>>;
    async fn put(&self, ledger: &BudgetLedger) -> anyhow::Result<()>;
}

#[async_trait]
pub trait PatternStore: Send + Sync {
    async fn append(&self, record: PatternRecord) -> anyhow::Result<()>;
    async fn recent_for_strategy(
        &self,
        strategy: shannon_models::Strategy,
        limit: usize,
    ) -> anyhow::Result<Vec<PatternRecord>>;
    async fn all_recent(&self, limit: usize) -> anyhow::Result<Vec<PatternRecord>>;
}

/// Append-only audit trail for agent/tool executions, spec.md §2 C11
/// "Async writers for agent/tool execution records".
#[async_trait]
pub trait ExecutionStore: Send + Sync {
    async fn append(&self, workflow_id: &str, record: AgentInvocation) -> anyhow::Result<()>;
    async fn for_workflow(&self, workflow_id: &str) -> anyhow::Result<Vec<AgentInvocation>>;
}
