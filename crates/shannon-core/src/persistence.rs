//! Persistence writers, spec.md §2 C11: "Async writers for agent/tool
//! execution records and token ledgers." Token-ledger writes already live
//! on `BudgetManager::record_token_usage` (C3 owns the ledger's invariants);
//! this module is the execution-record half, an append-only audit log
//! backed by `shannon_storage::ExecutionStorage`.

use std::sync::Arc;

use shannon_models::agent::AgentInvocation;
use shannon_traits::ExecutionStore;

use crate::error::Result;

pub struct ExecutionWriter<E: ExecutionStore> {
    store: Arc<E>,
}

impl<E: ExecutionStore> ExecutionWriter<E> {
    pub fn new(store: Arc<E>) -> Self {
        Self { store }
    }

    /// `PersistAgentExecution*`: writes every invocation a strategy produced
    /// for a single workflow run. Best-effort in spirit but surfaces errors
    /// to the caller (the router) rather than swallowing them, since a
    /// silently-lost audit record defeats the point of C11.
    pub async fn persist_agent_executions(
        &self,
        workflow_id: &str,
        invocations: &[AgentInvocation],
    ) -> Result<()> {
        for invocation in invocations {
            self.store.append(workflow_id, invocation.clone()).await?;
        }
        Ok(())
    }

    pub async fn executions_for_workflow(&self, workflow_id: &str) -> Result<Vec<AgentInvocation>> {
        Ok(self.store.for_workflow(workflow_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shannon_models::agent::InvocationStatus;
    use shannon_storage::Storage;
    use std::time::Duration;

    fn sample(agent_name: &str) -> AgentInvocation {
        AgentInvocation {
            agent_name: agent_name.to_string(),
            subtask_index: 0,
            prompt: "p".into(),
            context_snippets: Vec::new(),
            memory_snippets: Vec::new(),
            tool_allowlist: Vec::new(),
            output_text: "o".into(),
            tool_calls: Vec::new(),
            prompt_tokens: 1,
            completion_tokens: 1,
            cost_usd: 0.0,
            model: "m".into(),
            provider: "p".into(),
            latency: Duration::from_millis(1),
            status: InvocationStatus::Ok,
        }
    }

    #[tokio::test]
    async fn persists_and_reads_back_in_order() {
        let (storage, _tmp) = Storage::open_temp().unwrap();
        let writer = ExecutionWriter::new(Arc::new(storage.executions));
        writer
            .persist_agent_executions("wf-1", &[sample("a"), sample("b")])
            .await
            .unwrap();
        let records = writer.executions_for_workflow("wf-1").await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].agent_name, "a");
        assert_eq!(records[1].agent_name, "b");
    }
}
