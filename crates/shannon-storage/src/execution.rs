use anyhow::Result;
use async_trait::async_trait;

use crate::{define_simple_storage, SimpleStorage};
use shannon_models::agent::AgentInvocation;
use shannon_traits::ExecutionStore;

define_simple_storage! {
    /// Append-only agent/tool execution records, spec.md §2 C11. Keyed by
    /// `{workflow_id}#{seq:020}` so `for_workflow` can prefix-scan in
    /// insertion order without a secondary index.
    pub struct ExecutionStorage { table: "executions" }
}

impl ExecutionStorage {
    fn key(&self, workflow_id: &str, seq: u64) -> String {
        format!("{workflow_id}#{seq:020}")
    }
}

#[async_trait]
impl ExecutionStore for ExecutionStorage {
    async fn append(&self, workflow_id: &str, record: AgentInvocation) -> Result<()> {
        let seq = self.count()? as u64;
        let key = self.key(workflow_id, seq);
        let bytes = bincode::serde::encode_to_vec(&record, bincode::config::standard())?;
        self.put_raw(&key, &bytes)
    }

    async fn for_workflow(&self, workflow_id: &str) -> Result<Vec<AgentInvocation>> {
        let prefix = format!("{workflow_id}#");
        let mut rows: Vec<(String, Vec<u8>)> =
            self.list_raw()?.into_iter().filter(|(k, _)| k.starts_with(&prefix)).collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0));
        let mut records = Vec::with_capacity(rows.len());
        for (_, bytes) in rows {
            let (record, _): (AgentInvocation, usize) =
                bincode::serde::decode_from_slice(&bytes, bincode::config::standard())?;
            records.push(record);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shannon_models::agent::InvocationStatus;
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
            prompt_tokens: 10,
            completion_tokens: 5,
            cost_usd: 0.001,
            model: "m".into(),
            provider: "p".into(),
            latency: Duration::from_millis(5),
            status: InvocationStatus::Ok,
        }
    }

    #[tokio::test]
    async fn records_are_scoped_and_ordered_per_workflow() {
        let dir = tempfile::tempdir().unwrap();
        let db = std::sync::Arc::new(redb::Database::create(dir.path().join("e.redb")).unwrap());
        let store = ExecutionStorage::new(db).unwrap();

        store.append("wf-1", sample("agent-a")).await.unwrap();
        store.append("wf-1", sample("agent-b")).await.unwrap();
        store.append("wf-2", sample("agent-c")).await.unwrap();

        let wf1 = store.for_workflow("wf-1").await.unwrap();
        assert_eq!(wf1.len(), 2);
        assert_eq!(wf1[0].agent_name, "agent-a");
        assert_eq!(wf1[1].agent_name, "agent-b");

        let wf2 = store.for_workflow("wf-2").await.unwrap();
        assert_eq!(wf2.len(), 1);
    }
}
