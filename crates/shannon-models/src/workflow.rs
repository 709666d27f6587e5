use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::agent::UsageTotals;

/// Durable record lifecycle, spec.md §3 "Workflow Execution".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowLifecycle {
    Scheduled,
    Running,
    Paused,
    Cancelled,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowExecution {
    pub workflow_id: String,
    pub run_id: String,
    pub task_id: String,
    pub lifecycle: WorkflowLifecycle,
    pub events: Vec<WorkflowEvent>,
}

impl WorkflowExecution {
    pub fn new(workflow_id: impl Into<String>, run_id: impl Into<String>, task_id: impl Into<String>) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            run_id: run_id.into(),
            task_id: task_id.into(),
            lifecycle: WorkflowLifecycle::Scheduled,
            events: Vec::new(),
        }
    }
}

/// A typed event emitted during workflow execution, pre-wire-envelope form
/// (see `shannon_contracts::StreamEnvelope` for the transport shape).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowEvent {
    pub seq: u64,
    pub ts_ms: i64,
    pub kind: WorkflowEventKind,
    pub agent_id: Option<String>,
    pub payload: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WorkflowEventKind {
    WorkflowStarted,
    AgentStarted,
    AgentThinking,
    ToolInvoked,
    ToolObserved,
    LlmOutput,
    Progress,
    AgentCompleted,
    DataProcessing,
    TeamStatus,
    ApprovalRequested,
    ApprovalDecided,
    WorkflowCompleted { usage: UsageTotals },
    WorkflowFailed { kind: String, message: String, partial_usage: UsageTotals },
    WorkflowCancelled,
}
