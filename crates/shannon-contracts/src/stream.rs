use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Closed enumeration of streaming-bus event types, spec.md §4.12.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
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
    WorkflowCompleted,
    WorkflowFailed,
    WorkflowCancelled,
}

/// A single event on the wire, spec.md §4.12: `{workflow_id, seq, ts, type,
/// agent_id?, payload}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamEnvelope {
    pub workflow_id: String,
    pub seq: u64,
    pub ts_ms: i64,
    #[serde(rename = "type")]
    pub event_type: EventType,
    #[serde(default)]
    pub agent_id: Option<String>,
    pub payload: Value,
}

/// `GET /stream/sse?workflow_id=...&types=...&cursor=...` query shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamFilter {
    pub workflow_id: String,
    /// Comma-separated type list at the wire boundary; parsed here.
    #[serde(default)]
    pub types: Vec<EventType>,
    #[serde(default)]
    pub cursor: Option<u64>,
}

impl StreamFilter {
    pub fn matches(&self, event: &StreamEnvelope) -> bool {
        if let Some(cursor) = self.cursor {
            if event.seq < cursor {
                return false;
            }
        }
        self.types.is_empty() || self.types.contains(&event.event_type)
    }
}
