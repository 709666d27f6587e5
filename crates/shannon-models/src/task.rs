use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use shannon_contracts::{ModelTier, Priority, TaskContext, TaskMode, TemplateRef};

/// An immutable request, spec.md §3 "Task". Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub task_id: String,
    pub query: String,
    pub session_id: String,
    pub user_id: String,
    pub tenant_id: Option<String>,
    pub mode: TaskMode,
    pub model_tier: Option<ModelTier>,
    pub model_override: Option<String>,
    pub provider_override: Option<String>,
    pub template: Option<TemplateRef>,
    pub role: Option<String>,
    pub force_research: bool,
    pub context: TaskContext,
    pub labels: HashMap<String, String>,
    pub priority: Priority,
    pub idempotency_key: Option<String>,
    pub created_at_ms: i64,
}

impl Task {
    /// Priority derived from `labels["priority"]`, falling back to `Normal`
    /// per spec.md §6 "Priorities".
    pub fn priority_from_labels(labels: &HashMap<String, String>) -> Priority {
        labels
            .get("priority")
            .map(|raw| Priority::parse_or_default(raw))
            .unwrap_or_default()
    }
}
