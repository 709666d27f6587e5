use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Task execution mode, as selected by the caller at submission time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskMode {
    Simple,
    #[default]
    Standard,
    Complex,
    Supervisor,
}

/// Requested model size tier; the router may respect or override it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelTier {
    Small,
    Medium,
    Large,
}

/// Request label priority. Unknown/invalid values fall back to `Normal`
/// (spec.md §6 "Priorities").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Critical,
    High,
    #[default]
    Normal,
    Low,
}

impl Priority {
    /// Parse a free-form priority label, defaulting to `Normal` on anything
    /// unrecognized rather than rejecting the request.
    pub fn parse_or_default(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "critical" => Priority::Critical,
            "high" => Priority::High,
            "low" => Priority::Low,
            "normal" => Priority::Normal,
            _ => Priority::Normal,
        }
    }
}

/// A reference to a precompiled template (spec.md §4.1 step 1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateRef {
    pub name: String,
    pub version: String,
}

/// `SubmitTask(req)` request body, spec.md §6.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitTaskRequest {
    pub query: String,
    pub session_id: String,
    pub user_id: String,
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub mode: Option<TaskMode>,
    #[serde(default)]
    pub model_tier: Option<ModelTier>,
    #[serde(default)]
    pub model_override: Option<String>,
    #[serde(default)]
    pub provider_override: Option<String>,
    #[serde(default)]
    pub context: HashMap<String, String>,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub template: Option<TemplateRef>,
    #[serde(default)]
    pub idempotency_key: Option<String>,
    #[serde(default)]
    pub traceparent: Option<String>,
}

/// `SubmitTask(req) -> resp` response body, spec.md §6.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitTaskResponse {
    pub task_id: String,
    pub workflow_id: String,
    pub run_id: String,
    pub status: TaskStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Queued,
    Running,
    Paused,
    Completed,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UsageSummary {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    pub cost_usd: f64,
}

/// `GetStatus(task_id)` response, spec.md §6 "Status".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetStatusResponse {
    pub status: TaskStatus,
    pub progress: f32,
    #[serde(default)]
    pub model_used: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
    pub usage: UsageSummary,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// `GetControlState(task_id)` response: whether the task can still accept
/// Pause/Resume/Cancel signals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlState {
    pub status: TaskStatus,
    pub pausable: bool,
    pub cancellable: bool,
    pub resumable: bool,
}
