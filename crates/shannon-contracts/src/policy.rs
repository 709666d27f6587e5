use serde::{Deserialize, Serialize};

use crate::task::TaskMode;

/// Policy decision input, spec.md §6 "Policy decision input".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyDecisionInput {
    pub query: String,
    pub user_id: String,
    pub tenant_id: Option<String>,
    pub mode: TaskMode,
    pub token_budget: u64,
    pub agent_id: Option<String>,
    pub environment: Environment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Dev,
    Staging,
    Production,
}

impl Default for Environment {
    /// Fail-safe default: an unconfigured deployment gets full policy
    /// enforcement, not the `Dev` short-circuit.
    fn default() -> Self {
        Environment::Production
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyDecisionOutput {
    pub allow: bool,
    pub reason: Option<String>,
    pub require_approval: bool,
}
