use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationStatus {
    Ok,
    Retried,
    Failed,
}

/// An execution of a Subtask by a named agent, spec.md §3 "Agent
/// Invocation".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentInvocation {
    pub agent_name: String,
    pub subtask_index: usize,
    pub prompt: String,
    pub context_snippets: Vec<String>,
    pub memory_snippets: Vec<String>,
    pub tool_allowlist: Vec<String>,

    pub output_text: String,
    pub tool_calls: Vec<ToolCall>,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub cost_usd: f64,
    pub model: String,
    pub provider: String,
    pub latency: Duration,
    pub status: InvocationStatus,
}

/// A name + parameters + timeout + cache key, spec.md §3 "Tool Call".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub call_id: String,
    pub name: String,
    pub parameters: Value,
    pub timeout: Duration,
    pub cache_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ToolCallOutcome {
    Output(Value),
    Error { kind: String, message: String },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageTotals {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub cost_usd: f64,
}

impl UsageTotals {
    pub fn add(&mut self, other: &UsageTotals) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.cost_usd += other.cost_usd;
    }
}

/// Per-subtask bookkeeping retained so routers/strategies can report
/// aggregate tokens/cost without re-deriving them from raw invocations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionTally {
    pub totals: UsageTotals,
    pub by_agent: HashMap<String, UsageTotals>,
}

impl ExecutionTally {
    pub fn record(&mut self, invocation: &AgentInvocation) {
        let usage = UsageTotals {
            prompt_tokens: invocation.prompt_tokens,
            completion_tokens: invocation.completion_tokens,
            cost_usd: invocation.cost_usd,
        };
        self.totals.add(&usage);
        self.by_agent
            .entry(invocation.agent_name.clone())
            .or_default()
            .add(&usage);
    }
}
