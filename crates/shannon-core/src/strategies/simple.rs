//! Simple path: one agent, one activity, no decomposition. The baseline
//! every other strategy degrades to (spec.md §4.1 mode-driven rule
//! `simple -> Simple`; §4.2 edge case "empty decomposition -> degrade to
//! Simple").

use serde_json::json;
use shannon_models::{RetryPolicy, Subtask};

use crate::activities::{self, Activities, ExecuteAgentInput};
use crate::error::Result;
use crate::naming::main_subtask_name;
use crate::workflow::WorkflowContext;

use super::{StrategyInput, StrategyOutput};

pub async fn run<A: Activities>(
    ctx: &WorkflowContext,
    activities: &A,
    input: &StrategyInput,
) -> Result<StrategyOutput> {
    let subtask = Subtask {
        index: 0,
        description: input.query.clone(),
        dependencies: Vec::new(),
        tool_allowlist: input.tool_allowlist.clone(),
        token_budget: 4000,
        retry_policy: RetryPolicy::default(),
        best_effort: false,
    };
    let agent_name = main_subtask_name(&input.workflow_id, 0);
    let exec_input = ExecuteAgentInput {
        agent_name: agent_name.clone(),
        subtask,
        context_snippets: Vec::new(),
        memory_snippets: Vec::new(),
    };
    let exec_input_json = serde_json::to_value(&exec_input)
        .unwrap_or_else(|_| json!({"agent_name": agent_name}));

    let invocation = ctx
        .run_activity(activities::names::EXECUTE_AGENT, exec_input_json, || {
            activities.execute_agent(exec_input)
        })
        .await?;

    let mut output = StrategyOutput::new(invocation.output_text.clone());
    output.record(invocation);
    Ok(output)
}
