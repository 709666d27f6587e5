//! ReAct strategy, spec.md §4.3: Think -> Act -> Observe -> (Think | Final),
//! iterated up to `max_iterations` with a stuck-detector over a hash of the
//! scratchpad.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde_json::json;
use shannon_models::{RetryPolicy, Subtask};

use crate::activities::{self, Activities, ExecuteAgentInput};
use crate::config::ReactConfig;
use crate::error::Result;
use crate::naming::main_subtask_name;
use crate::workflow::WorkflowContext;

use super::{StrategyInput, StrategyOutput};

fn scratchpad_hash(scratchpad: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    scratchpad.hash(&mut hasher);
    hasher.finish()
}

pub async fn run<A: Activities>(
    ctx: &WorkflowContext,
    activities: &A,
    config: &ReactConfig,
    input: &StrategyInput,
) -> Result<StrategyOutput> {
    let mut output = StrategyOutput::new(String::new());
    let mut scratchpad = String::new();
    let mut recent_hashes: Vec<u64> = Vec::new();

    for iteration in 0..config.max_iterations {
        let agent_name = main_subtask_name(&input.workflow_id, iteration as usize);
        let think_subtask = Subtask {
            index: iteration as usize,
            description: format!(
                "Task: {}\nScratchpad so far:\n{scratchpad}\nDecide the next action or give a final answer.",
                input.query
            ),
            dependencies: Vec::new(),
            tool_allowlist: input.tool_allowlist.clone(),
            token_budget: 1500,
            retry_policy: RetryPolicy::default(),
            best_effort: false,
        };
        let exec_input = ExecuteAgentInput {
            agent_name,
            subtask: think_subtask,
            context_snippets: Vec::new(),
            memory_snippets: Vec::new(),
        };
        let exec_json = serde_json::to_value(&exec_input).unwrap_or_default();
        let invocation = ctx
            .run_activity(activities::names::EXECUTE_AGENT, exec_json, || {
                activities.execute_agent(exec_input)
            })
            .await?;

        let is_final = invocation.tool_calls.is_empty();
        scratchpad.push_str(&format!("\n[iter {iteration}] {}", invocation.output_text));
        // Stuck-detector hashes the fresh observation only, not the
        // ever-growing scratchpad (which always differs once the iteration
        // counter is folded in) — spec.md §4.3 "no progress ... by hash of
        // scratchpad" means no *new* information, not literal byte equality
        // of the accumulated log.
        let observation_hash = scratchpad_hash(&invocation.output_text);
        output.record(invocation);

        if is_final {
            output.text = scratchpad.trim().to_string();
            return Ok(output);
        }

        recent_hashes.push(observation_hash);
        let window = config.stuck_window as usize;
        if recent_hashes.len() >= window {
            let tail = &recent_hashes[recent_hashes.len() - window..];
            if tail.iter().all(|h| *h == tail[0]) {
                output.satisfactory = false;
                break;
            }
        }
    }

    // Exhausted iterations (or stuck): synthesize whatever the scratchpad has.
    let final_text = ctx
        .run_activity(
            activities::names::SYNTHESIZE_RESULTS,
            json!({"query": input.query, "scratchpad_len": scratchpad.len()}),
            || activities.synthesize_results(&input.query, &output.invocations, input.template_hint.as_deref()),
        )
        .await?;
    output.text = final_text;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activities::DefaultActivities;
    use crate::bus::StreamBus;
    use crate::capability::mock::{canned, MockLlmClient};
    use crate::capability::ToolRegistry;
    use shannon_traits::{CompletionResponse, FinishReason, ToolCallRequest};
    use shannon_storage::Storage;
    use std::sync::Arc;

    fn base_input() -> StrategyInput {
        StrategyInput {
            workflow_id: "wf-react".into(),
            query: "what is the capital of France".into(),
            session_id: "s1".into(),
            complexity_score: 0.2,
            require_citations: false,
            template_hint: None,
            tool_allowlist: vec!["lookup".into()],
        }
    }

    #[tokio::test]
    async fn terminates_on_tool_free_response() {
        let (storage, _tmp) = Storage::open_temp().unwrap();
        let llm = MockLlmClient::with_script(vec![canned("Paris.")]);
        let acts = DefaultActivities::new(
            Arc::new(llm),
            Arc::new(ToolRegistry::new()),
            Arc::new(storage.patterns),
            Arc::new(StreamBus::new(100)),
        );
        let ctx = WorkflowContext::recording("wf-react", Arc::new(crate::workflow::SignalBus::new()));
        let out = run(&ctx, &acts, &ReactConfig::default(), &base_input()).await.unwrap();
        assert_eq!(out.invocations.len(), 1);
        assert!(out.text.contains("Paris"));
    }

    #[tokio::test]
    async fn stuck_detector_breaks_loop_before_max_iterations() {
        let (storage, _tmp) = Storage::open_temp().unwrap();
        let repeated = CompletionResponse {
            content: "still thinking".into(),
            tool_calls: vec![ToolCallRequest { id: "t1".into(), name: "lookup".into(), arguments: json!({}) }],
            finish_reason: FinishReason::ToolCalls,
            prompt_tokens: 10,
            completion_tokens: 5,
            cost_usd: 0.0,
            model: "mock".into(),
            provider: "mock".into(),
        };
        let llm = MockLlmClient::with_script(vec![repeated.clone(); 10]);
        let acts = DefaultActivities::new(
            Arc::new(llm),
            Arc::new(ToolRegistry::new()),
            Arc::new(storage.patterns),
            Arc::new(StreamBus::new(100)),
        );
        let ctx = WorkflowContext::recording("wf-react-stuck", Arc::new(crate::workflow::SignalBus::new()));
        let cfg = ReactConfig { max_iterations: 15, stuck_window: 3 };
        let out = run(&ctx, &acts, &cfg, &base_input()).await.unwrap();
        assert!(out.invocations.len() < 15);
        assert!(!out.satisfactory);
    }
}
