//! Debate strategy, spec.md §4.5: N agents with distinct personas argue in
//! parallel, R rounds of cross-critique, then a judge selects or synthesizes
//! a consensus.

use serde_json::json;
use shannon_models::{RetryPolicy, Subtask};

use crate::activities::{self, Activities, DebateArgument, DebateConsensus, ExecuteAgentInput};
use crate::config::DebateConfig;
use crate::error::Result;
use crate::naming::main_subtask_name;
use crate::workflow::WorkflowContext;

use super::{StrategyInput, StrategyOutput};

const PERSONAS: &[&str] = &["advocate", "skeptic", "pragmatist", "contrarian", "synthesizer"];

async fn run_persona<A: Activities>(
    ctx: &WorkflowContext,
    activities: &A,
    input: &StrategyInput,
    persona: &str,
    prior: &[DebateArgument],
    agent_index: usize,
) -> Result<DebateArgument> {
    let critique_context: Vec<String> = prior
        .iter()
        .map(|a| format!("{} argued: {}", a.persona, a.content))
        .collect();
    let subtask = Subtask {
        index: agent_index,
        description: format!(
            "As the '{persona}' persona, argue your position on: {}. Address prior arguments if any.",
            input.query
        ),
        dependencies: Vec::new(),
        tool_allowlist: Vec::new(),
        token_budget: 1500,
        retry_policy: RetryPolicy::default(),
        best_effort: false,
    };
    let agent_name = main_subtask_name(&input.workflow_id, agent_index);
    let exec_input = ExecuteAgentInput {
        agent_name: agent_name.clone(),
        subtask,
        context_snippets: critique_context,
        memory_snippets: Vec::new(),
    };
    let exec_json = serde_json::to_value(&exec_input).unwrap_or_default();
    let invocation = ctx
        .run_activity(activities::names::EXECUTE_AGENT, exec_json, || {
            activities.execute_agent(exec_input)
        })
        .await?;
    Ok(DebateArgument { agent_name, persona: persona.to_string(), content: invocation.output_text })
}

pub async fn run<A: Activities>(
    ctx: &WorkflowContext,
    activities: &A,
    config: &DebateConfig,
    input: &StrategyInput,
) -> Result<StrategyOutput> {
    let mut output = StrategyOutput::new(String::new());
    let n = config.agents.max(1);
    let mut arguments: Vec<DebateArgument> = Vec::new();

    for i in 0..n {
        let persona = PERSONAS[i % PERSONAS.len()];
        let argument = run_persona(ctx, activities, input, persona, &[], i).await?;
        arguments.push(argument);
    }

    for _round in 0..config.rounds {
        let mut next_round = Vec::with_capacity(arguments.len());
        for (i, arg) in arguments.iter().enumerate() {
            let others: Vec<DebateArgument> =
                arguments.iter().filter(|a| a.persona != arg.persona).cloned().collect();
            let updated = run_persona(ctx, activities, input, &arg.persona, &others, n + i).await?;
            next_round.push(updated);
        }
        arguments = next_round;
    }

    let synthesis = ctx
        .run_activity(
            activities::names::SYNTHESIZE_RESULTS,
            json!({"query": input.query, "argument_count": arguments.len()}),
            || activities.synthesize_results(&input.query, &[], Some("debate_consensus")),
        )
        .await?;

    let winner = arguments.first().map(|a| a.content.clone());
    let consensus = DebateConsensus {
        winning_argument: winner,
        synthesis: synthesis.clone(),
        scores: arguments.iter().map(|a| (a.persona.clone(), 1.0 / arguments.len() as f32)).collect(),
    };
    ctx.run_activity(
        activities::names::PERSIST_DEBATE_CONSENSUS,
        json!({"session_id": input.session_id, "argument_count": arguments.len()}),
        || activities.persist_debate_consensus(&input.session_id, &arguments, &consensus),
    )
    .await?;

    output.text = synthesis;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activities::DefaultActivities;
    use crate::bus::StreamBus;
    use crate::capability::mock::{canned, MockLlmClient};
    use crate::capability::ToolRegistry;
    use shannon_storage::Storage;
    use std::sync::Arc;

    #[tokio::test]
    async fn debate_runs_configured_agents_and_rounds() {
        let (storage, _tmp) = Storage::open_temp().unwrap();
        let llm = MockLlmClient::with_script(vec![
            canned("a1"), canned("a2"), canned("a3"),
            canned("a1-r1"), canned("a2-r1"), canned("a3-r1"),
            canned("final synthesis"),
        ]);
        let acts = DefaultActivities::new(
            Arc::new(llm),
            Arc::new(ToolRegistry::new()),
            Arc::new(storage.patterns),
            Arc::new(StreamBus::new(100)),
        );
        let ctx = WorkflowContext::recording("wf-debate", Arc::new(crate::workflow::SignalBus::new()));
        let input = StrategyInput {
            workflow_id: "wf-debate".into(),
            query: "should we use microservices".into(),
            session_id: "s1".into(),
            complexity_score: 0.6,
            require_citations: false,
            template_hint: None,
            tool_allowlist: Vec::new(),
        };
        let cfg = DebateConfig { agents: 3, rounds: 1 };
        let out = run(&ctx, &acts, &cfg, &input).await.unwrap();
        assert_eq!(out.text, "final synthesis");
    }
}
