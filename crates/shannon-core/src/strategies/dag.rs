//! DAG strategy, spec.md §4.2 (C6): decompose -> fan-out execute -> optional
//! reflection -> synthesize, over a ready-set/dependency-satisfaction loop.

use std::collections::HashSet;

use serde_json::json;
use shannon_models::Subtask;

use crate::activities::{self, Activities, DecomposeTaskInput, ExecuteAgentInput};
use crate::config::DagConfig;
use crate::error::Result;
use crate::naming::main_subtask_name;
use crate::workflow::WorkflowContext;

use super::{simple, StrategyInput, StrategyOutput};

/// Compute the set of subtask indices whose dependencies are all present in
/// `done`, excluding those already done.
fn ready_set(subtasks: &[Subtask], done: &HashSet<usize>) -> Vec<usize> {
    subtasks
        .iter()
        .filter(|s| !done.contains(&s.index) && s.dependencies.iter().all(|d| done.contains(d)))
        .map(|s| s.index)
        .collect()
}

pub async fn run<A: Activities>(
    ctx: &WorkflowContext,
    activities: &A,
    config: &DagConfig,
    input: &StrategyInput,
) -> Result<StrategyOutput> {
    let decompose_input = DecomposeTaskInput { query: input.query.clone(), max_subtasks: 12 };
    let decompose_json = serde_json::to_value(&decompose_input).unwrap_or_default();
    let subtasks: Vec<Subtask> = ctx
        .run_activity(activities::names::DECOMPOSE_TASK, decompose_json, || {
            activities.decompose_task(decompose_input)
        })
        .await?;

    if subtasks.is_empty() {
        // spec.md §4.2 edge case: empty decomposition degrades to Simple.
        return simple::run(ctx, activities, input).await;
    }
    if subtasks.len() == 1 {
        return run_single(ctx, activities, &subtasks[0], input).await;
    }

    let mut output = StrategyOutput::new(String::new());
    let mut done: HashSet<usize> = HashSet::new();
    let mut failed: HashSet<usize> = HashSet::new();
    let mut context_by_index: std::collections::HashMap<usize, String> = std::collections::HashMap::new();
    let by_index: std::collections::HashMap<usize, &Subtask> =
        subtasks.iter().map(|s| (s.index, s)).collect();

    loop {
        let ready = ready_set(&subtasks, &done);
        let ready: Vec<usize> = ready
            .into_iter()
            .filter(|i| !failed.contains(i))
            .collect();
        if ready.is_empty() {
            break;
        }
        // Bounded fan-out: process the ready set in chunks of at most
        // `max_parallel`; within a chunk no completion order is guaranteed
        // to matter (spec.md §5), so sequential execution inside the chunk
        // is semantically equivalent to parallel dispatch for this
        // in-process surrogate.
        for chunk in ready.chunks(config.max_parallel.max(1)) {
            for &idx in chunk {
                let subtask = by_index[&idx].clone();
                let context_snippets: Vec<String> = subtask
                    .dependencies
                    .iter()
                    .filter_map(|d| context_by_index.get(d).cloned())
                    .collect();
                let agent_name = main_subtask_name(&input.workflow_id, idx);
                let exec_input = ExecuteAgentInput {
                    agent_name,
                    subtask: subtask.clone(),
                    context_snippets,
                    memory_snippets: Vec::new(),
                };
                let exec_json = serde_json::to_value(&exec_input).unwrap_or_default();
                let result = ctx
                    .run_activity(activities::names::EXECUTE_AGENT, exec_json, || {
                        activities.execute_agent(exec_input)
                    })
                    .await;
                match result {
                    Ok(invocation) => {
                        context_by_index.insert(idx, invocation.output_text.clone());
                        output.record(invocation);
                        done.insert(idx);
                    }
                    Err(err) => {
                        failed.insert(idx);
                        done.insert(idx);
                        if !subtask.best_effort {
                            mark_downstream_skipped(&subtasks, idx, &mut failed, &mut done);
                        } else {
                            context_by_index.insert(idx, format!("[subtask {idx} failed: {err}]"));
                        }
                    }
                }
            }
        }
    }

    let mut refinement_subtasks: Vec<Subtask> = Vec::new();
    if input.complexity_score >= config.reflection_complexity_threshold {
        let draft = synthesize(ctx, activities, input, &context_by_index, &subtasks).await?;
        let evaluation = ctx
            .run_activity(
                activities::names::EVALUATE_RESULT,
                json!({"query": input.query, "candidate": draft, "require_citations": input.require_citations}),
                || activities.evaluate_result(&input.query, &draft, input.require_citations),
            )
            .await?;
        if !evaluation.satisfactory {
            output.satisfactory = false;
            // Re-execute up to `refinement_k` additional subtasks seeded
            // with the critique, spec.md §4.2 step 5.
            let critique = evaluation.critique.unwrap_or_default();
            for i in 0..config.refinement_k {
                let idx = subtasks.len() + i;
                let subtask = Subtask {
                    index: idx,
                    description: format!("Refine the answer to '{}' addressing: {critique}", input.query),
                    dependencies: Vec::new(),
                    tool_allowlist: input.tool_allowlist.clone(),
                    token_budget: 2000,
                    retry_policy: Default::default(),
                    best_effort: true,
                };
                let agent_name = main_subtask_name(&input.workflow_id, 100 + i);
                let exec_input = ExecuteAgentInput {
                    agent_name,
                    subtask: subtask.clone(),
                    context_snippets: vec![draft.clone()],
                    memory_snippets: Vec::new(),
                };
                let exec_json = serde_json::to_value(&exec_input).unwrap_or_default();
                if let Ok(invocation) = ctx
                    .run_activity(activities::names::EXECUTE_AGENT, exec_json, || {
                        activities.execute_agent(exec_input)
                    })
                    .await
                {
                    context_by_index.insert(idx, invocation.output_text.clone());
                    output.record(invocation);
                    refinement_subtasks.push(subtask);
                }
            }
        }
    }

    let synthesis_subtasks: Vec<Subtask> =
        subtasks.iter().cloned().chain(refinement_subtasks).collect();
    let final_text =
        synthesize(ctx, activities, input, &context_by_index, &synthesis_subtasks).await?;
    output.text = final_text;
    Ok(output)
}

async fn run_single<A: Activities>(
    ctx: &WorkflowContext,
    activities: &A,
    subtask: &Subtask,
    input: &StrategyInput,
) -> Result<StrategyOutput> {
    let agent_name = main_subtask_name(&input.workflow_id, 0);
    let exec_input = ExecuteAgentInput {
        agent_name,
        subtask: subtask.clone(),
        context_snippets: Vec::new(),
        memory_snippets: Vec::new(),
    };
    let exec_json = serde_json::to_value(&exec_input).unwrap_or_default();
    let invocation = ctx
        .run_activity(activities::names::EXECUTE_AGENT, exec_json, || {
            activities.execute_agent(exec_input)
        })
        .await?;
    let mut output = StrategyOutput::new(invocation.output_text.clone());
    output.record(invocation);
    Ok(output)
}

fn mark_downstream_skipped(
    subtasks: &[Subtask],
    failed_index: usize,
    failed: &mut HashSet<usize>,
    done: &mut HashSet<usize>,
) {
    let mut frontier = vec![failed_index];
    while let Some(idx) = frontier.pop() {
        for s in subtasks {
            if s.dependencies.contains(&idx) && !done.contains(&s.index) {
                failed.insert(s.index);
                done.insert(s.index);
                frontier.push(s.index);
            }
        }
    }
}

async fn synthesize<A: Activities>(
    ctx: &WorkflowContext,
    activities: &A,
    input: &StrategyInput,
    context_by_index: &std::collections::HashMap<usize, String>,
    subtasks: &[Subtask],
) -> Result<String> {
    let invocations: Vec<shannon_models::AgentInvocation> = subtasks
        .iter()
        .filter_map(|s| {
            context_by_index.get(&s.index).map(|text| shannon_models::AgentInvocation {
                agent_name: main_subtask_name(&input.workflow_id, s.index),
                subtask_index: s.index,
                prompt: s.description.clone(),
                context_snippets: Vec::new(),
                memory_snippets: Vec::new(),
                tool_allowlist: s.tool_allowlist.clone(),
                output_text: text.clone(),
                tool_calls: Vec::new(),
                prompt_tokens: 0,
                completion_tokens: 0,
                cost_usd: 0.0,
                model: String::new(),
                provider: String::new(),
                latency: std::time::Duration::ZERO,
                status: shannon_models::InvocationStatus::Ok,
            })
        })
        .collect();
    ctx.run_activity(
        activities::names::SYNTHESIZE_RESULTS,
        json!({"query": input.query, "n_invocations": invocations.len()}),
        || activities.synthesize_results(&input.query, &invocations, input.template_hint.as_deref()),
    )
    .await
}
