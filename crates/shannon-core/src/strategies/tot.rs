//! Tree-of-Thoughts strategy, spec.md §4.6: bounded search with branching
//! factor B and depth D; each node is a Think activity producing up to B
//! scored children.

use serde_json::{json, Value};
use shannon_models::{RetryPolicy, Subtask};

use crate::activities::{self, Activities, ExecuteAgentInput};
use crate::config::TreeOfThoughtsConfig;
use crate::error::Result;
use crate::naming::main_subtask_name;
use crate::workflow::WorkflowContext;

use super::{StrategyInput, StrategyOutput};

#[derive(Clone)]
struct Node {
    path: Vec<String>,
    score: f32,
    depth: usize,
}

/// Parses a `{"children": [{"text": string, "score": number}]}` JSON
/// response; a malformed response yields zero children, terminating that
/// branch rather than failing the whole search.
fn parse_children(raw: &str) -> Vec<(String, f32)> {
    let parsed: Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(_) => return Vec::new(),
    };
    parsed
        .get("children")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(|c| {
                    let text = c.get("text")?.as_str()?.to_string();
                    let score = c.get("score").and_then(Value::as_f64).unwrap_or(0.5) as f32;
                    Some((text, score.clamp(0.0, 1.0)))
                })
                .collect()
        })
        .unwrap_or_default()
}

pub async fn run<A: Activities>(
    ctx: &WorkflowContext,
    activities: &A,
    config: &TreeOfThoughtsConfig,
    input: &StrategyInput,
) -> Result<StrategyOutput> {
    let mut output = StrategyOutput::new(String::new());
    let mut frontier: Vec<Node> = vec![Node { path: Vec::new(), score: 0.0, depth: 0 }];
    let mut best: Option<Node> = None;
    let mut expansions = 0u32;
    const MAX_EXPANSIONS: u32 = 64; // budget guard; spec names depth/branching, not a node cap, but an
                                     // unbounded frontier would defeat "bounded search" in degenerate cases.

    while let Some(node) = pop_best(&mut frontier) {
        if node.score >= config.acceptance_threshold || node.depth >= config.max_depth || expansions >= MAX_EXPANSIONS {
            if best.as_ref().map(|b| node.score > b.score).unwrap_or(true) {
                best = Some(node.clone());
            }
            if node.score >= config.acceptance_threshold {
                break;
            }
            continue;
        }

        let agent_name = main_subtask_name(&input.workflow_id, node.depth);
        let description = if node.path.is_empty() {
            format!("Propose up to {} distinct next thoughts toward solving: {}. Respond with strict JSON: {{\"children\": [{{\"text\": string, \"score\": number}}]}}.", config.branching_factor, input.query)
        } else {
            format!(
                "Given the thought path so far: {}. Propose up to {} distinct next thoughts, each self-scored in [0,1]. Respond with strict JSON: {{\"children\": [{{\"text\": string, \"score\": number}}]}}.",
                node.path.join(" -> "), config.branching_factor
            )
        };
        let subtask = Subtask {
            index: node.depth,
            description,
            dependencies: Vec::new(),
            tool_allowlist: Vec::new(),
            token_budget: 1200,
            retry_policy: RetryPolicy::default(),
            best_effort: true,
        };
        let exec_input = ExecuteAgentInput {
            agent_name,
            subtask,
            context_snippets: Vec::new(),
            memory_snippets: Vec::new(),
        };
        let exec_json = serde_json::to_value(&exec_input).unwrap_or_default();
        let invocation = ctx
            .run_activity(activities::names::EXECUTE_AGENT, exec_json, || {
                activities.execute_agent(exec_input)
            })
            .await?;
        let children = parse_children(&invocation.output_text);
        output.record(invocation);
        expansions += 1;

        if children.is_empty() {
            if best.as_ref().map(|b| node.score > b.score).unwrap_or(true) {
                best = Some(node.clone());
            }
            continue;
        }

        for (text, score) in children.into_iter().take(config.branching_factor) {
            let mut path = node.path.clone();
            path.push(text);
            frontier.push(Node { path, score, depth: node.depth + 1 });
        }
    }

    let winner = best.unwrap_or(Node { path: vec![input.query.clone()], score: 0.0, depth: 0 });
    let reconstructed_query =
        format!("{}\nHighest-scoring reasoning path: {}", input.query, winner.path.join(" -> "));
    let final_text = ctx
        .run_activity(
            activities::names::SYNTHESIZE_RESULTS,
            json!({"query": reconstructed_query, "path_len": winner.path.len()}),
            || activities.synthesize_results(&reconstructed_query, &[], Some("tree_of_thoughts")),
        )
        .await?;
    output.text = final_text;
    Ok(output)
}

fn pop_best(frontier: &mut Vec<Node>) -> Option<Node> {
    if frontier.is_empty() {
        return None;
    }
    let best_idx = frontier
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.score.partial_cmp(&b.score).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i)?;
    Some(frontier.swap_remove(best_idx))
}
