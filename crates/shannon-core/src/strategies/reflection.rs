//! Reflection strategy, spec.md §4.7: wraps another strategy — run,
//! evaluate, and on an unsatisfactory verdict rewrite the query with the
//! critique and retry, up to `max_iterations`.
//!
//! The wrapped strategy is DAG: reflection is itself one of DAG's own
//! trigger conditions (spec.md §4.2 step 5), so as a *standalone* selectable
//! strategy (spec.md §4.1 mode-driven rules list it alongside DAG/ReAct) the
//! natural inner loop to wrap is DAG without its own built-in reflection
//! pass — this resolves an otherwise-unstated choice left open by the
//! "wraps another strategy" phrasing.

use crate::activities::Activities;
use crate::config::{DagConfig, ShannonConfig};
use crate::error::Result;
use crate::workflow::WorkflowContext;

use super::{dag, StrategyInput, StrategyOutput};

pub async fn run<A: Activities>(
    ctx: &WorkflowContext,
    activities: &A,
    config: &ShannonConfig,
    input: &StrategyInput,
) -> Result<StrategyOutput> {
    // Reflection wraps DAG without DAG's own reflection pass re-triggering,
    // to avoid a doubled evaluate-and-retry loop.
    let inner_dag_config = DagConfig { reflection_complexity_threshold: 2.0, ..config.dag.clone() };

    let mut current_input = input.clone();
    let mut last_output = dag::run(ctx, activities, &inner_dag_config, &current_input).await?;

    for _iteration in 0..config.reflection.max_iterations.saturating_sub(1) {
        let evaluation = ctx
            .run_activity(
                crate::activities::names::EVALUATE_RESULT,
                serde_json::json!({"query": input.query, "candidate": last_output.text, "require_citations": input.require_citations}),
                || activities.evaluate_result(&input.query, &last_output.text, input.require_citations),
            )
            .await?;
        if evaluation.satisfactory {
            return Ok(last_output);
        }
        let critique = evaluation.critique.unwrap_or_else(|| "address gaps in completeness and correctness".to_string());
        current_input.query = format!("{}\n\nPrevious attempt had issues: {critique}. Revise accordingly.", input.query);
        last_output = dag::run(ctx, activities, &inner_dag_config, &current_input).await?;
    }

    Ok(last_output)
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
    async fn satisfactory_first_pass_returns_without_retry() {
        let (storage, _tmp) = Storage::open_temp().unwrap();
        let llm = MockLlmClient::with_script(vec![
            canned("not json"), // DecomposeTask -> empty -> degrade to Simple
            canned("first answer"), // Simple execute_agent
            canned(r#"{"satisfactory": true, "critique": null}"#), // EvaluateResult
        ]);
        let acts = DefaultActivities::new(
            Arc::new(llm),
            Arc::new(ToolRegistry::new()),
            Arc::new(storage.patterns),
            Arc::new(StreamBus::new(100)),
        );
        let ctx = WorkflowContext::recording("wf-reflect", Arc::new(crate::workflow::SignalBus::new()));
        let input = StrategyInput {
            workflow_id: "wf-reflect".into(),
            query: "summarize this doc".into(),
            session_id: "s1".into(),
            complexity_score: 0.3,
            require_citations: false,
            template_hint: None,
            tool_allowlist: Vec::new(),
        };
        let cfg = ShannonConfig::default();
        let out = run(&ctx, &acts, &cfg, &input).await.unwrap();
        assert_eq!(out.text, "first answer");
    }
}
