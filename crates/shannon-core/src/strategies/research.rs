//! Research strategy, spec.md §4.4: refine -> subqueries -> parallel search
//! + merge -> coverage loop -> fact extraction/verification -> citation
//! attachment -> synthesis.

use serde_json::json;

use crate::activities::{self, Activities};
use crate::config::ResearchConfig;
use crate::error::Result;
use crate::workflow::WorkflowContext;

use super::{StrategyInput, StrategyOutput};

pub async fn run<A: Activities>(
    ctx: &WorkflowContext,
    activities: &A,
    config: &ResearchConfig,
    input: &StrategyInput,
) -> Result<StrategyOutput> {
    let refined = ctx
        .run_activity(
            activities::names::REFINE_RESEARCH_QUERY,
            json!({"query": input.query}),
            || activities.refine_research_query(&input.query),
        )
        .await?;

    // Scale subquery count with task complexity within [min_subqueries, max_subqueries].
    let span = config.max_subqueries.saturating_sub(config.min_subqueries) as f64;
    let n_subqueries =
        config.min_subqueries + (input.complexity_score.clamp(0.0, 1.0) * span).round() as usize;
    let n_subqueries = n_subqueries.clamp(config.min_subqueries, config.max_subqueries);
    let subqueries = ctx
        .run_activity(
            activities::names::GENERATE_SUBQUERIES,
            json!({"refined": refined, "n": n_subqueries}),
            || activities.generate_subqueries(&refined, n_subqueries),
        )
        .await?;

    let mut batches = Vec::with_capacity(subqueries.len());
    for subquery in &subqueries {
        let results = ctx
            .run_activity(activities::names::ROUTE_SEARCH, json!({"subquery": subquery}), || {
                activities.route_search(subquery)
            })
            .await?;
        batches.push(results);
    }
    let mut merged = ctx
        .run_activity(
            activities::names::MERGE_SEARCH_RESULTS,
            json!({"batch_count": batches.len()}),
            || activities.merge_search_results(batches.clone()),
        )
        .await?;

    // Coverage loop: fill in subqueries for uncovered topics, up to max_rounds.
    for _round in 0..config.max_rounds {
        let coverage = ctx
            .run_activity(
                activities::names::EVALUATE_COVERAGE,
                json!({"query": input.query, "result_count": merged.len()}),
                || activities.evaluate_coverage(&input.query, &merged),
            )
            .await?;
        if coverage.covered_fraction >= 0.9 || coverage.uncovered_topics.is_empty() {
            break;
        }
        let mut fill_batches = Vec::with_capacity(coverage.uncovered_topics.len());
        for topic in &coverage.uncovered_topics {
            let results = ctx
                .run_activity(activities::names::ROUTE_SEARCH, json!({"subquery": topic}), || {
                    activities.route_search(topic)
                })
                .await?;
            fill_batches.push(results);
        }
        fill_batches.push(merged.clone());
        merged = ctx
            .run_activity(
                activities::names::MERGE_SEARCH_RESULTS,
                json!({"batch_count": fill_batches.len()}),
                || activities.merge_search_results(fill_batches.clone()),
            )
            .await?;
    }

    let facts = ctx
        .run_activity(activities::names::EXTRACT_FACTS, json!({"result_count": merged.len()}), || {
            activities.extract_facts(&merged)
        })
        .await?;
    let verified = ctx
        .run_activity(activities::names::VERIFY_BATCH, json!({"fact_count": facts.len()}), || {
            activities.verify_claims(facts.clone())
        })
        .await?;

    let draft = ctx
        .run_activity(
            activities::names::SYNTHESIZE_RESULTS,
            json!({"query": input.query, "verified_count": verified.len()}),
            || activities.synthesize_results(&input.query, &[], Some("research_comprehensive")),
        )
        .await?;

    let cited = ctx
        .run_activity(
            activities::names::ADD_CITATIONS_WITH_VERIFY,
            json!({"draft_len": draft.len(), "claim_count": verified.len()}),
            || activities.add_citations_with_verify(&draft, &verified),
        )
        .await?;

    let mut output = StrategyOutput::new(cited.text);
    output.citations = cited.citations;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activities::DefaultActivities;
    use crate::bus::StreamBus;
    use crate::capability::mock::MockLlmClient;
    use crate::capability::ToolRegistry;
    use shannon_storage::Storage;
    use std::sync::Arc;

    #[tokio::test]
    async fn research_produces_dense_citations() {
        let (storage, _tmp) = Storage::open_temp().unwrap();
        let llm = MockLlmClient::default();
        let acts = DefaultActivities::new(
            Arc::new(llm),
            Arc::new(ToolRegistry::new()),
            Arc::new(storage.patterns),
            Arc::new(StreamBus::new(100)),
        );
        let ctx = WorkflowContext::recording("wf-research", Arc::new(crate::workflow::SignalBus::new()));
        let input = StrategyInput {
            workflow_id: "wf-research".into(),
            query: "compare rust and go concurrency models".into(),
            session_id: "s1".into(),
            complexity_score: 0.8,
            require_citations: true,
            template_hint: Some("research_comprehensive".into()),
            tool_allowlist: Vec::new(),
        };
        let out = run(&ctx, &acts, &ResearchConfig::default(), &input).await.unwrap();
        assert!(!out.citations.is_empty());
        for (i, c) in out.citations.iter().enumerate() {
            assert_eq!(c.index, i + 1);
        }
    }
}
