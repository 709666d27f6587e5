//! Cognitive execution strategies, spec.md §4.2-§4.7. Each strategy is a
//! self-contained async function over a `WorkflowContext` + `Activities`,
//! dispatched by enum: "Dynamic dispatch across strategies... do not
//! cross-call each other" (SPEC_FULL.md Design Notes) — Reflection and
//! Supervisor are the two explicitly permitted exceptions, each
//! wrapping/delegating to DAG.

pub mod dag;
pub mod debate;
pub mod react;
pub mod reflection;
pub mod research;
pub mod simple;
pub mod supervisor;
pub mod tot;

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use shannon_models::agent::{AgentInvocation, ExecutionTally};
use shannon_models::Strategy;

use crate::activities::Activities;
use crate::config::ShannonConfig;
use crate::error::Result;
use crate::workflow::WorkflowContext;

/// Reduced, deterministic input handed to a strategy child workflow
/// (spec.md §4.1 step 5: "a reduced, deterministic input struct").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyInput {
    pub workflow_id: String,
    pub query: String,
    pub session_id: String,
    pub complexity_score: f64,
    pub require_citations: bool,
    pub template_hint: Option<String>,
    pub tool_allowlist: Vec<String>,
}

/// What every strategy returns: final text, the invocations it produced
/// (for persistence/metrics), and whether it completed satisfactorily.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyOutput {
    pub text: String,
    pub invocations: Vec<AgentInvocation>,
    pub tally: ExecutionTally,
    pub satisfactory: bool,
    pub citations: Vec<crate::activities::Citation>,
}

impl StrategyOutput {
    pub fn new(text: String) -> Self {
        Self {
            text,
            invocations: Vec::new(),
            tally: ExecutionTally::default(),
            satisfactory: true,
            citations: Vec::new(),
        }
    }

    pub fn record(&mut self, invocation: AgentInvocation) {
        self.tally.record(&invocation);
        self.invocations.push(invocation);
    }
}

/// Dispatch table keyed by `Strategy`, spec.md §4.1 step 5. Holds no state
/// of its own beyond the shared config; each arm owns its suspension
/// points via the `WorkflowContext` it's handed.
pub struct StrategyRunner<A: Activities> {
    pub activities: Arc<A>,
    pub config: ShannonConfig,
}

impl<A: Activities> StrategyRunner<A> {
    pub fn new(activities: Arc<A>, config: ShannonConfig) -> Self {
        Self { activities, config }
    }

    pub async fn run(
        &self,
        strategy: Strategy,
        ctx: &WorkflowContext,
        input: StrategyInput,
    ) -> Result<StrategyOutput> {
        let started = Instant::now();
        let result = match strategy {
            Strategy::Simple => simple::run(ctx, self.activities.as_ref(), &input).await,
            Strategy::Dag => dag::run(ctx, self.activities.as_ref(), &self.config.dag, &input).await,
            Strategy::React => react::run(ctx, self.activities.as_ref(), &self.config.react, &input).await,
            Strategy::Research => {
                research::run(ctx, self.activities.as_ref(), &self.config.research, &input).await
            }
            Strategy::Debate => debate::run(ctx, self.activities.as_ref(), &self.config.debate, &input).await,
            Strategy::TreeOfThoughts => {
                tot::run(ctx, self.activities.as_ref(), &self.config.tree_of_thoughts, &input).await
            }
            Strategy::Reflection => reflection::run(ctx, self.activities.as_ref(), &self.config, &input).await,
            Strategy::Supervisor => {
                supervisor::run(ctx, self.activities.as_ref(), &self.config, &input).await
            }
        };
        tracing::debug!(strategy = %strategy, elapsed_ms = started.elapsed().as_millis(), "strategy completed");
        result
    }
}
