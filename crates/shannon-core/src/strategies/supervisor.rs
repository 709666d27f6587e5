//! Supervisor strategy: the top-level coordination mode for `TaskMode::Supervisor`
//! (spec.md §4.1 mode-driven rule "supervisor -> Supervisor"). A supervisor
//! doesn't execute subtasks itself; it delegates to the DAG strategy as its
//! team of workers (spec.md §3 "Strategy... Supervisor may spawn child
//! strategies") and narrates team status over the streaming bus around the
//! delegation.

use serde_json::json;
use shannon_contracts::EventType;

use crate::activities::Activities;
use crate::config::ShannonConfig;
use crate::error::Result;
use crate::workflow::WorkflowContext;

use super::{dag, StrategyInput, StrategyOutput};

pub async fn run<A: Activities>(
    ctx: &WorkflowContext,
    activities: &A,
    config: &ShannonConfig,
    input: &StrategyInput,
) -> Result<StrategyOutput> {
    ctx.run_activity(
        crate::activities::names::EMIT_TASK_UPDATE,
        json!({"workflow_id": input.workflow_id, "event": "team_dispatch"}),
        || {
            activities.emit_task_update(
                &input.workflow_id,
                0,
                EventType::TeamStatus,
                None,
                json!({"status": "dispatching team"}),
            )
        },
    )
    .await?;

    let output = dag::run(ctx, activities, &config.dag, input).await?;

    ctx.run_activity(
        crate::activities::names::EMIT_TASK_UPDATE,
        json!({"workflow_id": input.workflow_id, "event": "team_complete"}),
        || {
            activities.emit_task_update(
                &input.workflow_id,
                1,
                EventType::TeamStatus,
                None,
                json!({"status": "team complete", "satisfactory": output.satisfactory}),
            )
        },
    )
    .await?;

    Ok(output)
}
