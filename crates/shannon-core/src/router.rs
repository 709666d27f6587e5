//! Orchestrator Router, spec.md §4.1 (C7): selects and delegates to exactly
//! one strategy (or the Simple path), then performs the terminal
//! bookkeeping sequence (resolve -> dispatch -> record).

use std::sync::Arc;

use shannon_contracts::{EventType, PolicyDecisionInput, TaskMode};
use shannon_models::session::HistoryMessage;
use shannon_models::{PatternRecord, Strategy, Task};
use shannon_traits::{BudgetStore, ExecutionStore, PatternStore, SessionStore};

use crate::activities::Activities;
use crate::approval::{self, ApprovalRequest};
use crate::budget::degradation::{demote_mode, demoted_strategy};
use crate::budget::BudgetManager;
use crate::config::ShannonConfig;
use crate::error::{Result, ShannonError};
use crate::learning::LearningRouter;
use crate::persistence::ExecutionWriter;
use crate::policy::PolicyEngine;
use crate::role::RoleRegistry;
use crate::session::SessionManager;
use crate::strategies::{StrategyInput, StrategyOutput, StrategyRunner};
use crate::template::TemplateRegistry;
use crate::workflow::WorkflowContext;

/// Everything the router needs beyond the `Activities` facade, bundled so
/// `Orchestrator` can own one of these per process.
pub struct Router<A: Activities, Sess: SessionStore, Bud: BudgetStore, Pat: PatternStore, Exe: ExecutionStore> {
    pub activities: Arc<A>,
    pub config: ShannonConfig,
    pub sessions: Arc<SessionManager<Sess>>,
    pub budget: Arc<BudgetManager<Bud>>,
    pub policy: Arc<PolicyEngine>,
    pub learning: Arc<LearningRouter<Pat>>,
    pub executions: Arc<ExecutionWriter<Exe>>,
    pub patterns: Arc<Pat>,
    pub templates: Arc<TemplateRegistry>,
    pub roles: Arc<RoleRegistry>,
}

/// Crude chars/4 estimate, the same rule `MockLlmClient` uses for
/// completion-token bookkeeping (`capability/mock.rs`) — good enough for a
/// budget precheck before any real token count is known.
fn estimate_tokens(query: &str) -> u64 {
    (query.len() as u64 / 4).max(1) + 50
}

/// mode-driven rule, spec.md §4.1 step 3 bullet list.
fn mode_driven_strategy(mode: TaskMode, complexity_score: f64) -> Strategy {
    match mode {
        TaskMode::Simple => Strategy::Simple,
        TaskMode::Standard if complexity_score >= 0.5 => Strategy::Dag,
        TaskMode::Standard => Strategy::React,
        TaskMode::Complex => Strategy::Reflection, // DAG-with-reflection, see reflection.rs
        TaskMode::Supervisor => Strategy::Supervisor,
    }
}

impl<A, Sess, Bud, Pat, Exe> Router<A, Sess, Bud, Pat, Exe>
where
    A: Activities,
    Sess: SessionStore,
    Bud: BudgetStore,
    Pat: PatternStore,
    Exe: ExecutionStore,
{
    /// Procedure steps 1-6, spec.md §4.1.
    pub async fn route(&self, ctx: &WorkflowContext, task: &Task, now_ms: i64) -> Result<StrategyOutput> {
        ctx.run_activity(
            crate::activities::names::EMIT_TASK_UPDATE,
            serde_json::json!({"workflow_id": ctx.workflow_id(), "event": "workflow_started"}),
            || {
                self.activities.emit_task_update(
                    ctx.workflow_id(),
                    now_ms,
                    EventType::WorkflowStarted,
                    None,
                    serde_json::json!({"task_id": task.task_id}),
                )
            },
        )
        .await?;

        if let Err(err) = self.enforce_policy(ctx, task).await {
            self.emit_failure(ctx, &err, now_ms).await?;
            return Err(err);
        }

        let (mut strategy, input) = self.resolve(ctx, task).await?;

        let tool_allowlist = input.tool_allowlist.clone();
        let require_citations = input.require_citations;

        strategy = match self.enforce_budget(ctx, task, strategy).await {
            Ok(strategy) => strategy,
            Err(err) => {
                self.emit_failure(ctx, &err, now_ms).await?;
                return Err(err);
            }
        };

        let runner = StrategyRunner::new(self.activities.clone(), self.config.clone());
        let run_result = runner.run(strategy, ctx, input).await;

        let (output, success) = match run_result {
            Ok(output) => {
                let success = output.satisfactory;
                (output, success)
            }
            Err(err) => {
                self.emit_failure(ctx, &err, now_ms).await?;
                return Err(err);
            }
        };

        self.finish(ctx, task, strategy, &output, success, require_citations, &tool_allowlist, now_ms)
            .await?;
        Ok(output)
    }

    /// Policy decision, spec.md §4.9: a dangerous query denies outright
    /// (before any strategy activity runs, so S5's "no LLM activities
    /// executed" holds); a suspicious query in complex/production requires
    /// approval, which either unblocks the route or fails closed on
    /// timeout/denial.
    async fn enforce_policy(&self, ctx: &WorkflowContext, task: &Task) -> Result<()> {
        let token_budget = self.session_budget_limit(task).await?;
        let decision = self.policy.decide(&PolicyDecisionInput {
            query: task.query.clone(),
            user_id: task.user_id.clone(),
            tenant_id: task.tenant_id.clone(),
            mode: task.mode,
            token_budget,
            agent_id: None,
            environment: self.config.environment,
        });

        if !decision.allow {
            return Err(ShannonError::PolicyDenied {
                reason: decision.reason.unwrap_or_else(|| "policy denied".to_string()),
                require_approval: false,
            });
        }

        if decision.require_approval {
            let request = ApprovalRequest {
                workflow_id: ctx.workflow_id().to_string(),
                reason: decision.reason.clone().unwrap_or_else(|| "approval required".to_string()),
                payload: serde_json::json!({"task_id": task.task_id}),
            };
            let response = approval::request_approval(ctx, &request, self.config.approval.timeout_secs).await?;
            if !response.approved {
                return Err(ShannonError::PolicyDenied {
                    reason: decision.reason.unwrap_or_else(|| "approval denied".to_string()),
                    require_approval: true,
                });
            }
        }
        Ok(())
    }

    /// Budget precheck with degradation, spec.md §4.9 "On budget-near-limit:
    /// strategies demote (complex→standard→simple) per config" — walks the
    /// demotion ladder (`budget::degradation`) until a mode's estimated cost
    /// fits the session's remaining budget, or fails `BudgetExceeded` once
    /// even `Simple` does not fit.
    async fn enforce_budget(&self, ctx: &WorkflowContext, task: &Task, strategy: Strategy) -> Result<Strategy> {
        let default_allowed = self.session_budget_limit(task).await?;
        let estimated = estimate_tokens(&task.query);

        let mut mode = task.mode;
        let mut strategy = strategy;
        loop {
            let check = ctx
                .run_activity(
                    crate::activities::names::CHECK_TOKEN_BUDGET,
                    serde_json::json!({"session_id": task.session_id, "estimated_tokens": estimated}),
                    || self.budget.check_token_budget(&task.session_id, estimated, default_allowed),
                )
                .await?;
            if check.allow {
                return Ok(strategy);
            }
            match demote_mode(mode) {
                Some(next) => {
                    mode = next;
                    strategy = demoted_strategy(mode);
                }
                None => {
                    return Err(ShannonError::BudgetExceeded(
                        check.reason.unwrap_or_else(|| "budget exhausted".to_string()),
                    ));
                }
            }
        }
    }

    /// Session's configured token ceiling, or 0 (fail-closed) if the session
    /// is unknown or tenant-mismatched.
    async fn session_budget_limit(&self, task: &Task) -> Result<u64> {
        Ok(self
            .sessions
            .get(&task.session_id, task.tenant_id.as_deref())
            .await?
            .map(|s| s.budget_limit_tokens)
            .unwrap_or(0))
    }

    /// Steps 1-4: template override, complexity analysis, learning
    /// consultation with confidence-gated adoption, role seeding.
    async fn resolve(&self, ctx: &WorkflowContext, task: &Task) -> Result<(Strategy, StrategyInput)> {
        if let Some(template_ref) = &task.template {
            if let Some(template) = self
                .templates
                .resolve(&template_ref.name, &template_ref.version)
                .or_else(|| self.templates.resolve_latest(&template_ref.name))
            {
                let input = StrategyInput {
                    workflow_id: ctx.workflow_id().to_string(),
                    query: task.query.clone(),
                    session_id: task.session_id.clone(),
                    complexity_score: 0.5,
                    require_citations: template.requires_citations,
                    template_hint: Some(template.name.clone()),
                    tool_allowlist: Vec::new(),
                };
                return Ok((template.strategy, input));
            }
        }

        let complexity = ctx
            .run_activity(
                crate::activities::names::ANALYZE_COMPLEXITY,
                serde_json::json!({"query": task.query}),
                || self.activities.analyze_complexity(&task.query),
            )
            .await?;

        // Forced research overrides both the learning recommendation and
        // the mode-driven rules, spec.md §4.1 step 3 "Forced research flag
        // -> Research, overrides above".
        let strategy = if task.force_research {
            Strategy::Research
        } else {
            let recommendation = self.learning.recommend(complexity.score, &[]).await?;
            if recommendation.confidence >= self.config.learning_router.confidence_adopt_threshold {
                recommendation.strategy
            } else {
                mode_driven_strategy(task.mode, complexity.score)
            }
        };

        let mut tool_allowlist = Vec::new();
        if let Some(role_name) = &task.role {
            if let Some(role) = self.roles.get(role_name) {
                tool_allowlist = role.tool_allowlist;
            }
        }

        let input = StrategyInput {
            workflow_id: ctx.workflow_id().to_string(),
            query: task.query.clone(),
            session_id: task.session_id.clone(),
            complexity_score: complexity.score,
            require_citations: matches!(strategy, Strategy::Research),
            template_hint: None,
            tool_allowlist,
        };
        Ok((strategy, input))
    }

    /// Step 6: `UpdateSessionResult`, `PersistAgentExecution*`,
    /// `RecordPatternMetrics`, terminal event.
    #[allow(clippy::too_many_arguments)]
    async fn finish(
        &self,
        ctx: &WorkflowContext,
        task: &Task,
        strategy: Strategy,
        output: &StrategyOutput,
        success: bool,
        require_citations: bool,
        tool_allowlist: &[String],
        now_ms: i64,
    ) -> Result<()> {
        let _ = (require_citations, tool_allowlist);
        self.sessions
            .update_session_result(
                &task.session_id,
                task.tenant_id.as_deref(),
                HistoryMessage { role: "assistant".to_string(), content: output.text.clone(), ts_ms: now_ms },
                output.tally.totals.prompt_tokens + output.tally.totals.completion_tokens,
                output.tally.totals.cost_usd,
                success,
                now_ms,
            )
            .await?;

        self.executions.persist_agent_executions(ctx.workflow_id(), &output.invocations).await?;

        self.patterns
            .append(PatternRecord {
                strategy,
                query_embedding: Vec::new(),
                success,
                tokens: output.tally.totals.prompt_tokens + output.tally.totals.completion_tokens,
                latency: std::time::Duration::from_millis(0),
                timestamp_ms: now_ms,
                metadata: serde_json::json!({"workflow_id": ctx.workflow_id()}),
            })
            .await
            .map_err(ShannonError::from)?;

        let (event_type, payload) = if success {
            (EventType::WorkflowCompleted, serde_json::json!({"text": output.text}))
        } else {
            (EventType::WorkflowFailed, serde_json::json!({"kind": "Unsatisfactory", "text": output.text}))
        };
        self.activities.emit_task_update(ctx.workflow_id(), now_ms, event_type, None, payload).await?;
        Ok(())
    }

    async fn emit_failure(&self, ctx: &WorkflowContext, err: &ShannonError, now_ms: i64) -> Result<()> {
        self.activities
            .emit_task_update(
                ctx.workflow_id(),
                now_ms,
                EventType::WorkflowFailed,
                None,
                serde_json::json!({"kind": err.kind(), "message": err.to_string()}),
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activities::DefaultActivities;
    use crate::bus::StreamBus;
    use crate::capability::mock::{canned, MockLlmClient};
    use crate::capability::ToolRegistry;
    use shannon_contracts::TaskContext;
    use shannon_storage::Storage;

    fn base_task() -> Task {
        Task {
            task_id: "t1".into(),
            query: "2 + 2".into(),
            session_id: "s1".into(),
            user_id: "u1".into(),
            tenant_id: None,
            mode: TaskMode::Simple,
            model_tier: None,
            model_override: None,
            provider_override: None,
            template: None,
            role: None,
            force_research: false,
            context: TaskContext::default(),
            labels: Default::default(),
            priority: Default::default(),
            idempotency_key: None,
            created_at_ms: 0,
        }
    }

    #[tokio::test]
    async fn simple_mode_routes_to_simple_strategy_and_updates_session() {
        let (storage, _tmp) = Storage::open_temp().unwrap();
        let llm = MockLlmClient::with_script(vec![canned("four")]);
        let bus = Arc::new(StreamBus::new(1000));
        let acts = Arc::new(DefaultActivities::new(
            Arc::new(llm),
            Arc::new(ToolRegistry::new()),
            Arc::new(storage.patterns.clone()),
            bus,
        ));
        let sessions = Arc::new(SessionManager::new(Arc::new(storage.sessions), 1000, 3_600_000, 200));
        sessions.get_or_create("s1", "u1", None, 0, 100_000).await.unwrap();
        let budget = Arc::new(BudgetManager::new(Arc::new(storage.budgets), crate::config::BudgetConfig::default()));
        let learning = Arc::new(LearningRouter::new(
            Arc::new(storage.patterns.clone()),
            crate::config::LearningRouterConfig::default(),
        ));
        let executions = Arc::new(ExecutionWriter::new(Arc::new(storage.executions)));

        let router = Router {
            activities: acts,
            config: ShannonConfig::default(),
            sessions,
            budget,
            policy: Arc::new(crate::policy::PolicyEngine::default()),
            learning,
            executions,
            patterns: Arc::new(storage.patterns),
            templates: Arc::new(TemplateRegistry::new()),
            roles: Arc::new(RoleRegistry::with_builtins()),
        };

        let ctx = WorkflowContext::recording("wf-route-1", Arc::new(crate::workflow::SignalBus::new()));
        let task = base_task();
        let output = router.route(&ctx, &task, 1).await.unwrap();
        assert_eq!(output.text, "four");

        let session = router.sessions.get("s1", None).await.unwrap().unwrap();
        assert_eq!(session.task_count, 1);
        assert_eq!(session.history.len(), 1);
    }

    #[tokio::test]
    async fn dangerous_query_fails_with_policy_denied_before_any_strategy_runs() {
        let (storage, _tmp) = Storage::open_temp().unwrap();
        let llm = Arc::new(MockLlmClient::with_script(vec![]));
        let bus = Arc::new(StreamBus::new(1000));
        let acts = Arc::new(DefaultActivities::new(
            llm.clone(),
            Arc::new(ToolRegistry::new()),
            Arc::new(storage.patterns.clone()),
            bus,
        ));
        let sessions = Arc::new(SessionManager::new(Arc::new(storage.sessions), 1000, 3_600_000, 200));
        sessions.get_or_create("s1", "u1", None, 0, 100_000).await.unwrap();
        let budget = Arc::new(BudgetManager::new(Arc::new(storage.budgets), crate::config::BudgetConfig::default()));
        let learning = Arc::new(LearningRouter::new(
            Arc::new(storage.patterns.clone()),
            crate::config::LearningRouterConfig::default(),
        ));
        let executions = Arc::new(ExecutionWriter::new(Arc::new(storage.executions)));

        let router = Router {
            activities: acts,
            config: ShannonConfig::default(),
            sessions,
            budget,
            policy: Arc::new(crate::policy::PolicyEngine::default()),
            learning,
            executions,
            patterns: Arc::new(storage.patterns),
            templates: Arc::new(TemplateRegistry::new()),
            roles: Arc::new(RoleRegistry::with_builtins()),
        };

        let ctx = WorkflowContext::recording("wf-route-2", Arc::new(crate::workflow::SignalBus::new()));
        let mut task = base_task();
        task.query = "please delete all files".to_string();
        let err = router.route(&ctx, &task, 1).await.unwrap_err();
        assert_eq!(err.kind(), "PolicyDenied");
        assert_eq!(llm.call_count(), 0);
    }
}
