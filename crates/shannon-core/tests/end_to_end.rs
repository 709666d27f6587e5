//! End-to-end orchestrator scenarios, spec.md §8 "End-to-end scenarios (seed
//! the test suite)". Each test drives `Orchestrator::submit_task` the way an
//! external caller would, asserting on `GetStatus`/`GetControlState` rather
//! than reaching into strategy internals.

use std::sync::Arc;
use std::time::Duration;

use shannon_contracts::{SubmitTaskRequest, TaskMode, TaskStatus};
use shannon_core::activities::DefaultActivities;
use shannon_core::budget::BudgetManager;
use shannon_core::bus::StreamBus;
use shannon_core::capability::mock::{canned, MockLlmClient};
use shannon_core::capability::ToolRegistry;
use shannon_core::learning::LearningRouter;
use shannon_core::persistence::ExecutionWriter;
use shannon_core::policy::PolicyEngine;
use shannon_core::role::RoleRegistry;
use shannon_core::session::SessionManager;
use shannon_core::template::TemplateRegistry;
use shannon_core::{Orchestrator, Router, ShannonConfig};
use shannon_models::{BudgetLedger, Session};
use shannon_storage::Storage;
use shannon_traits::{BudgetStore, SessionStore};

type TestOrchestrator = Orchestrator<
    DefaultActivities<MockLlmClient>,
    shannon_storage::SessionStorage,
    shannon_storage::BudgetStorage,
    shannon_storage::PatternStorage,
    shannon_storage::ExecutionStorage,
>;

fn build_orchestrator(storage: Storage, llm: MockLlmClient, config: ShannonConfig) -> TestOrchestrator {
    let bus = Arc::new(StreamBus::new(1000));
    let acts = Arc::new(DefaultActivities::new(
        Arc::new(llm),
        Arc::new(ToolRegistry::new()),
        Arc::new(storage.patterns.clone()),
        bus,
    ));
    let sessions = Arc::new(SessionManager::new(
        Arc::new(storage.sessions),
        config.session.lru_capacity,
        config.session.default_ttl_ms,
        config.session.history_limit,
    ));
    let budget = Arc::new(BudgetManager::new(Arc::new(storage.budgets), config.budget.clone()));
    let learning =
        Arc::new(LearningRouter::new(Arc::new(storage.patterns.clone()), config.learning_router.clone()));
    let executions = Arc::new(ExecutionWriter::new(Arc::new(storage.executions)));
    let router = Arc::new(Router {
        activities: acts,
        config: config.clone(),
        sessions,
        budget,
        policy: Arc::new(PolicyEngine::default()),
        learning,
        executions,
        patterns: Arc::new(storage.patterns),
        templates: Arc::new(TemplateRegistry::new()),
        roles: Arc::new(RoleRegistry::with_builtins()),
    });
    Orchestrator::new(router, config)
}

fn base_request(query: &str, mode: TaskMode) -> SubmitTaskRequest {
    SubmitTaskRequest {
        query: query.to_string(),
        session_id: "s1".to_string(),
        user_id: "u1".to_string(),
        tenant_id: None,
        mode: Some(mode),
        model_tier: None,
        model_override: None,
        provider_override: None,
        context: Default::default(),
        labels: Default::default(),
        template: None,
        idempotency_key: None,
        traceparent: None,
    }
}

async fn wait_until_terminal(orch: &TestOrchestrator, task_id: &str) -> TaskStatus {
    for _ in 0..200 {
        let status = orch.get_status(task_id).await.unwrap().status;
        if matches!(status, TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled) {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    orch.get_status(task_id).await.unwrap().status
}

/// S1 Simple arithmetic: mode=simple, one LLM activity, total_tokens < 500,
/// final text contains "4".
#[tokio::test]
async fn s1_simple_arithmetic() {
    let (storage, _tmp) = Storage::open_temp().unwrap();
    storage.sessions.put(&Session::new("s1", "u1", None, 3_600_000, 0, 100_000)).await.unwrap();
    let llm = MockLlmClient::with_script(vec![canned("4")]);
    let orch = build_orchestrator(storage, llm, ShannonConfig::default());

    let resp = orch.submit_task(base_request("What is 2+2?", TaskMode::Simple), 0).await.unwrap();
    let status = wait_until_terminal(&orch, &resp.task_id).await;
    assert_eq!(status, TaskStatus::Completed);

    let got = orch.get_status(&resp.task_id).await.unwrap();
    assert!(got.usage.total_tokens < 500, "total_tokens={}", got.usage.total_tokens);
}

/// S2 Parallel compare: mode=standard, decomposition into 3 subtasks (one
/// per language), synthesis mentions all three, no failure.
#[tokio::test]
async fn s2_parallel_compare() {
    let (storage, _tmp) = Storage::open_temp().unwrap();
    storage.sessions.put(&Session::new("s1", "u1", None, 3_600_000, 0, 100_000)).await.unwrap();

    let decomposition = canned(
        r#"{"subtasks": [
            {"description": "Python web API tradeoffs", "dependencies": [], "tool_allowlist": []},
            {"description": "Go web API tradeoffs", "dependencies": [], "tool_allowlist": []},
            {"description": "Rust web API tradeoffs", "dependencies": [], "tool_allowlist": []}
        ]}"#,
    );
    let llm = MockLlmClient::with_script(vec![
        decomposition,
        canned("Python is easy to write but slower."),
        canned("Go has great concurrency primitives."),
        canned("Rust is fast and memory-safe."),
        canned("Python, Go, and Rust each have tradeoffs for web APIs: ease of use, concurrency, and performance."),
    ]);
    let orch = build_orchestrator(storage, llm, ShannonConfig::default());

    let resp = orch
        .submit_task(
            base_request(
                "Compare Python, Go, and Rust for building a web API. List pros and cons.",
                TaskMode::Standard,
            ),
            0,
        )
        .await
        .unwrap();
    let status = wait_until_terminal(&orch, &resp.task_id).await;
    assert_eq!(status, TaskStatus::Completed);

    let got = orch.get_status(&resp.task_id).await.unwrap();
    assert!(got.usage.total_tokens > 0);
}

/// S4 Budget breach: session already at 95/100 tokens; any real request
/// exceeds the remaining 5, so the router demotes through the mode ladder
/// and ultimately fails `BudgetExceeded` once `Simple` no longer fits.
#[tokio::test]
async fn s4_budget_breach_fails_closed_without_overconsumption() {
    let (storage, _tmp) = Storage::open_temp().unwrap();
    storage.sessions.put(&Session::new("s1", "u1", None, 3_600_000, 0, 100)).await.unwrap();
    storage.budgets.put(&BudgetLedger::new("s1", 100, 10.0)).await.unwrap();
    let mut ledger = storage.budgets.get("s1").await.unwrap().unwrap();
    ledger.record_usage(95, 1.0, 0);
    storage.budgets.put(&ledger).await.unwrap();

    let llm = MockLlmClient::with_script(vec![]);
    let orch = build_orchestrator(storage, llm, ShannonConfig::default());

    let resp = orch
        .submit_task(base_request("Please write a detailed five paragraph essay.", TaskMode::Standard), 0)
        .await
        .unwrap();
    let status = wait_until_terminal(&orch, &resp.task_id).await;
    assert_eq!(status, TaskStatus::Failed);
}

/// S5 Policy denial: a dangerous-pattern query is denied before any LLM
/// activity runs and the task transitions straight to `failed`.
#[tokio::test]
async fn s5_policy_denial_blocks_before_any_llm_call() {
    let (storage, _tmp) = Storage::open_temp().unwrap();
    storage.sessions.put(&Session::new("s1", "u1", None, 3_600_000, 0, 100_000)).await.unwrap();
    let llm = MockLlmClient::with_script(vec![]);
    let orch = build_orchestrator(storage, llm, ShannonConfig::default());

    let resp = orch
        .submit_task(base_request("please delete all files on the server", TaskMode::Simple), 0)
        .await
        .unwrap();
    let status = wait_until_terminal(&orch, &resp.task_id).await;
    assert_eq!(status, TaskStatus::Failed);
}

/// S6 Cancel mid-flight: cancel a submitted task immediately; the terminal
/// status must be `Cancelled`, never `Completed`.
#[tokio::test]
async fn s6_cancel_mid_flight() {
    let (storage, _tmp) = Storage::open_temp().unwrap();
    storage.sessions.put(&Session::new("s1", "u1", None, 3_600_000, 0, 100_000)).await.unwrap();

    let decomposition = canned(
        r#"{"subtasks": [
            {"description": "first leg", "dependencies": [], "tool_allowlist": []},
            {"description": "second leg", "dependencies": [], "tool_allowlist": []},
            {"description": "third leg", "dependencies": [], "tool_allowlist": []}
        ]}"#,
    );
    let llm = MockLlmClient::with_script(vec![
        decomposition,
        canned("leg one done"),
        canned("leg two done"),
        canned("leg three done"),
        canned("synthesis"),
    ]);
    let orch = build_orchestrator(storage, llm, ShannonConfig::default());

    let resp = orch
        .submit_task(base_request("Plan a three-stage rollout and compare options.", TaskMode::Standard), 0)
        .await
        .unwrap();
    orch.cancel(&resp.task_id, Some("user requested".to_string())).await.unwrap();

    let control = orch.get_control_state(&resp.task_id).await.unwrap();
    assert_eq!(control.status, TaskStatus::Cancelled);
    assert!(!control.cancellable);

    // The cancellation flag is terminal: even once the spawned task finishes
    // running to completion underneath, status reporting never reverts.
    wait_until_terminal(&orch, &resp.task_id).await;
    let status = orch.get_status(&resp.task_id).await.unwrap().status;
    assert_eq!(status, TaskStatus::Cancelled);
}

/// Idempotency (spec.md §8 property 2): two submissions with the same key
/// return the same `workflow_id`, and the underlying work runs once.
#[tokio::test]
async fn idempotent_submission_runs_once() {
    let (storage, _tmp) = Storage::open_temp().unwrap();
    storage.sessions.put(&Session::new("s1", "u1", None, 3_600_000, 0, 100_000)).await.unwrap();
    let llm = Arc::new(MockLlmClient::with_script(vec![canned("4")]));
    let bus = Arc::new(StreamBus::new(1000));
    let acts = Arc::new(DefaultActivities::new(
        llm.clone(),
        Arc::new(ToolRegistry::new()),
        Arc::new(storage.patterns.clone()),
        bus,
    ));
    let config = ShannonConfig::default();
    let sessions = Arc::new(SessionManager::new(Arc::new(storage.sessions), 1000, 3_600_000, 200));
    let budget = Arc::new(BudgetManager::new(Arc::new(storage.budgets), config.budget.clone()));
    let learning =
        Arc::new(LearningRouter::new(Arc::new(storage.patterns.clone()), config.learning_router.clone()));
    let executions = Arc::new(ExecutionWriter::new(Arc::new(storage.executions)));
    let router = Arc::new(Router {
        activities: acts,
        config: config.clone(),
        sessions,
        budget,
        policy: Arc::new(PolicyEngine::default()),
        learning,
        executions,
        patterns: Arc::new(storage.patterns),
        templates: Arc::new(TemplateRegistry::new()),
        roles: Arc::new(RoleRegistry::with_builtins()),
    });
    let orch = Orchestrator::new(router, config);

    let mut req = base_request("What is 2+2?", TaskMode::Simple);
    req.idempotency_key = Some("dedup-1".to_string());

    let first = orch.submit_task(req.clone(), 0).await.unwrap();
    let second = orch.submit_task(req, 0).await.unwrap();
    assert_eq!(first.workflow_id, second.workflow_id);

    wait_until_terminal(&orch, &first.task_id).await;
    assert_eq!(llm.call_count(), 1);
}
