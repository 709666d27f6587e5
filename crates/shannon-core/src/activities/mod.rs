//! The activity library, spec.md §4.10 (C5): "every activity is idempotent
//! over (inputs, attempt), returns structured results, and is registered
//! under a stable name." Registration/timeout/retry metadata lives in
//! `ActivityRegistration`; the `Activities` trait is the stable-name surface
//! strategy workflows call through `WorkflowContext::run_activity`.

pub mod default;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shannon_models::{AgentInvocation, MemoryItem, PatternRecord, Subtask};

use crate::error::Result;

pub use default::DefaultActivities;

/// Registration metadata, spec.md §4.10 "Activity timeouts and retry
/// policies are declared at registration: default 30s schedule-to-close, 3
/// retries with jitter, no retry on `Invalid*` or `PolicyDenied`."
#[derive(Debug, Clone)]
pub struct ActivityRegistration {
    pub name: &'static str,
    pub schedule_to_close: Duration,
    pub max_attempts: u32,
}

impl ActivityRegistration {
    pub const fn new(name: &'static str) -> Self {
        Self { name, schedule_to_close: Duration::from_secs(30), max_attempts: 3 }
    }
}

/// The closed set of stable activity names, spec.md §4.10 "Names and
/// reserved agent indices are closed sets".
pub mod names {
    pub const DECOMPOSE_TASK: &str = "DecomposeTask";
    pub const EXECUTE_AGENT: &str = "ExecuteAgent";
    pub const SYNTHESIZE_RESULTS: &str = "SynthesizeResults";
    pub const SYNTHESIZE_RESULTS_LLM: &str = "SynthesizeResultsLLM";
    pub const EVALUATE_RESULT: &str = "EvaluateResult";
    pub const ANALYZE_COMPLEXITY: &str = "AnalyzeComplexity";
    pub const REFINE_RESEARCH_QUERY: &str = "RefineResearchQuery";
    pub const GENERATE_SUBQUERIES: &str = "GenerateSubqueries";
    pub const ROUTE_SEARCH: &str = "RouteSearch";
    pub const MERGE_SEARCH_RESULTS: &str = "MergeSearchResults";
    pub const EVALUATE_COVERAGE: &str = "EvaluateCoverage";
    pub const EXTRACT_FACTS: &str = "ExtractFacts";
    pub const VERIFY_CLAIMS: &str = "VerifyClaimsActivity";
    pub const VERIFY_BATCH: &str = "VerifyBatch";
    pub const ADD_CITATIONS_WITH_VERIFY: &str = "AddCitationsWithVerify";
    pub const PERSIST_DEBATE_CONSENSUS: &str = "PersistDebateConsensus";
    pub const RECORD_METRICS: &str = "RecordMetrics";
    pub const RECORD_PATTERN_METRICS: &str = "RecordPatternMetrics";
    pub const EMIT_TASK_UPDATE: &str = "EmitTaskUpdate";
    pub const CHECK_TOKEN_BUDGET: &str = "CheckTokenBudget";
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecomposeTaskInput {
    pub query: String,
    pub max_subtasks: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteAgentInput {
    pub agent_name: String,
    pub subtask: Subtask,
    pub context_snippets: Vec<String>,
    pub memory_snippets: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluateResultOutput {
    pub satisfactory: bool,
    pub critique: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ComplexityAnalysis {
    pub score: f64,
    pub tag: ComplexityTag,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityTag {
    Trivial,
    Simple,
    Moderate,
    Complex,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefinedQuery {
    pub refined: String,
    pub entities: Vec<String>,
    pub localization: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub source_id: String,
    pub title: String,
    pub snippet: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageReport {
    pub covered_fraction: f64,
    pub uncovered_topics: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedFact {
    pub text: String,
    pub source_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifiedClaim {
    pub fact: ExtractedFact,
    pub verified: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CitedText {
    pub text: String,
    pub citations: Vec<Citation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    pub index: usize,
    pub source_id: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateArgument {
    pub agent_name: String,
    pub persona: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateConsensus {
    pub winning_argument: Option<String>,
    pub synthesis: String,
    pub scores: Vec<(String, f32)>,
}

/// The stable-name activity surface, spec.md §4.10/§4.2-§4.7. Strategy
/// workflows never call implementations directly; they go through
/// `WorkflowContext::run_activity(name, input, || activities.method(...))`
/// so every invocation is recorded for replay.
#[async_trait]
pub trait Activities: Send + Sync {
    async fn decompose_task(&self, input: DecomposeTaskInput) -> Result<Vec<Subtask>>;

    async fn execute_agent(&self, input: ExecuteAgentInput) -> Result<AgentInvocation>;

    async fn synthesize_results(
        &self,
        query: &str,
        invocations: &[AgentInvocation],
        template_hint: Option<&str>,
    ) -> Result<String>;

    async fn evaluate_result(
        &self,
        query: &str,
        candidate: &str,
        require_citations: bool,
    ) -> Result<EvaluateResultOutput>;

    async fn analyze_complexity(&self, query: &str) -> Result<ComplexityAnalysis>;

    async fn refine_research_query(&self, query: &str) -> Result<RefinedQuery>;

    async fn generate_subqueries(&self, refined: &RefinedQuery, n: usize) -> Result<Vec<String>>;

    async fn route_search(&self, subquery: &str) -> Result<Vec<SearchResult>>;

    async fn merge_search_results(&self, batches: Vec<Vec<SearchResult>>) -> Result<Vec<SearchResult>>;

    async fn evaluate_coverage(&self, query: &str, results: &[SearchResult]) -> Result<CoverageReport>;

    async fn extract_facts(&self, results: &[SearchResult]) -> Result<Vec<ExtractedFact>>;

    async fn verify_claims(&self, facts: Vec<ExtractedFact>) -> Result<Vec<VerifiedClaim>>;

    async fn add_citations_with_verify(
        &self,
        draft: &str,
        claims: &[VerifiedClaim],
    ) -> Result<CitedText>;

    async fn persist_debate_consensus(
        &self,
        session_id: &str,
        arguments: &[DebateArgument],
        consensus: &DebateConsensus,
    ) -> Result<()>;

    async fn record_pattern_metrics(&self, record: PatternRecord) -> Result<()>;

    async fn record_agent_memory_note(
        &self,
        agent_id: &str,
        text: &str,
        provenance: &str,
        now_ms: i64,
    ) -> Result<MemoryItem>;

    /// `EmitTaskUpdate`, spec.md §4.12. Returns the assigned seq number so
    /// callers can assert ordering without reaching into the bus directly.
    async fn emit_task_update(
        &self,
        workflow_id: &str,
        ts_ms: i64,
        event_type: shannon_contracts::EventType,
        agent_id: Option<String>,
        payload: serde_json::Value,
    ) -> Result<u64>;
}
