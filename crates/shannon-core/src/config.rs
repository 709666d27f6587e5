//! Typed configuration loaded from TOML with environment overrides, per
//! SPEC_FULL.md's AMBIENT STACK section: a typed config struct backed by
//! serde, with a `toml + serde` pairing for the on-disk format.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Per-priority-class worker pool sizes, spec.md §5 "defaults 12/10/8/4".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriorityQueueConfig {
    pub critical: usize,
    pub high: usize,
    pub normal: usize,
    pub low: usize,
}

impl Default for PriorityQueueConfig {
    fn default() -> Self {
        Self { critical: 12, high: 10, normal: 8, low: 4 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    pub window_secs: u64,
    pub error_threshold: f64,
    pub min_requests: u64,
}

impl Default for CircuitBreakerConfig {
    /// spec.md §4.9 "rolling error rate over a window, default window 30s,
    /// error threshold 0.5, min requests 20".
    fn default() -> Self {
        Self { window_secs: 30, error_threshold: 0.5, min_requests: 20 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DagConfig {
    pub max_parallel: usize,
    pub refinement_k: usize,
    pub reflection_complexity_threshold: f64,
}

impl Default for DagConfig {
    fn default() -> Self {
        Self { max_parallel: 4, refinement_k: 2, reflection_complexity_threshold: 0.7 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactConfig {
    pub max_iterations: u32,
    pub stuck_window: u32,
}

impl Default for ReactConfig {
    /// spec.md §4.3 "default 15" iterations, stuck-detector over "3
    /// consecutive iterations".
    fn default() -> Self {
        Self { max_iterations: 15, stuck_window: 3 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchConfig {
    pub min_subqueries: usize,
    pub max_subqueries: usize,
    pub max_rounds: u32,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self { min_subqueries: 3, max_subqueries: 8, max_rounds: 3 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateConfig {
    pub agents: usize,
    pub rounds: usize,
}

impl Default for DebateConfig {
    fn default() -> Self {
        Self { agents: 3, rounds: 2 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeOfThoughtsConfig {
    pub branching_factor: usize,
    pub max_depth: usize,
    pub acceptance_threshold: f32,
}

impl Default for TreeOfThoughtsConfig {
    fn default() -> Self {
        Self { branching_factor: 3, max_depth: 5, acceptance_threshold: 0.9 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReflectionConfig {
    pub max_iterations: u32,
}

impl Default for ReflectionConfig {
    fn default() -> Self {
        Self { max_iterations: 3 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningRouterConfig {
    pub epsilon: f64,
    pub latency_target_secs: f64,
    pub token_target: f64,
    pub confidence_adopt_threshold: f64,
}

impl Default for LearningRouterConfig {
    fn default() -> Self {
        Self {
            epsilon: 0.10,
            latency_target_secs: 5.0,
            token_target: 3000.0,
            confidence_adopt_threshold: 0.7,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetConfig {
    pub circuit_breaker: CircuitBreakerConfig,
    pub max_backpressure_waits: u32,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self { circuit_breaker: CircuitBreakerConfig::default(), max_backpressure_waits: 3 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub lru_capacity: usize,
    pub default_ttl_ms: i64,
    pub history_limit: usize,
}

impl Default for SessionConfig {
    /// spec.md §4.11 "max N sessions (default 10k)".
    fn default() -> Self {
        Self { lru_capacity: 10_000, default_ttl_ms: 24 * 3600 * 1000, history_limit: 200 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalConfig {
    pub timeout_secs: u64,
}

impl Default for ApprovalConfig {
    /// spec.md §4.13 "Timeout default 15 min".
    fn default() -> Self {
        Self { timeout_secs: 15 * 60 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    pub replay_buffer_size: usize,
}

impl Default for StreamConfig {
    /// spec.md §4.12 "bounded buffer, default 1k events".
    fn default() -> Self {
        Self { replay_buffer_size: 1000 }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShannonConfig {
    pub priority_queues: PriorityQueueConfig,
    pub dag: DagConfig,
    pub react: ReactConfig,
    pub research: ResearchConfig,
    pub debate: DebateConfig,
    pub tree_of_thoughts: TreeOfThoughtsConfig,
    pub reflection: ReflectionConfig,
    pub learning_router: LearningRouterConfig,
    pub budget: BudgetConfig,
    pub session: SessionConfig,
    pub approval: ApprovalConfig,
    pub stream: StreamConfig,
    pub enable_tool_selection: bool,
    pub tool_cache_ttl_secs: u64,
    pub otel_exporter_otlp_endpoint: Option<String>,
    pub environment: shannon_contracts::Environment,
}

impl ShannonConfig {
    pub fn from_toml(raw: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Apply the environment variables of record (spec.md §6), as plain
    /// key=value overrides rather than reading `std::env` directly so
    /// callers (and tests) stay in control of the source of truth —
    /// workflow-adjacent code must not read the environment itself
    /// (SPEC_FULL.md Design Notes).
    pub fn apply_env_overrides(&mut self, env: &HashMap<String, String>) {
        if let Some(v) = env.get("ENABLE_TOOL_SELECTION") {
            self.enable_tool_selection = shannon_contracts::normalize_bool(v);
        }
        if let Some(v) = env.get("TOOL_CACHE_TTL_SECONDS") {
            if let Ok(secs) = v.parse() {
                self.tool_cache_ttl_secs = secs;
            }
        }
        if let Some(v) = env.get("OTEL_EXPORTER_OTLP_ENDPOINT") {
            self.otel_exporter_otlp_endpoint = Some(v.clone());
        }
        if let Some(v) = env.get("SHANNON_ENVIRONMENT") {
            self.environment = match v.to_ascii_lowercase().as_str() {
                "dev" | "development" => shannon_contracts::Environment::Dev,
                "staging" => shannon_contracts::Environment::Staging,
                _ => shannon_contracts::Environment::Production,
            };
        }
        if let Some(v) = env.get("WORKER_ACT_CRITICAL") {
            if let Ok(n) = v.parse() {
                self.priority_queues.critical = n;
            }
        }
        if let Some(v) = env.get("WORKER_ACT_HIGH") {
            if let Ok(n) = v.parse() {
                self.priority_queues.high = n;
            }
        }
        if let Some(v) = env.get("WORKER_ACT_NORMAL") {
            if let Ok(n) = v.parse() {
                self.priority_queues.normal = n;
            }
        }
        if let Some(v) = env.get("WORKER_ACT_LOW") {
            if let Ok(n) = v.parse() {
                self.priority_queues.low = n;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_constants() {
        let cfg = ShannonConfig::default();
        assert_eq!(cfg.react.max_iterations, 15);
        assert_eq!(cfg.session.lru_capacity, 10_000);
        assert_eq!(cfg.approval.timeout_secs, 900);
        assert_eq!(cfg.stream.replay_buffer_size, 1000);
    }

    #[test]
    fn env_override_normalizes_bool() {
        let mut cfg = ShannonConfig::default();
        let mut env = HashMap::new();
        env.insert("ENABLE_TOOL_SELECTION".to_string(), "TRUE".to_string());
        cfg.apply_env_overrides(&env);
        assert!(cfg.enable_tool_selection);
    }

    #[test]
    fn parses_partial_toml_with_defaults() {
        let cfg = ShannonConfig::from_toml("").unwrap();
        assert_eq!(cfg.dag.max_parallel, 4);
    }

    #[test]
    fn environment_defaults_to_production() {
        assert_eq!(ShannonConfig::default().environment, shannon_contracts::Environment::Production);
    }

    #[test]
    fn env_override_parses_environment() {
        let mut cfg = ShannonConfig::default();
        let mut env = HashMap::new();
        env.insert("SHANNON_ENVIRONMENT".to_string(), "dev".to_string());
        cfg.apply_env_overrides(&env);
        assert_eq!(cfg.environment, shannon_contracts::Environment::Dev);
    }
}
