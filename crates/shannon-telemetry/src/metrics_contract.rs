//! Named constants + thin wrappers for the Prometheus metrics enumerated in
//! spec.md §6, "Telemetry". Keeping the names as constants (rather than
//! inline string literals scattered through `shannon-core`) avoids typo
//! drift between the emitting call site and a dashboard/alert built against
//! the name.

pub const MODEL_TIER_REQUESTED_TOTAL: &str = "shannon_model_tier_requested_total";
pub const MODEL_TIER_SELECTED_TOTAL: &str = "shannon_model_tier_selected_total";
pub const TIER_SELECTION_DRIFT_TOTAL: &str = "shannon_tier_selection_drift_total";
pub const PROVIDER_OVERRIDE_REQUESTED_TOTAL: &str = "shannon_provider_override_requested_total";
pub const PROVIDER_OVERRIDE_RESPECTED_TOTAL: &str = "shannon_provider_override_respected_total";
pub const SESSION_CACHE_SIZE: &str = "shannon_session_cache_size_total";
pub const SESSION_CACHE_HITS_TOTAL: &str = "shannon_session_cache_hits_total";
pub const SESSION_CACHE_MISSES_TOTAL: &str = "shannon_session_cache_misses_total";
pub const SESSION_CACHE_EVICTIONS_TOTAL: &str = "shannon_session_cache_evictions_total";
pub const STRATEGY_SELECTION_TOTAL: &str = "shannon_strategy_selection_total";
pub const DECOMPOSITION_PATTERNS_RECORDED_TOTAL: &str =
    "shannon_decomposition_patterns_recorded_total";
pub const ACTIVITY_LATENCY_SECONDS: &str = "shannon_activity_latency_seconds";

/// Record a strategy-selection decision. `source` is `"epsilon_greedy"`,
/// `"exploration"`, `"cold_start"`, `"template"`, or `"mode_rule"` per
/// spec.md §4.1/§4.8.
pub fn record_strategy_selection(strategy: &str, source: &str) {
    metrics::counter!(STRATEGY_SELECTION_TOTAL, "strategy" => strategy.to_string(), "source" => source.to_string())
        .increment(1);
}

pub fn record_tier_requested(tier: &str) {
    metrics::counter!(MODEL_TIER_REQUESTED_TOTAL, "tier" => tier.to_string()).increment(1);
}

pub fn record_tier_selected(tier: &str) {
    metrics::counter!(MODEL_TIER_SELECTED_TOTAL, "tier" => tier.to_string()).increment(1);
}

pub fn record_tier_drift() {
    metrics::counter!(TIER_SELECTION_DRIFT_TOTAL).increment(1);
}

pub fn record_provider_override(requested: bool, respected: bool) {
    if requested {
        metrics::counter!(PROVIDER_OVERRIDE_REQUESTED_TOTAL).increment(1);
    }
    if respected {
        metrics::counter!(PROVIDER_OVERRIDE_RESPECTED_TOTAL).increment(1);
    }
}

pub fn record_session_cache(size: u64, hit: bool, eviction: bool) {
    metrics::gauge!(SESSION_CACHE_SIZE).set(size as f64);
    if hit {
        metrics::counter!(SESSION_CACHE_HITS_TOTAL).increment(1);
    } else {
        metrics::counter!(SESSION_CACHE_MISSES_TOTAL).increment(1);
    }
    if eviction {
        metrics::counter!(SESSION_CACHE_EVICTIONS_TOTAL).increment(1);
    }
}

pub fn record_decomposition_pattern() {
    metrics::counter!(DECOMPOSITION_PATTERNS_RECORDED_TOTAL).increment(1);
}

pub fn record_activity_latency(activity: &str, seconds: f64) {
    metrics::histogram!(ACTIVITY_LATENCY_SECONDS, "activity" => activity.to_string())
        .record(seconds);
}
