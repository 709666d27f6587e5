use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::strategy::Strategy;

/// Append-only historical datum feeding the learning router, spec.md §3
/// "Pattern Record".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternRecord {
    pub strategy: Strategy,
    pub query_embedding: Vec<f32>,
    pub success: bool,
    pub tokens: u64,
    pub latency: Duration,
    pub timestamp_ms: i64,
    pub metadata: serde_json::Value,
}
