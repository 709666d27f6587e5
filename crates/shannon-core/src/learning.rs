//! Learning router, spec.md §4.8 (C8): epsilon-greedy strategy selection
//! over historical Pattern Records, scoring candidates then clamping to a
//! confidence-gated adoption threshold.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rand::Rng;
use shannon_models::{PatternRecord, Strategy};
use shannon_traits::PatternStore;

use crate::config::LearningRouterConfig;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecommendationSource {
    Exploration,
    EpsilonGreedy,
    ColdStart,
}

#[derive(Debug, Clone)]
pub struct Recommendation {
    pub strategy: Strategy,
    pub confidence: f64,
    pub source: RecommendationSource,
}

/// Cold-start rule, spec.md §4.8: "zero records: if complexity > 0.7 -> ToT
/// (0.5); > 0.4 -> CoT (0.5); else -> ReAct (0.5)". "CoT" in the original
/// phrasing maps to the DAG strategy here (chain-of-thought-style
/// decomposition is what DAG implements; there is no separate CoT strategy
/// in the closed `Strategy` enum).
fn cold_start(complexity: f64) -> Recommendation {
    let strategy = if complexity > 0.7 {
        Strategy::TreeOfThoughts
    } else if complexity > 0.4 {
        Strategy::Dag
    } else {
        Strategy::React
    };
    Recommendation { strategy, confidence: 0.5, source: RecommendationSource::ColdStart }
}

fn contextual_boost(records: &[PatternRecord], query_embedding: &[f32]) -> f64 {
    if query_embedding.is_empty() {
        return 0.0;
    }
    let similarities: Vec<f64> = records
        .iter()
        .filter(|r| r.success)
        .map(|r| shannon_models::cosine_similarity(query_embedding, &r.query_embedding) as f64)
        .collect();
    if similarities.is_empty() {
        return 0.0;
    }
    let avg = similarities.iter().sum::<f64>() / similarities.len() as f64;
    (avg * 0.1).clamp(0.0, 0.1)
}

fn score_strategy(
    strategy: Strategy,
    records: &[PatternRecord],
    config: &LearningRouterConfig,
    query_embedding: &[f32],
) -> (f64, usize, f64) {
    let for_strategy: Vec<&PatternRecord> = records.iter().filter(|r| r.strategy == strategy).collect();
    if for_strategy.is_empty() {
        return (0.0, 0, 0.0);
    }
    let n = for_strategy.len() as f64;
    let success_rate = for_strategy.iter().filter(|r| r.success).count() as f64 / n;
    let avg_latency = for_strategy.iter().map(|r| r.latency.as_secs_f64()).sum::<f64>() / n;
    let avg_tokens = for_strategy.iter().map(|r| r.tokens as f64).sum::<f64>() / n;

    let latency_penalty = if avg_latency > config.latency_target_secs {
        ((avg_latency - config.latency_target_secs) / config.latency_target_secs * 0.1).min(0.2)
    } else {
        0.0
    };
    let token_penalty = if avg_tokens > config.token_target {
        ((avg_tokens - config.token_target) / config.token_target * 0.1).min(0.15)
    } else {
        0.0
    };
    let boost = contextual_boost(&for_strategy.iter().map(|r| (*r).clone()).collect::<Vec<_>>(), query_embedding);

    let score = (success_rate - latency_penalty - token_penalty + boost).clamp(0.0, 1.0);
    (score, for_strategy.len(), boost)
}

/// Confidence adjusted by sample size, recency (exponential decay), and
/// variance, spec.md §4.8. Larger, more-recent, lower-variance samples push
/// confidence toward the raw score; small/old/noisy samples pull it toward
/// a conservative midpoint.
fn adjusted_confidence(score: f64, records: &[PatternRecord], strategy: Strategy, now_ms: i64) -> f64 {
    let for_strategy: Vec<&PatternRecord> = records.iter().filter(|r| r.strategy == strategy).collect();
    if for_strategy.is_empty() {
        return 0.5;
    }
    let n = for_strategy.len() as f64;
    let sample_factor = (n / (n + 5.0)).clamp(0.0, 1.0);

    let mean_age_ms = for_strategy.iter().map(|r| (now_ms - r.timestamp_ms).max(0) as f64).sum::<f64>() / n;
    let recency_factor = (-mean_age_ms / (24.0 * 3600.0 * 1000.0)).exp().clamp(0.1, 1.0);

    let mean_success = for_strategy.iter().filter(|r| r.success).count() as f64 / n;
    let variance = for_strategy
        .iter()
        .map(|r| {
            let s = if r.success { 1.0 } else { 0.0 };
            (s - mean_success).powi(2)
        })
        .sum::<f64>()
        / n;
    let variance_factor = (1.0 - variance).clamp(0.3, 1.0);

    (score * sample_factor * recency_factor * variance_factor).clamp(0.0, 1.0)
}

pub struct LearningRouter<S: PatternStore> {
    store: std::sync::Arc<S>,
    config: LearningRouterConfig,
}

impl<S: PatternStore> LearningRouter<S> {
    pub fn new(store: std::sync::Arc<S>, config: LearningRouterConfig) -> Self {
        Self { store, config }
    }

    /// `GetRecommendation`. `complexity` feeds the cold-start rule;
    /// `query_embedding` feeds the contextual-similarity boost.
    pub async fn recommend(&self, complexity: f64, query_embedding: &[f32]) -> Result<Recommendation> {
        let records = self.store.all_recent(500).await?;
        if records.is_empty() {
            return Ok(cold_start(complexity));
        }

        if rand::rng().random_bool(self.config.epsilon) {
            let idx = rand::rng().random_range(0..Strategy::ALL.len());
            return Ok(Recommendation {
                strategy: Strategy::ALL[idx],
                confidence: 0.5,
                source: RecommendationSource::Exploration,
            });
        }

        let now_ms = now_ms();
        let mut best: Option<(Strategy, f64)> = None;
        for &strategy in Strategy::ALL.iter() {
            let (score, sample_count, _boost) = score_strategy(strategy, &records, &self.config, query_embedding);
            if sample_count == 0 {
                continue;
            }
            if best.as_ref().map(|(_, b)| score > *b).unwrap_or(true) {
                best = Some((strategy, score));
            }
        }

        match best {
            Some((strategy, score)) => {
                let confidence = adjusted_confidence(score, &records, strategy, now_ms);
                Ok(Recommendation { strategy, confidence, source: RecommendationSource::EpsilonGreedy })
            }
            None => Ok(cold_start(complexity)),
        }
    }

    /// Append a Pattern Record after a workflow completes. Callers invoke
    /// this asynchronously (fire-and-forget from the router's perspective)
    /// per spec.md §4.8 "After each workflow, append a Pattern Record
    /// asynchronously" — modeled here as a plain async call the caller may
    /// choose not to await inline.
    pub async fn record(&self, record: PatternRecord) -> Result<()> {
        self.store.append(record).await?;
        Ok(())
    }
}

fn now_ms() -> i64 {
    Duration::from(SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default()).as_millis() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use shannon_storage::Storage;

    fn config() -> LearningRouterConfig {
        LearningRouterConfig::default()
    }

    fn record(strategy: Strategy, success: bool, latency_secs: f64, tokens: u64, ts_ms: i64) -> PatternRecord {
        PatternRecord {
            strategy,
            query_embedding: vec![1.0, 0.0],
            success,
            tokens,
            latency: Duration::from_secs_f64(latency_secs),
            timestamp_ms: ts_ms,
            metadata: serde_json::json!({}),
        }
    }

    #[tokio::test]
    async fn cold_start_recommends_by_complexity_band() {
        let (storage, _tmp) = Storage::open_temp().unwrap();
        let router = LearningRouter::new(std::sync::Arc::new(storage.patterns), config());
        assert_eq!(router.recommend(0.9, &[]).await.unwrap().strategy, Strategy::TreeOfThoughts);
        assert_eq!(router.recommend(0.5, &[]).await.unwrap().strategy, Strategy::Dag);
        assert_eq!(router.recommend(0.1, &[]).await.unwrap().strategy, Strategy::React);
    }

    #[tokio::test]
    async fn prefers_higher_success_rate_strategy() {
        let (storage, _tmp) = Storage::open_temp().unwrap();
        let router = LearningRouter::new(std::sync::Arc::new(storage.patterns), config());
        for _ in 0..10 {
            router.record(record(Strategy::Dag, true, 2.0, 1000, 0)).await.unwrap();
        }
        for _ in 0..10 {
            router.record(record(Strategy::React, false, 2.0, 1000, 0)).await.unwrap();
        }
        // Force exploitation by zeroing epsilon for this assertion.
        let mut cfg = config();
        cfg.epsilon = 0.0;
        let router = LearningRouter::new(router.store.clone(), cfg);
        let rec = router.recommend(0.5, &[]).await.unwrap();
        assert_eq!(rec.strategy, Strategy::Dag);
        assert_eq!(rec.source, RecommendationSource::EpsilonGreedy);
    }

    #[test]
    fn confidence_rises_with_sample_size() {
        let few = vec![record(Strategy::Dag, true, 1.0, 100, 0)];
        let many: Vec<_> = (0..50).map(|_| record(Strategy::Dag, true, 1.0, 100, 0)).collect();
        let c_few = adjusted_confidence(0.8, &few, Strategy::Dag, 0);
        let c_many = adjusted_confidence(0.8, &many, Strategy::Dag, 0);
        assert!(c_many > c_few);
    }
}
