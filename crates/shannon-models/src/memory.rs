use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemoryScope {
    Session(String),
    Agent(String),
    Global,
}

/// A retrievable record, spec.md §3 "Memory Item". Used read-only by
/// workflows; written by dedicated activities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryItem {
    pub id: String,
    pub scope: MemoryScope,
    pub embedding: Vec<f32>,
    pub text: String,
    pub created_at_ms: i64,
    pub provenance: String,
}

/// Cosine similarity, used for semantic search and near-duplicate
/// suppression (spec.md §4.11: "cosine >= 0.95 collapsed").
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Suppress near-duplicate memory items (cosine >= threshold), keeping the
/// first occurrence encountered (callers pass items pre-sorted by
/// relevance).
pub fn suppress_near_duplicates(items: Vec<MemoryItem>, threshold: f32) -> Vec<MemoryItem> {
    let mut kept: Vec<MemoryItem> = Vec::new();
    for item in items {
        let is_dup = kept
            .iter()
            .any(|k| cosine_similarity(&k.embedding, &item.embedding) >= threshold);
        if !is_dup {
            kept.push(item);
        }
    }
    kept
}
