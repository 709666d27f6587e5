use async_trait::async_trait;

use shannon_models::MemoryItem;

#[derive(Debug, Clone)]
pub struct VectorMatch {
    pub item: MemoryItem,
    pub score: f32,
}

/// Vector-store capability client, spec.md §1: "vector-store... deployments
/// consumed via narrow interfaces".
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn upsert(&self, item: MemoryItem) -> anyhow::Result<()>;
    async fn search(&self, embedding: &[f32], k: usize) -> anyhow::Result<Vec<VectorMatch>>;
}
