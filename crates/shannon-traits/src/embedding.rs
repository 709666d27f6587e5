use async_trait::async_trait;

/// Thin, provider-agnostic caller for text embedding, spec.md §2 C4.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>>;
}
