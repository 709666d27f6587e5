//! Vector-backed memory retrieval, spec.md §4.11: `FetchSemanticMemory`,
//! `FetchHierarchicalMemory`, `FetchAgentMemory`, `RecordAgentMemory`,
//! `FetchSupervisorMemory`. Built on the embedding/vector-store traits
//! and `shannon_models::memory`'s near-duplicate suppression helper.

use std::sync::Arc;

use chrono::Utc;
use shannon_models::{cosine_similarity, suppress_near_duplicates, MemoryItem, MemoryScope};
use shannon_traits::{EmbeddingClient, VectorStore};

use crate::error::Result;

const NEAR_DUPLICATE_THRESHOLD: f32 = 0.95;

/// Memory retrieval surface backed by an embedding client + vector store.
/// Both are narrow capability interfaces (spec.md §2 C4); this struct adds
/// no persistence of its own beyond what `VectorStore::upsert` provides.
pub struct MemoryService<E: EmbeddingClient, V: VectorStore> {
    embeddings: Arc<E>,
    vectors: Arc<V>,
}

impl<E: EmbeddingClient, V: VectorStore> MemoryService<E, V> {
    pub fn new(embeddings: Arc<E>, vectors: Arc<V>) -> Self {
        Self { embeddings, vectors }
    }

    async fn search_scope(&self, query: &str, k: usize) -> Result<Vec<MemoryItem>> {
        let embedding = self.embeddings.embed(query).await?;
        let matches = self.vectors.search(&embedding, k * 2).await?;
        let items: Vec<MemoryItem> = matches.into_iter().map(|m| m.item).collect();
        Ok(suppress_near_duplicates(items, NEAR_DUPLICATE_THRESHOLD).into_iter().take(k).collect())
    }

    /// `FetchSemanticMemory(sessionID, query, k)`.
    pub async fn fetch_semantic_memory(
        &self,
        session_id: &str,
        query: &str,
        k: usize,
    ) -> Result<Vec<MemoryItem>> {
        let items = self.search_scope(query, k).await?;
        Ok(items
            .into_iter()
            .filter(|i| matches!(&i.scope, MemoryScope::Session(s) if s == session_id) || matches!(i.scope, MemoryScope::Global))
            .collect())
    }

    /// `FetchHierarchicalMemory`: session scope first, falling back to
    /// global scope to fill remaining slots — a coarse two-tier retrieval
    /// matching the spec's naming without inventing an unspecified ranking
    /// model.
    pub async fn fetch_hierarchical_memory(
        &self,
        session_id: &str,
        query: &str,
        k: usize,
    ) -> Result<Vec<MemoryItem>> {
        let mut session_items = self.fetch_semantic_memory(session_id, query, k).await?;
        if session_items.len() < k {
            let embedding = self.embeddings.embed(query).await?;
            let matches = self.vectors.search(&embedding, k * 2).await?;
            for m in matches {
                if matches!(m.item.scope, MemoryScope::Global) && session_items.len() < k {
                    let dup = session_items
                        .iter()
                        .any(|existing| cosine_similarity(&existing.embedding, &m.item.embedding) >= NEAR_DUPLICATE_THRESHOLD);
                    if !dup {
                        session_items.push(m.item);
                    }
                }
            }
        }
        Ok(session_items)
    }

    /// `FetchAgentMemory(agentID, query, k)`.
    pub async fn fetch_agent_memory(
        &self,
        agent_id: &str,
        query: &str,
        k: usize,
    ) -> Result<Vec<MemoryItem>> {
        let items = self.search_scope(query, k).await?;
        Ok(items
            .into_iter()
            .filter(|i| matches!(&i.scope, MemoryScope::Agent(a) if a == agent_id))
            .collect())
    }

    /// `RecordAgentMemory(...)`.
    pub async fn record_agent_memory(
        &self,
        agent_id: &str,
        text: &str,
        provenance: &str,
        now_ms: i64,
    ) -> Result<MemoryItem> {
        let embedding = self.embeddings.embed(text).await?;
        let item = MemoryItem {
            id: uuid::Uuid::new_v4().to_string(),
            scope: MemoryScope::Agent(agent_id.to_string()),
            embedding,
            text: text.to_string(),
            created_at_ms: now_ms,
            provenance: provenance.to_string(),
        };
        self.vectors.upsert(item.clone()).await?;
        Ok(item)
    }

    /// `FetchSupervisorMemory(sessionID)`: coordination/planning state,
    /// modeled as the session-scoped memory items tagged with the
    /// `"supervisor"` provenance marker.
    pub async fn fetch_supervisor_memory(&self, session_id: &str) -> Result<Vec<MemoryItem>> {
        let items = self.fetch_semantic_memory(session_id, "supervisor plan", 20).await?;
        Ok(items.into_iter().filter(|i| i.provenance == "supervisor").collect())
    }

    /// Record a supervisor coordination note; helper used by the
    /// Supervisor strategy.
    pub async fn record_supervisor_note(&self, session_id: &str, text: &str) -> Result<MemoryItem> {
        let embedding = self.embeddings.embed(text).await?;
        let item = MemoryItem {
            id: uuid::Uuid::new_v4().to_string(),
            scope: MemoryScope::Session(session_id.to_string()),
            embedding,
            text: text.to_string(),
            created_at_ms: Utc::now().timestamp_millis(),
            provenance: "supervisor".to_string(),
        };
        self.vectors.upsert(item.clone()).await?;
        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::mock::{MockEmbeddingClient, MockVectorStore};

    #[tokio::test]
    async fn agent_memory_is_scoped_to_agent() {
        let embeddings = Arc::new(MockEmbeddingClient::default());
        let vectors = Arc::new(MockVectorStore::default());
        let service = MemoryService::new(embeddings.clone(), vectors.clone());

        service.record_agent_memory("alpha", "alpha's note", "test", 0).await.unwrap();
        service.record_agent_memory("bravo", "bravo's note", "test", 0).await.unwrap();

        let alpha_memory = service.fetch_agent_memory("alpha", "note", 10).await.unwrap();
        assert_eq!(alpha_memory.len(), 1);
        assert_eq!(alpha_memory[0].text, "alpha's note");
    }

    #[tokio::test]
    async fn near_duplicate_items_collapse() {
        let embeddings = Arc::new(MockEmbeddingClient::default());
        let vectors = Arc::new(MockVectorStore::default());
        let service = MemoryService::new(embeddings, vectors.clone());

        // Two items with identical embeddings (mock embeds by fixed seed
        // derived from content hash) should collapse to one after suppression
        // when content is identical.
        service.record_agent_memory("alpha", "same text", "test", 0).await.unwrap();
        service.record_agent_memory("alpha", "same text", "test", 0).await.unwrap();
        let items = service.fetch_agent_memory("alpha", "same text", 10).await.unwrap();
        assert_eq!(items.len(), 1);
    }
}
