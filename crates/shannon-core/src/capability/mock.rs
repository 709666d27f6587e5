//! In-memory mock capability clients for tests: deterministic canned
//! responses, no network calls, predictable token counts, so the strategy
//! workflow tests stay fast and replay-safe.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use shannon_models::MemoryItem;
use shannon_traits::{
    CompletionRequest, CompletionResponse, EmbeddingClient, FinishReason, LlmClient, Tool,
    ToolError, ToolOutput, VectorMatch, VectorStore,
};

/// Deterministic text->embedding hash, stable across runs and platforms
/// (spec.md §8 property 8's determinism concern extends naturally to any
/// hash-derived test fixture, not just agent names).
fn hash_embed(text: &str) -> Vec<f32> {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    text.hash(&mut hasher);
    let seed = hasher.finish();
    (0..8).map(|i| (((seed >> (i * 4)) & 0xF) as f32) / 15.0).collect()
}

/// A scripted LLM client: returns canned completions keyed by call index,
/// falling back to echoing the last user message when the script is
/// exhausted. `calls()` lets tests assert on exactly what was sent.
#[derive(Default)]
pub struct MockLlmClient {
    script: Mutex<Vec<CompletionResponse>>,
    calls: Mutex<Vec<CompletionRequest>>,
}

impl MockLlmClient {
    pub fn with_script(responses: Vec<CompletionResponse>) -> Self {
        Self { script: Mutex::new(responses), calls: Mutex::new(Vec::new()) }
    }

    pub fn calls(&self) -> Vec<CompletionRequest> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

pub fn canned(content: &str) -> CompletionResponse {
    CompletionResponse {
        content: content.to_string(),
        tool_calls: Vec::new(),
        finish_reason: FinishReason::Stop,
        prompt_tokens: 20,
        completion_tokens: (content.len() as u64 / 4).max(1),
        cost_usd: 0.0001,
        model: "mock-model".to_string(),
        provider: "mock".to_string(),
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, request: CompletionRequest) -> anyhow::Result<CompletionResponse> {
        self.calls.lock().push(request.clone());
        let mut script = self.script.lock();
        if !script.is_empty() {
            return Ok(script.remove(0));
        }
        let echoed = request
            .messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        Ok(canned(&format!("ack: {echoed}")))
    }
}

#[derive(Default)]
pub struct MockEmbeddingClient {
    call_count: AtomicU64,
}

#[async_trait]
impl EmbeddingClient for MockEmbeddingClient {
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        Ok(hash_embed(text))
    }
}

#[derive(Default)]
pub struct MockVectorStore {
    items: Mutex<Vec<MemoryItem>>,
}

#[async_trait]
impl VectorStore for MockVectorStore {
    async fn upsert(&self, item: MemoryItem) -> anyhow::Result<()> {
        self.items.lock().push(item);
        Ok(())
    }

    async fn search(&self, embedding: &[f32], k: usize) -> anyhow::Result<Vec<VectorMatch>> {
        let items = self.items.lock();
        let mut scored: Vec<VectorMatch> = items
            .iter()
            .map(|item| VectorMatch {
                item: item.clone(),
                score: shannon_models::cosine_similarity(embedding, &item.embedding),
            })
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }
}

/// A scripted tool: always returns the same output for a given tool name,
/// regardless of input — enough for strategy-level control-flow tests,
/// which assert on whether a tool was called and what was passed in, not on
/// realistic tool semantics.
pub struct MockTool {
    name: String,
    output: Value,
    calls: Mutex<Vec<Value>>,
}

impl MockTool {
    pub fn new(name: impl Into<String>, output: Value) -> Self {
        Self { name: name.into(), output, calls: Mutex::new(Vec::new()) }
    }

    pub fn calls(&self) -> Vec<Value> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Tool for MockTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "mock tool"
    }

    fn parameters_schema(&self) -> Value {
        json!({ "type": "object" })
    }

    async fn execute(&self, input: Value) -> Result<ToolOutput, ToolError> {
        self.calls.lock().push(input);
        Ok(ToolOutput::success(self.output.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shannon_traits::Message;

    #[tokio::test]
    async fn mock_llm_replays_script_then_echoes() {
        let mock = MockLlmClient::with_script(vec![canned("first")]);
        let r1 = mock.complete(CompletionRequest::new(vec![Message::user("hi")])).await.unwrap();
        assert_eq!(r1.content, "first");
        let r2 = mock.complete(CompletionRequest::new(vec![Message::user("hi again")])).await.unwrap();
        assert_eq!(r2.content, "ack: hi again");
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn embed_is_deterministic() {
        let client = MockEmbeddingClient::default();
        let a = client.embed("hello world").await.unwrap();
        let b = client.embed("hello world").await.unwrap();
        assert_eq!(a, b);
    }
}
