//! Capability clients, spec.md §2 C4: thin callers for LLM completion,
//! embedding, tool execution, vector search, code-exec — cached and
//! rate-limited. The trait contracts live in `shannon-traits`; this module
//! only adds the `mock` implementations used by tests and the caching
//! wrapper used in production wiring.

pub mod mock;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use shannon_traits::{CompletionRequest, CompletionResponse, LlmClient, Tool};

/// Name->tool lookup.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }
}

/// Wraps an `LlmClient` with a small request-shape cache — identical
/// requests within the TTL are served from cache rather than re-invoked,
/// bounding both cost and nondeterministic provider variance in retried
/// activities.
pub struct CachedLlmClient<C: LlmClient> {
    inner: Arc<C>,
    cache: shannon_traits::LruCache<String, CompletionResponse>,
    ttl: Duration,
}

impl<C: LlmClient> CachedLlmClient<C> {
    pub fn new(inner: Arc<C>, capacity: usize, ttl: Duration) -> Self {
        Self { inner, cache: shannon_traits::LruCache::new(capacity), ttl }
    }

    fn cache_key(request: &CompletionRequest) -> String {
        serde_json::to_string(request).unwrap_or_default()
    }

    pub async fn complete(&self, request: CompletionRequest) -> anyhow::Result<CompletionResponse> {
        let key = Self::cache_key(&request);
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached);
        }
        let response = self.inner.complete(request).await?;
        self.cache.put(key, response.clone());
        Ok(response)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mock::{canned, MockLlmClient};
    use shannon_traits::Message;

    #[tokio::test]
    async fn identical_requests_hit_cache() {
        let inner = Arc::new(MockLlmClient::with_script(vec![canned("first"), canned("second")]));
        let cached = CachedLlmClient::new(inner.clone(), 100, Duration::from_secs(60));
        let request = CompletionRequest::new(vec![Message::user("hi")]);

        let r1 = cached.complete(request.clone()).await.unwrap();
        let r2 = cached.complete(request).await.unwrap();
        assert_eq!(r1.content, "first");
        assert_eq!(r2.content, "first"); // cache hit, not "second"
        assert_eq!(inner.call_count(), 1);
    }
}
