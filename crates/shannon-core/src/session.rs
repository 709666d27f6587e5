//! Session & memory service, spec.md §4.11 (C2). Exposes the session-half of
//! C2 as activities workflows call through `Activities`; `memory.rs` covers
//! the vector/embedding half. An `shannon_traits::LruCache` sits in front of
//! the durable store.

use std::sync::Arc;

use shannon_models::session::HistoryMessage;
use shannon_models::Session;
use shannon_traits::{LruCache, SessionStore};

use crate::error::{Result, ShannonError};

/// Tenant-scoped session manager: an LRU cache in front of the durable
/// `SessionStore`. spec.md §4.11 "Sessions are tenant-scoped: lookups return
/// NotFound if tenant mismatches" — modeled here as `ShannonError::Internal`
/// with a `"not_found"` marker the caller (an activity) maps to a typed
/// not-found outcome, since `ShannonError` has no dedicated variant for it
/// (spec.md §7's taxonomy has none either; absence of a session is an
/// ordinary `Option::None` at the store level, not a workflow failure).
pub struct SessionManager<S: SessionStore> {
    store: Arc<S>,
    cache: LruCache<String, Session>,
    default_ttl_ms: i64,
    history_limit: usize,
}

impl<S: SessionStore> SessionManager<S> {
    pub fn new(store: Arc<S>, lru_capacity: usize, default_ttl_ms: i64, history_limit: usize) -> Self {
        Self { store, cache: LruCache::new(lru_capacity), default_ttl_ms, history_limit }
    }

    pub fn eviction_count(&self) -> u64 {
        self.cache.eviction_count()
    }

    pub fn cache_size(&self) -> usize {
        self.cache.len()
    }

    /// Fetch a session, enforcing tenant scoping. Returns `Ok(None)` both
    /// when the session does not exist and when it exists but belongs to a
    /// different tenant — callers cannot distinguish the two, by design
    /// (spec.md §8 property 7).
    pub async fn get(&self, session_id: &str, tenant_id: Option<&str>) -> Result<Option<Session>> {
        if let Some(session) = self.cache.get(&session_id.to_string()) {
            return Ok(Self::tenant_filter(session, tenant_id));
        }
        let loaded = self.store.get(session_id).await?;
        if let Some(session) = loaded {
            self.cache.put(session_id.to_string(), session.clone());
            return Ok(Self::tenant_filter(session, tenant_id));
        }
        Ok(None)
    }

    fn tenant_filter(session: Session, tenant_id: Option<&str>) -> Option<Session> {
        if session.visible_to_tenant(tenant_id) {
            Some(session)
        } else {
            None
        }
    }

    /// Fetch-or-create, used by the router's entry activity.
    pub async fn get_or_create(
        &self,
        session_id: &str,
        user_id: &str,
        tenant_id: Option<String>,
        now_ms: i64,
        budget_limit_tokens: u64,
    ) -> Result<Session> {
        if let Some(session) = self.get(session_id, tenant_id.as_deref()).await? {
            return Ok(session);
        }
        let mut session = Session::new(
            session_id,
            user_id,
            tenant_id,
            self.default_ttl_ms,
            now_ms,
            budget_limit_tokens,
        );
        session.history_limit = self.history_limit;
        self.store.put(&session).await?;
        self.cache.put(session_id.to_string(), session.clone());
        Ok(session)
    }

    pub async fn put(&self, session: &Session) -> Result<()> {
        self.store.put(session).await?;
        self.cache.put(session.session_id.clone(), session.clone());
        Ok(())
    }

    pub async fn delete(&self, session_id: &str) -> Result<bool> {
        self.cache.remove(&session_id.to_string());
        Ok(self.store.delete(session_id).await?)
    }

    /// `FetchSessionMemory(sessionID, k)`: recent messages plus a bounded
    /// token budget, spec.md §4.11.
    pub async fn fetch_session_memory(
        &self,
        session_id: &str,
        tenant_id: Option<&str>,
        k: usize,
    ) -> Result<Vec<HistoryMessage>> {
        let session = self
            .get(session_id, tenant_id)
            .await?
            .ok_or_else(|| ShannonError::InvalidInput(format!("unknown session {session_id}")))?;
        let start = session.history.len().saturating_sub(k);
        Ok(session.history[start..].to_vec())
    }

    /// `UpdateSessionResult`: updates totals, history, budget remaining.
    pub async fn update_session_result(
        &self,
        session_id: &str,
        tenant_id: Option<&str>,
        message: HistoryMessage,
        tokens_used: u64,
        cost_usd: f64,
        success: bool,
        now_ms: i64,
    ) -> Result<()> {
        let mut session = self
            .get(session_id, tenant_id)
            .await?
            .ok_or_else(|| ShannonError::InvalidInput(format!("unknown session {session_id}")))?;
        session.push_history(message);
        session.total_tokens_used += tokens_used;
        session.total_cost_usd += cost_usd;
        session.task_count += 1;
        if success {
            session.success_count += 1;
        } else {
            session.failure_count += 1;
        }
        session.last_activity_ms = now_ms;
        session.updated_at_ms = now_ms;
        self.put(&session).await
    }
}
