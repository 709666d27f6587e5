use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use redb::Database;

use crate::{SimpleStorage, define_simple_storage};
use shannon_models::Session;
use shannon_traits::SessionStore;

define_simple_storage! {
    /// Session storage, keyed by `session:{id}` per spec.md §6 "Persisted
    /// state".
    pub struct SessionStorage { table: "sessions" }
}

impl SessionStorage {
    fn key(session_id: &str) -> String {
        format!("session:{session_id}")
    }
}

#[async_trait]
impl SessionStore for SessionStorage {
    async fn get(&self, session_id: &str) -> Result<Option<Session>> {
        let key = Self::key(session_id);
        match self.get_raw(&key)? {
            Some(bytes) => {
                let (session, _): (Session, usize) =
                    bincode::serde::decode_from_slice(&bytes, bincode::config::standard())?;
                Ok(Some(session))
            }
            None => Ok(None),
        }
    }

    async fn put(&self, session: &Session) -> Result<()> {
        let key = Self::key(&session.session_id);
        let bytes = bincode::serde::encode_to_vec(session, bincode::config::standard())?;
        self.put_raw(&key, &bytes)
    }

    async fn delete(&self, session_id: &str) -> Result<bool> {
        SimpleStorage::delete(self, &Self::key(session_id))
    }
}

/// Construct an in-memory-backed session store for tests.
pub fn open(db: Arc<Database>) -> Result<SessionStorage> {
    SessionStorage::new(db)
}
