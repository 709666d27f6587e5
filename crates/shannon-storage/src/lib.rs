//! Shannon Storage - redb-backed persistence layer.
//!
//! Byte-level `SimpleStorage` tables wrapped in typed accessors, aggregated
//! behind one `Storage` manager that owns the single `redb::Database` handle.

mod budget;
mod execution;
mod pattern;
mod session;
mod simple_storage;

pub use budget::BudgetStorage;
pub use execution::ExecutionStorage;
pub use pattern::PatternStorage;
pub use session::SessionStorage;
pub use simple_storage::SimpleStorage;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use redb::Database;

/// Central storage manager that initializes all storage subsystems.
pub struct Storage {
    pub sessions: SessionStorage,
    pub budgets: BudgetStorage,
    pub patterns: PatternStorage,
    pub executions: ExecutionStorage,
}

impl Storage {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = Arc::new(Database::create(path)?);
        Self::from_db(db)
    }

    /// In-memory-backed instance for tests (still an on-disk redb file
    /// under a tempdir — redb has no pure in-memory backend).
    #[cfg(any(test, feature = "test-utils"))]
    pub fn open_temp() -> Result<(Self, tempfile::TempDir)> {
        let dir = tempfile::tempdir()?;
        let storage = Self::open(dir.path().join("shannon.redb"))?;
        Ok((storage, dir))
    }

    fn from_db(db: Arc<Database>) -> Result<Self> {
        Ok(Self {
            sessions: SessionStorage::new(db.clone())?,
            budgets: BudgetStorage::new(db.clone())?,
            patterns: PatternStorage::new(db.clone())?,
            executions: ExecutionStorage::new(db)?,
        })
    }
}
