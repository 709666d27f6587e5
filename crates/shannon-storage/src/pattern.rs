use anyhow::Result;
use async_trait::async_trait;

use crate::{SimpleStorage, define_simple_storage};
use shannon_models::{PatternRecord, Strategy};
use shannon_traits::PatternStore;

define_simple_storage! {
    /// Append-only pattern record storage feeding the learning router,
    /// spec.md §3 "Pattern Record" / §4.8.
    pub struct PatternStorage { table: "pattern_records" }
}

impl PatternStorage {
    fn next_key(&self) -> Result<String> {
        // Monotonic key so `list_raw` returns records in insertion order;
        // a real relational store (spec.md §6) would use an auto-increment
        // column, this mirrors that with a zero-padded counter.
        let count = self.count()?;
        Ok(format!("{count:020}"))
    }
}

#[async_trait]
impl PatternStore for PatternStorage {
    async fn append(&self, record: PatternRecord) -> Result<()> {
        let key = self.next_key()?;
        let bytes = bincode::serde::encode_to_vec(&record, bincode::config::standard())?;
        self.put_raw(&key, &bytes)
    }

    async fn recent_for_strategy(&self, strategy: Strategy, limit: usize) -> Result<Vec<PatternRecord>> {
        let all = self.all_recent(usize::MAX).await?;
        Ok(all
            .into_iter()
            .filter(|r| r.strategy == strategy)
            .rev()
            .take(limit)
            .collect())
    }

    async fn all_recent(&self, limit: usize) -> Result<Vec<PatternRecord>> {
        let mut rows = self.list_raw()?;
        rows.sort_by(|a, b| a.0.cmp(&b.0));
        let mut records: Vec<PatternRecord> = Vec::with_capacity(rows.len());
        for (_, bytes) in rows {
            let (record, _): (PatternRecord, usize) =
                bincode::serde::decode_from_slice(&bytes, bincode::config::standard())?;
            records.push(record);
        }
        if records.len() > limit {
            let skip = records.len() - limit;
            records.drain(0..skip);
        }
        Ok(records)
    }
}
