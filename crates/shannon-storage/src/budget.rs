use anyhow::Result;
use async_trait::async_trait;

use crate::{SimpleStorage, define_simple_storage};
use shannon_models::BudgetLedger;
use shannon_traits::BudgetStore;

define_simple_storage! {
    /// Budget ledger storage, spec.md §3 "Budget Ledger": monotonic
    /// per-session counters.
    pub struct BudgetStorage { table: "budget_ledgers" }
}

#[async_trait]
impl BudgetStore for BudgetStorage {
    async fn get(&self, session_id: &str) -> Result<Option<BudgetLedger>> {
        match self.get_raw(session_id)? {
            Some(bytes) => {
                let (ledger, _): (BudgetLedger, usize) =
                    bincode::serde::decode_from_slice(&bytes, bincode::config::standard())?;
                Ok(Some(ledger))
            }
            None => Ok(None),
        }
    }

    async fn put(&self, ledger: &BudgetLedger) -> Result<()> {
        let bytes = bincode::serde::encode_to_vec(ledger, bincode::config::standard())?;
        self.put_raw(&ledger.session_id, &bytes)
    }
}
