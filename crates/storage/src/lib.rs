pub mod db;

use chrono::NaiveDate;
use std::collections::HashSet;

use till_audit::{AuditStore, AuditTransaction, PairKey};
use till_core::{AccountId, NewTransaction};
use till_import::{BoxError, TransactionStore};

pub use db::{
    account_exists, create_db, create_memory_db, get_account, get_transaction_source,
    ignored_pairs, insert_account, insert_if_absent, is_pair_ignored, record_ignored_pair,
    soft_delete_transaction, transactions_since, DbPool,
};

/// SQLite-backed implementation of the import and audit collaborator
/// contracts. Cloning shares the underlying pool.
#[derive(Clone)]
pub struct Store {
    pool: DbPool,
}

impl Store {
    pub fn new(pool: DbPool) -> Self {
        Store { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

impl TransactionStore for Store {
    async fn account_exists(&self, account_id: AccountId) -> Result<bool, BoxError> {
        Ok(db::account_exists(&self.pool, account_id).await?)
    }

    async fn insert_if_absent(&self, tx: &NewTransaction) -> Result<bool, BoxError> {
        Ok(db::insert_if_absent(&self.pool, tx).await?)
    }
}

impl AuditStore for Store {
    async fn transactions_since(
        &self,
        account_id: Option<i64>,
        since: NaiveDate,
    ) -> Result<Vec<AuditTransaction>, BoxError> {
        Ok(db::transactions_since(&self.pool, account_id, since).await?)
    }

    async fn ignored_pairs(&self) -> Result<HashSet<PairKey>, BoxError> {
        Ok(db::ignored_pairs(&self.pool).await?)
    }

    async fn record_ignored_pair(&self, pair: PairKey, reason: &str) -> Result<(), BoxError> {
        Ok(db::record_ignored_pair(&self.pool, pair, reason).await?)
    }

    async fn soft_delete(&self, tx_id: i64) -> Result<(), BoxError> {
        Ok(db::soft_delete_transaction(&self.pool, tx_id).await?)
    }
}
