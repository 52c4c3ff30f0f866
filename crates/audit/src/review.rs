use chrono::{NaiveDate, Utc};
use std::collections::HashSet;
use std::sync::atomic::AtomicBool;

use crate::engine::{
    scan, AuditConfig, AuditError, AuditTransaction, BoxError, DuplicateCandidate, PairKey,
};

/// The narrow persistence contract the audit engine consumes: one bulk read
/// of the lookback window, the ignore-list, and the two write paths a
/// reviewer's decision can take.
#[allow(async_fn_in_trait)]
pub trait AuditStore {
    async fn transactions_since(
        &self,
        account_id: Option<i64>,
        since: NaiveDate,
    ) -> Result<Vec<AuditTransaction>, BoxError>;

    async fn ignored_pairs(&self) -> Result<HashSet<PairKey>, BoxError>;

    async fn record_ignored_pair(&self, pair: PairKey, reason: &str) -> Result<(), BoxError>;

    async fn soft_delete(&self, tx_id: i64) -> Result<(), BoxError>;
}

/// The reviewer's verdict on one surfaced candidate. There is no automatic
/// resolution: an unresolved pair is simply re-surfaced on the next scan.
#[derive(Debug, Clone)]
pub enum Decision {
    /// Confirmed not a duplicate; the pair is suppressed from future scans
    /// forever.
    NotADuplicate { reason: String },
    /// The second transaction is the duplicate; soft-delete it.
    KeepFirst,
    /// The first transaction is the duplicate; soft-delete it.
    KeepSecond,
}

/// Loads the lookback window and the ignore-list, then runs the pure scan.
/// Any storage failure aborts the audit; partial results are never returned.
pub async fn run_audit<S: AuditStore>(
    store: &S,
    account_id: Option<i64>,
    config: &AuditConfig,
    cancel: &AtomicBool,
) -> Result<Vec<DuplicateCandidate>, AuditError> {
    let since = Utc::now().date_naive() - chrono::Days::new(u64::from(config.lookback_days));
    let transactions = store
        .transactions_since(account_id, since)
        .await
        .map_err(AuditError::Store)?;
    let ignored = store.ignored_pairs().await.map_err(AuditError::Store)?;
    scan(&transactions, &ignored, config, cancel)
}

/// Applies a reviewer decision to a surfaced candidate.
pub async fn resolve<S: AuditStore>(
    store: &S,
    candidate: &DuplicateCandidate,
    decision: Decision,
) -> Result<(), AuditError> {
    match decision {
        Decision::NotADuplicate { reason } => store
            .record_ignored_pair(candidate.pair_key(), &reason)
            .await
            .map_err(AuditError::Store),
        Decision::KeepFirst => store
            .soft_delete(candidate.second.id)
            .await
            .map_err(AuditError::Store),
        Decision::KeepSecond => store
            .soft_delete(candidate.first.id)
            .await
            .map_err(AuditError::Store),
    }
}
