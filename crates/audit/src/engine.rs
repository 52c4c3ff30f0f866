use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

use till_core::normalize_description;

use crate::similarity::jaccard;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Audit scan cancelled")]
    Cancelled,
    #[error("Storage error: {0}")]
    Store(#[source] BoxError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuditConfig {
    /// Trailing days of history to scan.
    pub lookback_days: u32,
    /// Maximum date gap, in days, for a near-duplicate pair.
    pub near_window_days: i64,
    /// Minimum Jaccard score for a near-duplicate pair.
    pub similarity_threshold: f64,
    /// Hard cap on reported candidates, applied eagerly during the scan to
    /// bound audit time on large histories.
    pub max_candidates: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            lookback_days: 180,
            near_window_days: 3,
            similarity_threshold: 0.78,
            max_candidates: 200,
        }
    }
}

/// One persisted transaction as read back for auditing, joined to its
/// account name for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditTransaction {
    pub id: i64,
    pub account_id: i64,
    pub account_name: String,
    pub date: NaiveDate,
    pub amount_cents: i64,
    pub description: String,
    pub identity: String,
}

/// Order-independent key for a pair of transaction ids; either ordering of
/// the same pair produces the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PairKey(pub i64, pub i64);

impl PairKey {
    pub fn new(a: i64, b: i64) -> Self {
        PairKey(a.min(b), a.max(b))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CandidateKind {
    Exact,
    Near,
}

/// A transient audit finding; never persisted except through the reviewer's
/// decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateCandidate {
    pub first: AuditTransaction,
    pub second: AuditTransaction,
    pub kind: CandidateKind,
    pub score: f64,
    pub reason: String,
}

impl DuplicateCandidate {
    pub fn pair_key(&self) -> PairKey {
        PairKey::new(self.first.id, self.second.id)
    }
}

/// Read-only duplicate scan over a bulk-loaded window of transactions.
///
/// Two passes: an exact pass over identity groups and a near pass over
/// `(account, amount)` buckets. Takes no locks; `cancel` is checked between
/// outer-loop iterations so a long scan can be abandoned cooperatively.
/// On cancellation no partial results are returned.
pub fn scan(
    transactions: &[AuditTransaction],
    ignored: &HashSet<PairKey>,
    config: &AuditConfig,
    cancel: &AtomicBool,
) -> Result<Vec<DuplicateCandidate>, AuditError> {
    let mut candidates = Vec::new();

    exact_pass(transactions, ignored, config, cancel, &mut candidates)?;
    if candidates.len() < config.max_candidates {
        near_pass(transactions, ignored, config, cancel, &mut candidates)?;
    }

    // Exact before Near, then strongest first; ids break ties so the report
    // order is deterministic.
    candidates.sort_by(|x, y| {
        x.kind
            .cmp(&y.kind)
            .then(y.score.partial_cmp(&x.score).unwrap_or(std::cmp::Ordering::Equal))
            .then(x.first.id.cmp(&y.first.id))
            .then(x.second.id.cmp(&y.second.id))
    });

    tracing::info!(
        "audit scan over {} transactions found {} candidates",
        transactions.len(),
        candidates.len()
    );
    Ok(candidates)
}

/// Groups by `(account, identity)` and emits adjacent pairs only: a group of
/// k members yields k-1 candidates, not k*(k-1)/2, avoiding result explosion
/// when an identity collision has many members.
fn exact_pass(
    transactions: &[AuditTransaction],
    ignored: &HashSet<PairKey>,
    config: &AuditConfig,
    cancel: &AtomicBool,
    out: &mut Vec<DuplicateCandidate>,
) -> Result<(), AuditError> {
    let mut groups: HashMap<(i64, &str), Vec<usize>> = HashMap::new();
    for (idx, tx) in transactions.iter().enumerate() {
        groups
            .entry((tx.account_id, tx.identity.as_str()))
            .or_default()
            .push(idx);
    }

    let mut keyed: Vec<_> = groups.into_iter().collect();
    keyed.sort_by(|a, b| a.0.cmp(&b.0));

    for (_, mut members) in keyed {
        if cancel.load(Ordering::Relaxed) {
            return Err(AuditError::Cancelled);
        }
        if members.len() < 2 {
            continue;
        }
        members.sort_by_key(|&i| (transactions[i].date, transactions[i].id));
        for window in members.windows(2) {
            let (a, b) = (&transactions[window[0]], &transactions[window[1]]);
            if ignored.contains(&PairKey::new(a.id, b.id)) {
                continue;
            }
            out.push(DuplicateCandidate {
                first: a.clone(),
                second: b.clone(),
                kind: CandidateKind::Exact,
                score: 1.0,
                reason: "identical import identity".to_string(),
            });
            if out.len() >= config.max_candidates {
                return Ok(());
            }
        }
    }
    Ok(())
}

/// Buckets by `(account, amount)` — amount equality is mandatory, not fuzzy —
/// and scans each date-sorted bucket forward. The early break on the date
/// window is an optimization that depends on the bucket staying date-sorted.
fn near_pass(
    transactions: &[AuditTransaction],
    ignored: &HashSet<PairKey>,
    config: &AuditConfig,
    cancel: &AtomicBool,
    out: &mut Vec<DuplicateCandidate>,
) -> Result<(), AuditError> {
    let normalized: Vec<String> = transactions
        .iter()
        .map(|tx| normalize_description(&tx.description))
        .collect();

    let mut buckets: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
    for (idx, tx) in transactions.iter().enumerate() {
        buckets
            .entry((tx.account_id, tx.amount_cents))
            .or_default()
            .push(idx);
    }

    let mut keyed: Vec<_> = buckets.into_iter().collect();
    keyed.sort_by(|a, b| a.0.cmp(&b.0));

    for (_, mut members) in keyed {
        if cancel.load(Ordering::Relaxed) {
            return Err(AuditError::Cancelled);
        }
        if members.len() < 2 {
            continue;
        }
        members.sort_by_key(|&i| (transactions[i].date, transactions[i].id));

        for (pos, &i) in members.iter().enumerate() {
            let a = &transactions[i];
            for &j in &members[pos + 1..] {
                let b = &transactions[j];
                let gap = (b.date - a.date).num_days();
                if gap > config.near_window_days {
                    break;
                }
                if a.identity == b.identity {
                    // Already reported by the exact pass.
                    continue;
                }
                if ignored.contains(&PairKey::new(a.id, b.id)) {
                    continue;
                }
                let score = jaccard(&normalized[i], &normalized[j]);
                if score < config.similarity_threshold {
                    continue;
                }
                out.push(DuplicateCandidate {
                    first: a.clone(),
                    second: b.clone(),
                    kind: CandidateKind::Near,
                    score,
                    reason: format!(
                        "same amount, {gap} day(s) apart, {:.0}% description overlap",
                        score * 100.0
                    ),
                });
                if out.len() >= config.max_candidates {
                    return Ok(());
                }
            }
        }
    }
    Ok(())
}
