use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::account::AccountId;

/// Which bank export a transaction came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceTag {
    Amex,
    Bmo,
    ChaseVisa,
    CitiMastercard,
}

impl SourceTag {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceTag::Amex => "amex",
            SourceTag::Bmo => "bmo",
            SourceTag::ChaseVisa => "chase-visa",
            SourceTag::CitiMastercard => "citi-mastercard",
        }
    }
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "amex" => Ok(SourceTag::Amex),
            "bmo" => Ok(SourceTag::Bmo),
            "chase-visa" => Ok(SourceTag::ChaseVisa),
            "citi-mastercard" => Ok(SourceTag::CitiMastercard),
            other => Err(format!("Unknown source tag: '{other}'")),
        }
    }
}

/// A fully normalized transaction ready for idempotent insertion.
///
/// Invariant: `amount_cents` already follows the canonical sign convention
/// (expenses negative, credits positive) regardless of how the source bank
/// signs its exports. `(account_id, identity)` is the sole dedup key at the
/// storage boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTransaction {
    pub account_id: AccountId,
    pub posted_date: NaiveDate,
    pub description: String,
    pub amount_cents: i64,
    /// Legacy free-text category carried through from exports that have one.
    pub category: Option<String>,
    pub category_id: Option<i64>,
    pub memo: Option<String>,
    pub identity: String,
    pub source: SourceTag,
    pub created_at: DateTime<Utc>,
}

/// Per-file ingestion counters, returned once per import call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportResult {
    pub inserted: u32,
    /// Rows rejected by the storage unique key: the identity already exists.
    /// This is the idempotence mechanism at work, not a failure.
    pub ignored: u32,
    pub failed: u32,
}

impl ImportResult {
    pub fn total_rows(&self) -> u32 {
        self.inserted + self.ignored + self.failed
    }
}

impl fmt::Display for ImportResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} inserted, {} ignored as duplicate, {} failed",
            self.inserted, self.ignored, self.failed
        )
    }
}
