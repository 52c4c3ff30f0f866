use chrono::NaiveDate;
use std::path::Path;
use thiserror::Error;

use crate::amount::{AmountError, AmountPolicy};
use crate::row::{Row, RowHeaders};
use till_core::SourceTag;

mod amex;
mod bmo;
mod chase_visa;
mod citi_mastercard;

pub use amex::Amex;
pub use bmo::Bmo;
pub use chase_visa::ChaseVisa;
pub use citi_mastercard::CitiMastercard;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RowError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
    #[error(transparent)]
    Amount(#[from] AmountError),
}

/// What an adapter extracts from one row: already normalized for sign,
/// with the identity built according to that bank's strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowCandidate {
    pub posted_date: NaiveDate,
    pub description: String,
    pub amount_cents: i64,
    pub category: Option<String>,
    pub memo: Option<String>,
    pub identity: String,
}

/// One implementation per source institution. Adapters own field extraction
/// (tolerant name-aliasing), sign normalization, and identity construction;
/// the pipeline owns everything downstream of the candidate.
pub trait BankAdapter: Send + Sync {
    fn source(&self) -> SourceTag;

    fn amount_policy(&self) -> AmountPolicy;

    /// Header-signature check first; filename heuristics only as a last
    /// resort for ambiguous exports.
    fn recognize(&self, headers: &RowHeaders, path: &Path) -> bool;

    fn parse_row(&self, row: &Row) -> Result<RowCandidate, RowError>;
}

/// Registration order matters: the pipeline takes the first adapter that
/// recognizes a file, so more specific signatures come first.
pub fn default_adapters() -> Vec<Box<dyn BankAdapter>> {
    vec![
        Box::new(CitiMastercard),
        Box::new(Amex),
        Box::new(ChaseVisa),
        Box::new(Bmo),
    ]
}

pub(crate) fn require<'a>(
    row: &'a Row,
    names: &[&str],
    field: &'static str,
) -> Result<&'a str, RowError> {
    row.first(names).ok_or(RowError::MissingField(field))
}

pub(crate) fn filename_contains(path: &Path, needle: &str) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.to_ascii_lowercase().contains(needle))
        .unwrap_or(false)
}
