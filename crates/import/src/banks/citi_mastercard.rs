use std::path::Path;

use crate::amount::{self, AmountPolicy};
use crate::row::{Row, RowHeaders};
use till_core::{identity_for, normalize_description, IdentityBasis, SourceTag};

use super::{filename_contains, require, BankAdapter, RowCandidate, RowError};

/// Citi MasterCard export: the amount is split into separate debit and
/// credit columns, exactly one of which is populated per row. No reference
/// number is exported, so identity is content-only; two genuinely identical
/// same-day charges collide by design.
pub struct CitiMastercard;

impl BankAdapter for CitiMastercard {
    fn source(&self) -> SourceTag {
        SourceTag::CitiMastercard
    }

    fn amount_policy(&self) -> AmountPolicy {
        AmountPolicy::DebitCredit
    }

    fn recognize(&self, headers: &RowHeaders, path: &Path) -> bool {
        if headers.contains_all(&["status", "debit", "credit"]) {
            return true;
        }
        headers.contains_all(&["debit", "credit"]) && filename_contains(path, "citi")
    }

    fn parse_row(&self, row: &Row) -> Result<RowCandidate, RowError> {
        let date = amount::parse_date(require(row, &["date", "transaction date"], "date")?)?;
        let description = require(row, &["description"], "description")?.to_string();
        let debit = row.first(&["debit"]).map(amount::parse_amount).transpose()?;
        let credit = row
            .first(&["credit"])
            .map(amount::parse_amount)
            .transpose()?;
        let amount_cents = amount::from_debit_credit(debit, credit)?;

        let normalized = normalize_description(&description);
        Ok(RowCandidate {
            posted_date: date,
            description,
            amount_cents,
            category: None,
            memo: None,
            identity: identity_for(IdentityBasis::Content {
                date,
                amount_cents,
                normalized_description: &normalized,
            }),
        })
    }
}
