use std::path::Path;

use crate::amount::{self, AmountPolicy};
use crate::row::{Row, RowHeaders};
use till_core::{identity_for, IdentityBasis, SourceTag};

use super::{filename_contains, require, BankAdapter, RowCandidate, RowError};

/// American Express card export. Charges are exported positive and payments
/// negative, the opposite of the canonical convention, so the amount is
/// inverted. Every row carries a genuine external reference number, the
/// strongest identity available: the reference is hashed alone and
/// description/amount are ignored entirely.
pub struct Amex;

impl BankAdapter for Amex {
    fn source(&self) -> SourceTag {
        SourceTag::Amex
    }

    fn amount_policy(&self) -> AmountPolicy {
        AmountPolicy::Invert
    }

    fn recognize(&self, headers: &RowHeaders, path: &Path) -> bool {
        if headers.contains_all(&["card member", "reference"]) {
            return true;
        }
        // Last resort for exports with the reference column renamed.
        headers.contains("amount") && filename_contains(path, "amex")
    }

    fn parse_row(&self, row: &Row) -> Result<RowCandidate, RowError> {
        let date = amount::parse_date(require(row, &["date", "transaction date"], "date")?)?;
        let description = require(row, &["description"], "description")?.to_string();
        let raw_amount = amount::parse_amount(require(row, &["amount"], "amount")?)?;
        let reference = require(row, &["reference", "reference number"], "reference")?;
        // Amex wraps references in tick marks, e.g. '320251234567890'.
        let reference = reference.trim_matches(|c| c == '\'' || c == '"');

        Ok(RowCandidate {
            posted_date: date,
            description,
            amount_cents: amount::apply_policy(self.amount_policy(), raw_amount),
            category: None,
            memo: row.first(&["card member"]).map(str::to_string),
            identity: identity_for(IdentityBasis::Reference(reference)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::RowReader;

    const EXPORT: &str = "\
Date,Description,Card Member,Account #,Amount,Reference
03/14/2025,AMAZON.COM*AB12CD3 SEATTLE WA,JANE DOE,-71002,49.99,'320250730123456789'
03/15/2025,PAYMENT RECEIVED - THANK YOU,JANE DOE,-71002,-250.00,'320250730987654321'
";

    fn rows() -> Vec<Row> {
        RowReader::from_bytes(EXPORT.as_bytes().to_vec())
            .unwrap()
            .collect()
    }

    #[test]
    fn recognizes_by_header_signature() {
        let reader = RowReader::from_bytes(EXPORT.as_bytes().to_vec()).unwrap();
        assert!(Amex.recognize(reader.headers(), Path::new("activity.csv")));
    }

    #[test]
    fn filename_fallback_requires_amount_column() {
        let reader =
            RowReader::from_bytes(b"Date,Description,Amount\n".to_vec()).unwrap();
        assert!(Amex.recognize(reader.headers(), Path::new("amex-2025.csv")));
        assert!(!Amex.recognize(reader.headers(), Path::new("statement.csv")));
    }

    #[test]
    fn charge_becomes_negative() {
        let candidate = Amex.parse_row(&rows()[0]).unwrap();
        assert_eq!(candidate.amount_cents, -4999);
        assert_eq!(candidate.memo.as_deref(), Some("JANE DOE"));
    }

    #[test]
    fn payment_becomes_positive() {
        let candidate = Amex.parse_row(&rows()[1]).unwrap();
        assert_eq!(candidate.amount_cents, 25_000);
    }

    #[test]
    fn identity_depends_only_on_reference() {
        let candidate = Amex.parse_row(&rows()[0]).unwrap();
        assert_eq!(
            candidate.identity,
            identity_for(IdentityBasis::Reference("320250730123456789"))
        );
    }

    #[test]
    fn missing_reference_fails_the_row() {
        let mut reader = RowReader::from_bytes(
            b"Date,Description,Card Member,Amount,Reference\n03/14/2025,COFFEE,JANE DOE,4.50,\n"
                .to_vec(),
        )
        .unwrap();
        let row = reader.next().unwrap();
        assert_eq!(
            Amex.parse_row(&row),
            Err(RowError::MissingField("reference"))
        );
    }
}
