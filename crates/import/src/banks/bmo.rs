use std::path::Path;

use crate::amount::{self, AmountPolicy};
use crate::row::{Row, RowHeaders};
use till_core::{identity_for, normalize_description, IdentityBasis, SourceTag};

use super::{filename_contains, require, BankAdapter, RowCandidate, RowError};

/// Free-text markers that imply a credit when the type column is absent or
/// unrecognized. Bmo-specific: other adapters get an explicit sign and must
/// not use this heuristic.
const CREDIT_HINTS: &[&str] = &["PAYMENT", "REFUND", "THANK YOU"];

/// BMO export. Amounts are unsigned; the sign comes from the transaction
/// type column (DEBIT/CREDIT), falling back to scanning the type and
/// description text for credit markers. The per-line FI transaction
/// reference is only locally unique, so identity combines it with the row
/// content for safety.
pub struct Bmo;

impl Bmo {
    fn infer_sign(transaction_type: Option<&str>, description: &str) -> i64 {
        if let Some(t) = transaction_type {
            if t.eq_ignore_ascii_case("credit") {
                return 1;
            }
            if t.eq_ignore_ascii_case("debit") {
                return -1;
            }
        }
        let haystack = format!(
            "{} {}",
            transaction_type.unwrap_or_default().to_uppercase(),
            description.to_uppercase()
        );
        if CREDIT_HINTS.iter().any(|hint| haystack.contains(hint)) {
            1
        } else {
            -1
        }
    }
}

impl BankAdapter for Bmo {
    fn source(&self) -> SourceTag {
        SourceTag::Bmo
    }

    fn amount_policy(&self) -> AmountPolicy {
        AmountPolicy::AsIs
    }

    fn recognize(&self, headers: &RowHeaders, path: &Path) -> bool {
        if headers.contains_all(&["transaction type", "transaction reference"]) {
            return true;
        }
        headers.contains("transaction amount") && filename_contains(path, "bmo")
    }

    fn parse_row(&self, row: &Row) -> Result<RowCandidate, RowError> {
        let date = amount::parse_date(require(
            row,
            &["transaction date", "date posted", "date"],
            "transaction date",
        )?)?;
        let description = require(row, &["description"], "description")?.to_string();
        let unsigned =
            amount::parse_amount(require(row, &["transaction amount", "amount"], "amount")?)?;
        let transaction_type = row.first(&["transaction type"]);
        let amount_cents = Self::infer_sign(transaction_type, &description) * unsigned.abs();
        let reference = require(
            row,
            &["transaction reference", "fi reference", "reference"],
            "transaction reference",
        )?;

        let normalized = normalize_description(&description);
        Ok(RowCandidate {
            posted_date: date,
            description,
            amount_cents,
            category: None,
            memo: None,
            identity: identity_for(IdentityBasis::ReferenceAndContent {
                reference,
                date,
                amount_cents,
                normalized_description: &normalized,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::RowReader;

    const EXPORT: &str = "\
Transaction Date,Transaction Type,Transaction Reference,Transaction Amount,Description
2025-03-14,DEBIT,FI20250314001,45.10,GROCER MART #212 TORONTO
2025-03-15,CREDIT,FI20250315002,250.00,TRANSFER IN
2025-03-16,,FI20250316003,120.00,PAYMENT RECEIVED - THANK YOU
2025-03-17,,FI20250317004,18.75,COFFEE ROASTERY
";

    fn rows() -> Vec<Row> {
        RowReader::from_bytes(EXPORT.as_bytes().to_vec())
            .unwrap()
            .collect()
    }

    #[test]
    fn recognizes_by_header_signature() {
        let reader = RowReader::from_bytes(EXPORT.as_bytes().to_vec()).unwrap();
        assert!(Bmo.recognize(reader.headers(), Path::new("export.csv")));
    }

    #[test]
    fn explicit_type_column_wins() {
        let rows = rows();
        assert_eq!(Bmo.parse_row(&rows[0]).unwrap().amount_cents, -4510);
        assert_eq!(Bmo.parse_row(&rows[1]).unwrap().amount_cents, 25_000);
    }

    #[test]
    fn credit_hint_in_description_implies_credit() {
        let candidate = Bmo.parse_row(&rows()[2]).unwrap();
        assert_eq!(candidate.amount_cents, 12_000);
    }

    #[test]
    fn no_hint_defaults_to_debit() {
        let candidate = Bmo.parse_row(&rows()[3]).unwrap();
        assert_eq!(candidate.amount_cents, -1875);
    }

    #[test]
    fn identity_combines_reference_with_content() {
        let candidate = Bmo.parse_row(&rows()[0]).unwrap();
        let expected = identity_for(IdentityBasis::ReferenceAndContent {
            reference: "FI20250314001",
            date: chrono::NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(),
            amount_cents: -4510,
            normalized_description: &normalize_description("GROCER MART #212 TORONTO"),
        });
        assert_eq!(candidate.identity, expected);
    }

    #[test]
    fn missing_reference_fails_the_row() {
        let mut reader = RowReader::from_bytes(
            b"Transaction Date,Transaction Type,Transaction Reference,Transaction Amount,Description\n2025-03-14,DEBIT,,45.10,GROCER\n".to_vec(),
        )
        .unwrap();
        let row = reader.next().unwrap();
        assert_eq!(
            Bmo.parse_row(&row),
            Err(RowError::MissingField("transaction reference"))
        );
    }
}
