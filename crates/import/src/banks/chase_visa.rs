use std::path::Path;

use crate::amount::{self, AmountPolicy};
use crate::row::{Row, RowHeaders};
use till_core::{identity_for, normalize_description, IdentityBasis, SourceTag};

use super::{filename_contains, require, BankAdapter, RowCandidate, RowError};

/// Chase Visa export. Amounts are already canonically signed (purchases
/// negative, payments positive). There is no reference number, so identity
/// is content-only.
///
/// The export carries two dates: the transaction date and a post date that
/// shifts when the same statement is re-downloaded between its pending and
/// final states. Identity is keyed on the stable transaction date only, and
/// that date is stored as the record's canonical date too, so pending/posted
/// re-imports never produce duplicates.
pub struct ChaseVisa;

impl BankAdapter for ChaseVisa {
    fn source(&self) -> SourceTag {
        SourceTag::ChaseVisa
    }

    fn amount_policy(&self) -> AmountPolicy {
        AmountPolicy::AsIs
    }

    fn recognize(&self, headers: &RowHeaders, path: &Path) -> bool {
        if headers.contains_all(&["transaction date", "post date", "amount"]) {
            return true;
        }
        headers.contains("amount") && filename_contains(path, "chase")
    }

    fn parse_row(&self, row: &Row) -> Result<RowCandidate, RowError> {
        let date = amount::parse_date(require(row, &["transaction date"], "transaction date")?)?;
        let description = require(row, &["description"], "description")?.to_string();
        let amount_cents = amount::parse_amount(require(row, &["amount"], "amount")?)?;

        let normalized = normalize_description(&description);
        Ok(RowCandidate {
            posted_date: date,
            description,
            amount_cents,
            category: row.first(&["category"]).map(str::to_string),
            memo: row.first(&["memo"]).map(str::to_string),
            identity: identity_for(IdentityBasis::Content {
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
Transaction Date,Post Date,Description,Category,Type,Amount,Memo
03/14/2025,03/16/2025,AMAZON.COM*AB12CD3 123456789 SEATTLE WA,Shopping,Sale,-49.99,
03/15/2025,03/17/2025,Payment Thank You - Web,,Payment,250.00,
";

    fn rows() -> Vec<Row> {
        RowReader::from_bytes(EXPORT.as_bytes().to_vec())
            .unwrap()
            .collect()
    }

    #[test]
    fn recognizes_by_header_signature() {
        let reader = RowReader::from_bytes(EXPORT.as_bytes().to_vec()).unwrap();
        assert!(ChaseVisa.recognize(reader.headers(), Path::new("export.csv")));
    }

    #[test]
    fn amount_is_taken_as_is() {
        let rows = rows();
        assert_eq!(ChaseVisa.parse_row(&rows[0]).unwrap().amount_cents, -4999);
        assert_eq!(ChaseVisa.parse_row(&rows[1]).unwrap().amount_cents, 25_000);
    }

    #[test]
    fn legacy_category_text_is_carried() {
        let candidate = ChaseVisa.parse_row(&rows()[0]).unwrap();
        assert_eq!(candidate.category.as_deref(), Some("Shopping"));
    }

    #[test]
    fn identity_ignores_the_volatile_post_date() {
        // Same transaction re-downloaded after posting: only the post date
        // moved, so the identity must not change.
        let pending = "Transaction Date,Post Date,Description,Category,Type,Amount,Memo\n\
                       03/14/2025,03/15/2025,AMAZON.COM*AB12CD3 SEATTLE WA,Shopping,Sale,-49.99,\n";
        let posted = "Transaction Date,Post Date,Description,Category,Type,Amount,Memo\n\
                      03/14/2025,03/18/2025,AMAZON.COM*AB12CD3 SEATTLE WA,Shopping,Sale,-49.99,\n";
        let parse = |data: &str| {
            let mut reader = RowReader::from_bytes(data.as_bytes().to_vec()).unwrap();
            ChaseVisa.parse_row(&reader.next().unwrap()).unwrap()
        };
        let a = parse(pending);
        let b = parse(posted);
        assert_eq!(a.identity, b.identity);
        // The stable transaction date is also the canonical stored date.
        assert_eq!(
            a.posted_date,
            chrono::NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()
        );
    }

    #[test]
    fn identity_is_stable_across_column_order_and_casing() {
        let reordered = "AMOUNT,DESCRIPTION,POST DATE,TRANSACTION DATE\n\
                         -49.99,AMAZON.COM*AB12CD3 123456789 SEATTLE WA,03/16/2025,03/14/2025\n";
        let mut reader = RowReader::from_bytes(reordered.as_bytes().to_vec()).unwrap();
        let candidate = ChaseVisa.parse_row(&reader.next().unwrap()).unwrap();
        assert_eq!(candidate.identity, ChaseVisa.parse_row(&rows()[0]).unwrap().identity);
    }

    #[test]
    fn unparseable_date_fails_the_row() {
        let mut reader = RowReader::from_bytes(
            b"Transaction Date,Post Date,Description,Amount\nsoon,03/16/2025,COFFEE,-4.50\n"
                .to_vec(),
        )
        .unwrap();
        let row = reader.next().unwrap();
        assert!(matches!(
            ChaseVisa.parse_row(&row),
            Err(RowError::Amount(amount::AmountError::InvalidDate(_)))
        ));
    }
}
