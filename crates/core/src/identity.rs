use chrono::NaiveDate;
use sha2::{Digest, Sha256};

/// What goes into a transaction's stable identity. The choice is deliberate
/// per bank, graded by the quality of the data the bank exports:
///
/// - `Reference`: the bank issues a genuine external reference number; hash
///   it alone and ignore description/amount entirely.
/// - `ReferenceAndContent`: the reference is only locally unique, so it is
///   combined with the row content for safety.
/// - `Content`: no reference at all; best effort. Two genuinely identical
///   same-day charges collide and merge on re-import — intentional, since
///   changing it would alter observed import counts.
#[derive(Debug, Clone, Copy)]
pub enum IdentityBasis<'a> {
    Reference(&'a str),
    ReferenceAndContent {
        reference: &'a str,
        date: NaiveDate,
        amount_cents: i64,
        normalized_description: &'a str,
    },
    Content {
        date: NaiveDate,
        amount_cents: i64,
        normalized_description: &'a str,
    },
}

/// Renders the basis into a canonical payload and hashes it. The payload is
/// field-tagged and `|`-delimited so distinct bases can never collide by
/// concatenation, and the description must already be normalized so the hash
/// is independent of source column order and casing.
pub fn identity_for(basis: IdentityBasis<'_>) -> String {
    let payload = match basis {
        IdentityBasis::Reference(reference) => format!("ref:{}", reference.trim()),
        IdentityBasis::ReferenceAndContent {
            reference,
            date,
            amount_cents,
            normalized_description,
        } => format!(
            "ref:{}|date:{}|amt:{}|desc:{}",
            reference.trim(),
            date.format("%Y-%m-%d"),
            amount_cents,
            normalized_description
        ),
        IdentityBasis::Content {
            date,
            amount_cents,
            normalized_description,
        } => format!(
            "date:{}|amt:{}|desc:{}",
            date.format("%Y-%m-%d"),
            amount_cents,
            normalized_description
        ),
    };

    let mut hasher = Sha256::new();
    hasher.update(payload.as_bytes());
    let digest: [u8; 32] = hasher.finalize().into();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}
