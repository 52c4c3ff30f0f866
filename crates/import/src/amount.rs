use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid date: {0}")]
    InvalidDate(String),
    #[error("Debit/credit columns must have exactly one non-zero value")]
    AmbiguousDebitCredit,
}

/// How a bank's export signs its amounts, relative to the canonical
/// convention (expenses negative, credits positive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountPolicy {
    /// Export already follows the canonical convention.
    AsIs,
    /// Export uses the opposite convention; negate.
    Invert,
    /// Export splits the amount into separate debit and credit columns.
    DebitCredit,
}

/// Parses a currency string to cents, stripping symbols and thousands
/// separators and accepting parenthesized negatives.
pub fn parse_amount(s: &str) -> Result<i64, AmountError> {
    let s = s.trim();
    let (negative, s) = if s.starts_with('(') && s.ends_with(')') {
        (true, &s[1..s.len() - 1])
    } else {
        (false, s)
    };
    let s = s.replace([',', '$', ' '], "");
    let mut dec = Decimal::from_str(&s).map_err(|_| AmountError::InvalidAmount(s.clone()))?;
    if negative {
        dec = -dec;
    }
    (dec * Decimal::from(100))
        .round()
        .to_i64()
        .ok_or(AmountError::InvalidAmount(s))
}

/// Resolves a debit/credit column pair into a canonically signed amount.
/// Exactly one side must be non-zero: debit becomes `-abs`, credit becomes
/// `+abs`. Both-present or both-absent is a format error, never a silent
/// default.
pub fn from_debit_credit(debit: Option<i64>, credit: Option<i64>) -> Result<i64, AmountError> {
    let debit = debit.filter(|v| *v != 0);
    let credit = credit.filter(|v| *v != 0);
    match (debit, credit) {
        (Some(d), None) => Ok(-d.abs()),
        (None, Some(c)) => Ok(c.abs()),
        _ => Err(AmountError::AmbiguousDebitCredit),
    }
}

pub fn apply_policy(policy: AmountPolicy, cents: i64) -> i64 {
    match policy {
        AmountPolicy::AsIs => cents,
        AmountPolicy::Invert => -cents,
        // Resolved earlier via from_debit_credit; nothing left to flip.
        AmountPolicy::DebitCredit => cents,
    }
}

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y", "%Y/%m/%d", "%m-%d-%Y", "%d-%m-%Y", "%m/%d/%y",
];

/// Tries each explicit format in order. There is no locale fallback; the
/// fixed list is the complete behavior.
pub fn parse_date(s: &str) -> Result<NaiveDate, AmountError> {
    let s = s.trim();
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(date);
        }
    }
    Err(AmountError::InvalidDate(s.to_string()))
}
