use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(pub i64);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A bank account that transactions are imported into. The opening balance
/// lives here as an explicit field rather than in any process-wide table, so
/// tests can substitute fixtures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Option<AccountId>,
    pub name: String,
    pub institution: Option<String>,
    pub opening_balance_cents: i64,
    pub created_at: Option<DateTime<Utc>>,
}

impl Account {
    pub fn new(name: &str, institution: Option<&str>, opening_balance_cents: i64) -> Self {
        Account {
            id: None,
            name: name.to_string(),
            institution: institution.map(str::to_string),
            opening_balance_cents,
            created_at: None,
        }
    }
}
