use chrono::NaiveDate;
use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite};
use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;

use till_audit::{AuditTransaction, PairKey};
use till_core::{Account, AccountId, NewTransaction, SourceTag};

pub type DbPool = Pool<Sqlite>;

pub async fn create_db(path: &Path) -> Result<DbPool, sqlx::Error> {
    connect(&format!("sqlite:{}?mode=rwc", path.display())).await
}

/// In-memory database, for tests and dry runs.
pub async fn create_memory_db() -> Result<DbPool, sqlx::Error> {
    connect("sqlite::memory:").await
}

async fn connect(url: &str) -> Result<DbPool, sqlx::Error> {
    // A single connection: the pool is shared process-wide and SQLite does
    // the serialization.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(url)
        .await?;

    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA cache_size = -32000")
        .execute(&pool)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS accounts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            institution TEXT,
            opening_balance_cents INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS transactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            account_id INTEGER NOT NULL,
            posted_date TEXT NOT NULL,
            description TEXT NOT NULL,
            amount_cents INTEGER NOT NULL,
            category TEXT,
            category_id INTEGER,
            memo TEXT,
            identity TEXT NOT NULL,
            source TEXT NOT NULL,
            created_at TEXT NOT NULL,
            deleted_at TEXT,
            FOREIGN KEY (account_id) REFERENCES accounts(id),
            UNIQUE (account_id, identity)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ignored_pairs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tx_low INTEGER NOT NULL,
            tx_high INTEGER NOT NULL,
            reason TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE (tx_low, tx_high)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn insert_account(pool: &DbPool, account: &Account) -> Result<AccountId, sqlx::Error> {
    let row: (i64,) = sqlx::query_as(
        "INSERT INTO accounts (name, institution, opening_balance_cents) VALUES (?, ?, ?) RETURNING id",
    )
    .bind(&account.name)
    .bind(&account.institution)
    .bind(account.opening_balance_cents)
    .fetch_one(pool)
    .await?;
    Ok(AccountId(row.0))
}

pub async fn get_account(pool: &DbPool, id: AccountId) -> Result<Option<Account>, sqlx::Error> {
    let row = sqlx::query_as::<_, (i64, String, Option<String>, i64)>(
        "SELECT id, name, institution, opening_balance_cents FROM accounts WHERE id = ?",
    )
    .bind(id.0)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| Account {
        id: Some(AccountId(r.0)),
        name: r.1,
        institution: r.2,
        opening_balance_cents: r.3,
        created_at: None,
    }))
}

pub async fn account_exists(pool: &DbPool, id: AccountId) -> Result<bool, sqlx::Error> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM accounts WHERE id = ?")
        .bind(id.0)
        .fetch_optional(pool)
        .await?;
    Ok(row.is_some())
}

/// Atomic insert-if-absent on `(account_id, identity)` — the storage half of
/// import idempotence. Returns `true` if the row was inserted, `false` if
/// the identity already existed.
pub async fn insert_if_absent(pool: &DbPool, tx: &NewTransaction) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO transactions
            (account_id, posted_date, description, amount_cents, category,
             category_id, memo, identity, source, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (account_id, identity) DO NOTHING
        "#,
    )
    .bind(tx.account_id.0)
    .bind(tx.posted_date.to_string())
    .bind(&tx.description)
    .bind(tx.amount_cents)
    .bind(&tx.category)
    .bind(tx.category_id)
    .bind(&tx.memo)
    .bind(&tx.identity)
    .bind(tx.source.as_str())
    .bind(tx.created_at.to_rfc3339())
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Bulk read for the duplicate audit: live transactions in the lookback
/// window, joined to their account names.
pub async fn transactions_since(
    pool: &DbPool,
    account_id: Option<i64>,
    since: NaiveDate,
) -> Result<Vec<AuditTransaction>, sqlx::Error> {
    let base = r#"
        SELECT t.id, t.account_id, a.name, t.posted_date, t.amount_cents,
               t.description, t.identity
        FROM transactions t
        JOIN accounts a ON a.id = t.account_id
        WHERE t.deleted_at IS NULL AND t.posted_date >= ?
    "#;

    let rows: Vec<(i64, i64, String, String, i64, String, String)> = match account_id {
        Some(id) => {
            sqlx::query_as(&format!("{base} AND t.account_id = ? ORDER BY t.posted_date, t.id"))
                .bind(since.to_string())
                .bind(id)
                .fetch_all(pool)
                .await?
        }
        None => {
            sqlx::query_as(&format!("{base} ORDER BY t.posted_date, t.id"))
                .bind(since.to_string())
                .fetch_all(pool)
                .await?
        }
    };

    rows.into_iter()
        .map(|r| {
            let date = NaiveDate::from_str(&r.3).map_err(|e| sqlx::Error::Decode(e.into()))?;
            Ok(AuditTransaction {
                id: r.0,
                account_id: r.1,
                account_name: r.2,
                date,
                amount_cents: r.4,
                description: r.5,
                identity: r.6,
            })
        })
        .collect()
}

pub async fn get_transaction_source(
    pool: &DbPool,
    tx_id: i64,
) -> Result<Option<SourceTag>, sqlx::Error> {
    let row: Option<(String,)> = sqlx::query_as("SELECT source FROM transactions WHERE id = ?")
        .bind(tx_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.and_then(|r| r.0.parse().ok()))
}

/// Marks a transaction as removed without losing the row; its identity keeps
/// guarding future re-imports of the same statement.
pub async fn soft_delete_transaction(pool: &DbPool, tx_id: i64) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE transactions SET deleted_at = datetime('now') WHERE id = ?")
        .bind(tx_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn record_ignored_pair(
    pool: &DbPool,
    pair: PairKey,
    reason: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO ignored_pairs (tx_low, tx_high, reason) VALUES (?, ?, ?)
         ON CONFLICT (tx_low, tx_high) DO NOTHING",
    )
    .bind(pair.0)
    .bind(pair.1)
    .bind(reason)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn is_pair_ignored(pool: &DbPool, a: i64, b: i64) -> Result<bool, sqlx::Error> {
    let key = PairKey::new(a, b);
    let row: Option<(i64,)> =
        sqlx::query_as("SELECT 1 FROM ignored_pairs WHERE tx_low = ? AND tx_high = ?")
            .bind(key.0)
            .bind(key.1)
            .fetch_optional(pool)
            .await?;
    Ok(row.is_some())
}

pub async fn ignored_pairs(pool: &DbPool) -> Result<HashSet<PairKey>, sqlx::Error> {
    let rows: Vec<(i64, i64)> = sqlx::query_as("SELECT tx_low, tx_high FROM ignored_pairs")
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(|(a, b)| PairKey::new(a, b)).collect())
}
