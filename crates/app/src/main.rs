use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;

use till_audit::{run_audit, AuditConfig, DuplicateCandidate};
use till_core::{Account, AccountId};
use till_import::{ImportPipeline, NullCategorizer, RuleCategorizer};
use till_storage::Store;

#[derive(Parser)]
#[command(name = "till", about = "Bank statement ingestion and duplicate audit")]
struct Cli {
    /// Database path; defaults to the platform data directory.
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Register an account to import into.
    AddAccount {
        name: String,
        #[arg(long)]
        institution: Option<String>,
        /// Starting balance in cents.
        #[arg(long, default_value_t = 0)]
        opening_balance: i64,
    },
    /// Import a bank CSV export into an account.
    Import {
        file: PathBuf,
        #[arg(long)]
        account: i64,
        /// TOML file of categorization rules.
        #[arg(long)]
        rules: Option<PathBuf>,
    },
    /// Scan recent history for exact and near-duplicate transactions.
    Audit {
        #[arg(long)]
        account: Option<i64>,
        #[arg(long)]
        days: Option<u32>,
        #[arg(long)]
        threshold: Option<f64>,
        #[arg(long)]
        max: Option<usize>,
    },
    /// Mark a candidate pair as "not a duplicate" so audits stop surfacing it.
    Ignore {
        first: i64,
        second: i64,
        #[arg(long, default_value = "reviewed")]
        reason: String,
    },
}

fn default_db_path() -> anyhow::Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("com", "till", "Till")
        .context("could not resolve a data directory")?;
    std::fs::create_dir_all(dirs.data_dir())?;
    Ok(dirs.data_dir().join("till.db"))
}

fn print_candidates(candidates: &[DuplicateCandidate]) {
    if candidates.is_empty() {
        println!("No duplicate candidates found.");
        return;
    }
    for (n, c) in candidates.iter().enumerate() {
        println!(
            "#{:<3} [{:?}] score {:.2}  {}",
            n + 1,
            c.kind,
            c.score,
            c.reason
        );
        for tx in [&c.first, &c.second] {
            println!(
                "      {:>6}  {}  {:>12}  {}  ({})",
                tx.id,
                tx.date,
                format_cents(tx.amount_cents),
                tx.description,
                tx.account_name
            );
        }
    }
    println!("{} candidate pair(s).", candidates.len());
}

fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.abs();
    format!("{sign}${}.{:02}", abs / 100, abs % 100)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let db_path = match &cli.db {
        Some(path) => path.clone(),
        None => default_db_path()?,
    };
    let pool = till_storage::create_db(&db_path)
        .await
        .with_context(|| format!("failed to open database at {}", db_path.display()))?;
    let store = Store::new(pool);

    match cli.command {
        Command::AddAccount {
            name,
            institution,
            opening_balance,
        } => {
            let account = Account::new(&name, institution.as_deref(), opening_balance);
            let id = till_storage::insert_account(store.pool(), &account).await?;
            println!("Created account {id}: {name}");
        }
        Command::Import {
            file,
            account,
            rules,
        } => {
            let target = till_storage::get_account(store.pool(), AccountId(account))
                .await?
                .with_context(|| format!("no account with id {account}"))?;
            let result = match rules {
                Some(rules_path) => {
                    let content = std::fs::read_to_string(&rules_path).with_context(|| {
                        format!("failed to read rules from {}", rules_path.display())
                    })?;
                    let categorizer =
                        RuleCategorizer::from_toml(&content).map_err(anyhow::Error::msg)?;
                    let pipeline = ImportPipeline::new(store, categorizer);
                    pipeline.import_file(&file, AccountId(account)).await?
                }
                None => {
                    let pipeline = ImportPipeline::new(store, NullCategorizer);
                    pipeline.import_file(&file, AccountId(account)).await?
                }
            };
            println!("{} into '{}': {result}", file.display(), target.name);
        }
        Command::Audit {
            account,
            days,
            threshold,
            max,
        } => {
            let mut config = AuditConfig::default();
            if let Some(days) = days {
                config.lookback_days = days;
            }
            if let Some(threshold) = threshold {
                config.similarity_threshold = threshold;
            }
            if let Some(max) = max {
                config.max_candidates = max;
            }
            let cancel = AtomicBool::new(false);
            let candidates = run_audit(&store, account, &config, &cancel).await?;
            print_candidates(&candidates);
        }
        Command::Ignore {
            first,
            second,
            reason,
        } => {
            let first_source = till_storage::get_transaction_source(store.pool(), first)
                .await?
                .with_context(|| format!("no transaction with id {first}"))?;
            let second_source = till_storage::get_transaction_source(store.pool(), second)
                .await?
                .with_context(|| format!("no transaction with id {second}"))?;
            till_storage::record_ignored_pair(
                store.pool(),
                till_audit::PairKey::new(first, second),
                &reason,
            )
            .await?;
            println!(
                "Pair ({first} [{first_source}], {second} [{second_source}]) will no longer be surfaced."
            );
        }
    }

    Ok(())
}
