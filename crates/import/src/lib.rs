pub mod amount;
pub mod banks;
pub mod pipeline;
pub mod row;
pub mod rules;

pub use amount::{AmountError, AmountPolicy};
pub use banks::{default_adapters, BankAdapter, RowCandidate, RowError};
pub use pipeline::{
    BoxError, Categorizer, CategoryMatch, ImportError, ImportPipeline, TransactionStore,
};
pub use row::{Row, RowHeaders, RowReader};
pub use rules::{CategoryRule, NullCategorizer, RuleCategorizer, RuleMatchType};
