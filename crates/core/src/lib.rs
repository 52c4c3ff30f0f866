pub mod account;
pub mod identity;
pub mod normalize;
pub mod transaction;

pub use account::{Account, AccountId};
pub use identity::{identity_for, IdentityBasis};
pub use normalize::{description_tokens, normalize_description};
pub use transaction::{ImportResult, NewTransaction, SourceTag};
