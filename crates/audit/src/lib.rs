pub mod engine;
pub mod review;
pub mod similarity;

pub use engine::{
    scan, AuditConfig, AuditError, AuditTransaction, BoxError, CandidateKind, DuplicateCandidate,
    PairKey,
};
pub use review::{resolve, run_audit, AuditStore, Decision};
pub use similarity::jaccard;
