pub mod ledger;
pub mod shared;
pub mod types;

pub use ledger::ThreatLedger;
pub use shared::SharedLedger;
pub use types::{
    AnswerEffect, CommitOutcome, StatusChange, StatusCounts, ThreatRecord, ThreatStatus,
};
