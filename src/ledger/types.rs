use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::types::{Notification, Threat, ThreatId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThreatStatus {
    Pending,
    Notified,
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: ThreatStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatRecord {
    pub threat: Threat,
    pub status: ThreatStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub received_at: OffsetDateTime,
    #[serde(default)]
    pub last_notification: Option<Notification>,
    /// Ledger-wide counter value taken on every mutation; a sweep commit only
    /// lands on the revision it snapshotted, never on a re-inserted record.
    pub revision: u64,
    pub notified_count: u32,
    pub seq_no: u64,
    #[serde(default)]
    pub history: Vec<StatusChange>,
}

impl ThreatRecord {
    pub fn threat_id(&self) -> ThreatId {
        self.threat.threat_id
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    Committed,
    Stale { status: ThreatStatus, revision: u64 },
    Missing,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnswerEffect {
    /// Accepted plan; the record left the ledger.
    Resolved(Box<ThreatRecord>),
    /// Rejected plan; the record is back in the pending pool.
    Reopened,
    /// Rejection for a record that was still pending; any in-flight commit for it goes stale.
    ReopenRequested,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub notified: usize,
}

impl StatusCounts {
    pub fn active(&self) -> usize {
        self.pending + self.notified
    }
}
