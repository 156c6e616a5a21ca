use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    error::EmergencyError,
    ledger::{
        ledger::ThreatLedger,
        types::{AnswerEffect, CommitOutcome, StatusCounts, ThreatRecord},
    },
    types::{Notification, PilotAnswer, Threat, ThreatId},
};

/// Handle shared by intake, feedback and the resolution cycle.
///
/// Every method is one critical section; the guard never leaves this type, so
/// no collaborator call can run while the ledger is locked.
#[derive(Debug, Clone, Default)]
pub struct SharedLedger {
    inner: Arc<Mutex<ThreatLedger>>,
}

impl SharedLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_ledger(ledger: ThreatLedger) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ledger)),
        }
    }

    pub async fn insert(&self, threat: Threat) -> bool {
        self.inner.lock().await.insert(threat)
    }

    pub async fn get_pending(&self) -> Vec<ThreatRecord> {
        self.inner.lock().await.get_pending()
    }

    pub async fn get(&self, threat_id: ThreatId) -> Option<ThreatRecord> {
        self.inner.lock().await.get(threat_id).cloned()
    }

    pub async fn mark_notified(
        &self,
        threat_id: ThreatId,
        snapshot_revision: u64,
        notification: Option<Notification>,
    ) -> CommitOutcome {
        self.inner
            .lock()
            .await
            .mark_notified(threat_id, snapshot_revision, notification)
    }

    pub async fn apply_pilot_answer(
        &self,
        threat_id: ThreatId,
        answer: PilotAnswer,
    ) -> Result<AnswerEffect, EmergencyError> {
        self.inner.lock().await.apply_pilot_answer(threat_id, answer)
    }

    pub async fn remove(&self, threat_id: ThreatId) -> Option<ThreatRecord> {
        self.inner.lock().await.remove(threat_id)
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn status_counts(&self) -> StatusCounts {
        self.inner.lock().await.status_counts()
    }
}
