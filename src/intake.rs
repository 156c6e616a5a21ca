use serde::{Deserialize, Serialize};

use crate::{
    error::{EmergencyError, unknown_threat},
    ledger::{SharedLedger, ThreatRecord},
    types::{Threat, ThreatId},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntakeOutcome {
    Accepted,
    Duplicate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IntakeSummary {
    pub accepted: usize,
    pub duplicates: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemovalResult {
    pub threat_id: ThreatId,
    pub result: Result<ThreatRecord, EmergencyError>,
}

/// Entry point for threats reported by detection services, and for operators
/// clearing threats the cycle cannot resolve.
#[derive(Debug, Clone)]
pub struct IntakeHandler {
    ledger: SharedLedger,
}

impl IntakeHandler {
    pub fn new(ledger: SharedLedger) -> Self {
        Self { ledger }
    }

    pub async fn submit(&self, threat: Threat) -> IntakeOutcome {
        let threat_id = threat.threat_id;
        let category = threat.category.clone();
        if self.ledger.insert(threat).await {
            tracing::info!(
                target: "intake",
                threat_id = threat_id,
                category = %category,
                "threat_received"
            );
            IntakeOutcome::Accepted
        } else {
            tracing::debug!(target: "intake", threat_id = threat_id, "threat_duplicate_ignored");
            IntakeOutcome::Duplicate
        }
    }

    pub async fn submit_batch(&self, threats: Vec<Threat>) -> IntakeSummary {
        let mut summary = IntakeSummary::default();
        for threat in threats {
            match self.submit(threat).await {
                IntakeOutcome::Accepted => summary.accepted += 1,
                IntakeOutcome::Duplicate => summary.duplicates += 1,
            }
        }

        tracing::info!(
            target: "intake",
            accepted = summary.accepted,
            duplicates = summary.duplicates,
            "threat_batch_received"
        );
        summary
    }

    /// Drops a threat in any state; an in-flight sweep commit for it becomes a no-op.
    pub async fn remove(&self, threat_id: ThreatId) -> Result<ThreatRecord, EmergencyError> {
        let Some(record) = self.ledger.remove(threat_id).await else {
            tracing::warn!(target: "intake", threat_id = threat_id, "threat_removal_refused_unknown");
            return Err(unknown_threat(format!("unknown threat_id {threat_id}")));
        };
        tracing::info!(
            target: "intake",
            threat_id = threat_id,
            category = %record.threat.category,
            status = ?record.status,
            notified_count = record.notified_count,
            "threat_removed_by_operator"
        );
        Ok(record)
    }

    pub async fn remove_batch(
        &self,
        threat_ids: impl IntoIterator<Item = ThreatId>,
    ) -> Vec<RemovalResult> {
        let mut results = Vec::new();
        for threat_id in threat_ids {
            let result = self.remove(threat_id).await;
            results.push(RemovalResult { threat_id, result });
        }
        results
    }
}
