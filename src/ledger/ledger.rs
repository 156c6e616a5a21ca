use std::collections::BTreeMap;

use time::OffsetDateTime;

use crate::{
    error::{EmergencyError, invalid_transition, unknown_threat},
    ledger::types::{
        AnswerEffect, CommitOutcome, StatusChange, StatusCounts, ThreatRecord, ThreatStatus,
    },
    types::{Notification, PilotAnswer, Threat, ThreatId},
};

#[derive(Debug, Clone, Default)]
pub struct ThreatLedger {
    next_sequence: u64,
    next_revision: u64,
    records: BTreeMap<ThreatId, ThreatRecord>,
    arrival: BTreeMap<u64, ThreatId>,
}

impl ThreatLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, threat_id: ThreatId) -> Option<&ThreatRecord> {
        self.records.get(&threat_id)
    }

    pub fn insert(&mut self, threat: Threat) -> bool {
        let threat_id = threat.threat_id;
        if self.records.contains_key(&threat_id) {
            return false;
        }

        self.next_sequence = self.next_sequence.saturating_add(1);
        let revision = bump(&mut self.next_revision);
        let now = OffsetDateTime::now_utc();
        let record = ThreatRecord {
            threat,
            status: ThreatStatus::Pending,
            received_at: now,
            last_notification: None,
            revision,
            notified_count: 0,
            seq_no: self.next_sequence,
            history: vec![StatusChange {
                status: ThreatStatus::Pending,
                at: now,
            }],
        };
        self.arrival.insert(self.next_sequence, threat_id);
        self.records.insert(threat_id, record);
        true
    }

    pub fn get_pending(&self) -> Vec<ThreatRecord> {
        self.arrival
            .values()
            .filter_map(|threat_id| self.records.get(threat_id))
            .filter(|record| record.status == ThreatStatus::Pending)
            .cloned()
            .collect()
    }

    pub fn mark_notified(
        &mut self,
        threat_id: ThreatId,
        snapshot_revision: u64,
        notification: Option<Notification>,
    ) -> CommitOutcome {
        let Some(record) = self.records.get_mut(&threat_id) else {
            return CommitOutcome::Missing;
        };

        if record.status != ThreatStatus::Pending || record.revision != snapshot_revision {
            return CommitOutcome::Stale {
                status: record.status,
                revision: record.revision,
            };
        }

        record.status = ThreatStatus::Notified;
        record.last_notification = notification;
        record.notified_count = record.notified_count.saturating_add(1);
        record.revision = bump(&mut self.next_revision);
        record.history.push(StatusChange {
            status: ThreatStatus::Notified,
            at: OffsetDateTime::now_utc(),
        });
        CommitOutcome::Committed
    }

    pub fn apply_pilot_answer(
        &mut self,
        threat_id: ThreatId,
        answer: PilotAnswer,
    ) -> Result<AnswerEffect, EmergencyError> {
        let record = self
            .records
            .get_mut(&threat_id)
            .ok_or_else(|| unknown_threat(format!("unknown threat_id {}", threat_id)))?;

        match (record.status, answer) {
            (ThreatStatus::Notified, PilotAnswer::Accepted) => {
                let mut resolved = self
                    .remove(threat_id)
                    .ok_or_else(|| unknown_threat(format!("unknown threat_id {}", threat_id)))?;
                resolved.status = ThreatStatus::Accepted;
                resolved.history.push(StatusChange {
                    status: ThreatStatus::Accepted,
                    at: OffsetDateTime::now_utc(),
                });
                Ok(AnswerEffect::Resolved(Box::new(resolved)))
            }
            (ThreatStatus::Notified, PilotAnswer::Rejected) => {
                let now = OffsetDateTime::now_utc();
                record.history.push(StatusChange {
                    status: ThreatStatus::Rejected,
                    at: now,
                });
                record.history.push(StatusChange {
                    status: ThreatStatus::Pending,
                    at: now,
                });
                record.status = ThreatStatus::Pending;
                record.revision = bump(&mut self.next_revision);
                Ok(AnswerEffect::Reopened)
            }
            (ThreatStatus::Pending, PilotAnswer::Rejected) => {
                record.revision = bump(&mut self.next_revision);
                Ok(AnswerEffect::ReopenRequested)
            }
            (status, answer) => Err(invalid_transition(format!(
                "threat {} cannot take answer '{}' while {:?}",
                threat_id, answer, status
            ))),
        }
    }

    pub fn remove(&mut self, threat_id: ThreatId) -> Option<ThreatRecord> {
        let record = self.records.remove(&threat_id)?;
        self.arrival.remove(&record.seq_no);
        Some(record)
    }

    pub fn status_counts(&self) -> StatusCounts {
        self.records
            .values()
            .fold(StatusCounts::default(), |mut counts, record| {
                match record.status {
                    ThreatStatus::Pending => counts.pending += 1,
                    ThreatStatus::Notified => counts.notified += 1,
                    ThreatStatus::Accepted | ThreatStatus::Rejected => {}
                }
                counts
            })
    }
}

fn bump(counter: &mut u64) -> u64 {
    *counter = counter.saturating_add(1);
    *counter
}
