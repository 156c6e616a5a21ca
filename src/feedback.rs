use crate::{
    error::EmergencyError,
    ledger::{AnswerEffect, SharedLedger},
    types::{PilotAnswer, ThreatId},
};

#[derive(Debug, Clone, PartialEq)]
pub struct AnswerResult {
    pub threat_id: ThreatId,
    pub result: Result<AnswerEffect, EmergencyError>,
}

/// Applies pilot answers to notified threats.
#[derive(Debug, Clone)]
pub struct FeedbackHandler {
    ledger: SharedLedger,
}

impl FeedbackHandler {
    pub fn new(ledger: SharedLedger) -> Self {
        Self { ledger }
    }

    pub async fn submit_answer(
        &self,
        threat_id: ThreatId,
        answer: PilotAnswer,
    ) -> Result<AnswerEffect, EmergencyError> {
        match self.ledger.apply_pilot_answer(threat_id, answer).await {
            Ok(effect) => {
                match &effect {
                    AnswerEffect::Resolved(record) => tracing::info!(
                        target: "feedback",
                        threat_id = threat_id,
                        notified_count = record.notified_count,
                        "threat_resolved"
                    ),
                    AnswerEffect::Reopened => tracing::info!(
                        target: "feedback",
                        threat_id = threat_id,
                        "threat_reopened"
                    ),
                    AnswerEffect::ReopenRequested => tracing::info!(
                        target: "feedback",
                        threat_id = threat_id,
                        "threat_reopen_requested_while_pending"
                    ),
                }
                Ok(effect)
            }
            Err(err) => {
                tracing::warn!(
                    target: "feedback",
                    threat_id = threat_id,
                    answer = %answer,
                    error_kind = err.kind.as_str(),
                    error = %err,
                    "pilot_answer_refused"
                );
                Err(err)
            }
        }
    }

    /// Applies each answer in order; one result per pair.
    pub async fn submit_answers(
        &self,
        answers: impl IntoIterator<Item = (ThreatId, PilotAnswer)>,
    ) -> Vec<AnswerResult> {
        let mut results = Vec::new();
        for (threat_id, answer) in answers {
            let result = self.submit_answer(threat_id, answer).await;
            results.push(AnswerResult { threat_id, result });
        }
        results
    }
}
