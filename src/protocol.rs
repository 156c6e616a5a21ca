use serde::{Deserialize, Serialize, de::Error as _};

use crate::{
    error::EmergencyError,
    feedback::AnswerResult,
    intake::{IntakeSummary, RemovalResult},
    types::{PilotAnswer, Threat, ThreatId},
};

#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    SubmitThreats(Vec<Threat>),
    SubmitPilotAnswers(Vec<(ThreatId, PilotAnswer)>),
    RemoveThreats(Vec<ThreatId>),
    Exit,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct WireMessage {
    #[serde(rename = "type")]
    kind: WireMessageType,
    #[serde(default)]
    threats: Option<Vec<Threat>>,
    #[serde(default)]
    answers: Option<Vec<WireAnswer>>,
    #[serde(default)]
    threat_ids: Option<Vec<ThreatId>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum WireMessageType {
    SubmitThreats,
    SubmitPilotAnswers,
    RemoveThreats,
    Exit,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct WireAnswer {
    threat_id: ThreatId,
    answer: PilotAnswer,
}

pub fn parse_client_message(line: &str) -> Result<ClientMessage, serde_json::Error> {
    let wire: WireMessage = serde_json::from_str(line)?;
    let message = match (wire.kind, wire.threats, wire.answers, wire.threat_ids) {
        (WireMessageType::SubmitThreats, Some(threats), None, None) => {
            ClientMessage::SubmitThreats(threats)
        }
        (WireMessageType::SubmitPilotAnswers, None, Some(answers), None) => {
            ClientMessage::SubmitPilotAnswers(
                answers
                    .into_iter()
                    .map(|item| (item.threat_id, item.answer))
                    .collect(),
            )
        }
        (WireMessageType::RemoveThreats, None, None, Some(threat_ids)) => {
            ClientMessage::RemoveThreats(threat_ids)
        }
        (WireMessageType::Exit, None, None, None) => ClientMessage::Exit,
        (WireMessageType::SubmitThreats, ..) => {
            return Err(serde_json::Error::custom(
                "submit_threats takes exactly one `threats` array",
            ));
        }
        (WireMessageType::SubmitPilotAnswers, ..) => {
            return Err(serde_json::Error::custom(
                "submit_pilot_answers takes exactly one `answers` array",
            ));
        }
        (WireMessageType::RemoveThreats, ..) => {
            return Err(serde_json::Error::custom(
                "remove_threats takes exactly one `threat_ids` array",
            ));
        }
        (WireMessageType::Exit, ..) => {
            return Err(serde_json::Error::custom("exit takes no fields"));
        }
    };
    Ok(message)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    ThreatsAccepted {
        accepted: usize,
        duplicates: usize,
    },
    PilotAnswersApplied {
        results: Vec<ThreatReply>,
    },
    ThreatsRemoved {
        results: Vec<ThreatReply>,
    },
    Error {
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThreatReply {
    pub threat_id: ThreatId,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<EmergencyError>,
}

impl From<IntakeSummary> for ServerMessage {
    fn from(summary: IntakeSummary) -> Self {
        Self::ThreatsAccepted {
            accepted: summary.accepted,
            duplicates: summary.duplicates,
        }
    }
}

impl From<Vec<AnswerResult>> for ServerMessage {
    fn from(results: Vec<AnswerResult>) -> Self {
        Self::PilotAnswersApplied {
            results: results
                .into_iter()
                .map(|item| ThreatReply {
                    threat_id: item.threat_id,
                    ok: item.result.is_ok(),
                    error: item.result.err(),
                })
                .collect(),
        }
    }
}

impl From<Vec<RemovalResult>> for ServerMessage {
    fn from(results: Vec<RemovalResult>) -> Self {
        Self::ThreatsRemoved {
            results: results
                .into_iter()
                .map(|item| ThreatReply {
                    threat_id: item.threat_id,
                    ok: item.result.is_ok(),
                    error: item.result.err(),
                })
                .collect(),
        }
    }
}

pub fn encode_server_message(message: &ServerMessage) -> Result<String, serde_json::Error> {
    let mut line = serde_json::to_string(message)?;
    line.push('\n');
    Ok(line)
}
