use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmergencyErrorKind {
    UnknownThreat,
    InvalidTransition,
    UnsupportedThreatCategory,
    NoCandidates,
    InvalidThreat,
    CollaboratorUnavailable,
    Internal,
}

impl EmergencyErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UnknownThreat => "unknown_threat",
            Self::InvalidTransition => "invalid_transition",
            Self::UnsupportedThreatCategory => "unsupported_threat_category",
            Self::NoCandidates => "no_candidates",
            Self::InvalidThreat => "invalid_threat",
            Self::CollaboratorUnavailable => "collaborator_unavailable",
            Self::Internal => "internal",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{message}")]
pub struct EmergencyError {
    pub kind: EmergencyErrorKind,
    pub message: String,
}

impl EmergencyError {
    pub fn new(kind: EmergencyErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

pub fn unknown_threat(message: impl Into<String>) -> EmergencyError {
    EmergencyError::new(EmergencyErrorKind::UnknownThreat, message)
}

pub fn invalid_transition(message: impl Into<String>) -> EmergencyError {
    EmergencyError::new(EmergencyErrorKind::InvalidTransition, message)
}

pub fn unsupported_category(message: impl Into<String>) -> EmergencyError {
    EmergencyError::new(EmergencyErrorKind::UnsupportedThreatCategory, message)
}

pub fn no_candidates(message: impl Into<String>) -> EmergencyError {
    EmergencyError::new(EmergencyErrorKind::NoCandidates, message)
}

pub fn invalid_threat(message: impl Into<String>) -> EmergencyError {
    EmergencyError::new(EmergencyErrorKind::InvalidThreat, message)
}

pub fn collaborator_unavailable(message: impl Into<String>) -> EmergencyError {
    EmergencyError::new(EmergencyErrorKind::CollaboratorUnavailable, message)
}

pub fn internal_error(message: impl Into<String>) -> EmergencyError {
    EmergencyError::new(EmergencyErrorKind::Internal, message)
}
