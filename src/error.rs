//! Error types for the session core

use thiserror::Error;

use crate::model::evaluation::IntakeField;

/// Refused forward transitions in the intake questionnaire
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IntakeError {
    #[error("Question '{}' has no answer yet", .0.key())]
    MissingAnswer(IntakeField),

    #[error("Answer does not fit question '{}'", .0.key())]
    WrongAnswerKind(IntakeField),

    #[error("Evaluation already finalized")]
    AlreadyFinalized,
}

/// Reasons a generated plan is discarded in favour of the default sequence
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("Assistant unavailable")]
    AssistantUnavailable,

    #[error("Assistant request failed: {0}")]
    Request(String),

    #[error("Plan is not a JSON array of strings: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Plan is empty")]
    Empty,

    #[error("Unknown protocol identifier: {0}")]
    UnknownProtocol(String),
}

/// Prerequisite data missing for a playback or screen transition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("No evaluation record")]
    MissingEvaluation,

    #[error("No session plan")]
    MissingPlan,

    #[error("No session report")]
    MissingReport,

    #[error("Plan references unknown protocol: {0}")]
    UnknownProtocol(String),
}

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("Failed to read protocol library: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid protocol library JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Protocol library is empty")]
    Empty,

    #[error("Protocol library cannot play default protocol: {0}")]
    MissingDefault(String),
}
