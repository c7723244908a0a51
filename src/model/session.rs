use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    Welcome,
    Evaluation,
    Mapping,
    Session,
    Summary,
}

impl Screen {
    pub fn key(&self) -> &'static str {
        match self {
            Screen::Welcome => "welcome",
            Screen::Evaluation => "evaluation",
            Screen::Mapping => "mapping",
            Screen::Session => "session",
            Screen::Summary => "summary",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointKind {
    /// SUDS re-rating, 0-10.
    Intensity,
    /// VoC re-rating, 1-7.
    Validity,
}

/// Before/after scores of one finished session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionReport {
    pub suds_start: u8,
    pub suds_end: u8,
    pub voc_start: u8,
    pub voc_end: u8,
}

impl SessionReport {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}
