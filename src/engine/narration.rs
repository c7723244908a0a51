use std::collections::HashSet;

use crate::engine::plan::PlanSource;
use crate::model::session::{CheckpointKind, Screen};

/// Something worth telling the narration assistant about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NarrationCue {
    /// `payload` is the JSON of whatever the screen displays, if anything.
    Screen {
        screen: Screen,
        payload: Option<String>,
    },
    EvaluationStep(usize),
    ProtocolEntered(String),
    Checkpoint(CheckpointKind),
    PlanReady {
        source: PlanSource,
        emotion: String,
    },
    UserMessage(String),
}

/// Screen narrations already sent in this session.
///
/// Owned by the session context and dropped with it on reset, so it never
/// outlives the session it deduplicates.
#[derive(Debug, Clone, Default)]
pub struct NarrationLedger {
    sent: HashSet<String>,
}

impl NarrationLedger {
    /// True the first time a (screen, payload) pair is seen. Other cues are
    /// never deduplicated.
    pub fn admit(&mut self, cue: &NarrationCue) -> bool {
        match cue {
            NarrationCue::Screen { screen, payload } => {
                let key = format!("{}{}", screen.key(), payload.as_deref().unwrap_or(""));
                self.sent.insert(key)
            }
            _ => true,
        }
    }

    pub fn len(&self) -> usize {
        self.sent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sent.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn screen(screen: Screen, payload: Option<&str>) -> NarrationCue {
        NarrationCue::Screen {
            screen,
            payload: payload.map(str::to_string),
        }
    }

    #[test]
    fn screens_are_narrated_once_per_payload() {
        let mut ledger = NarrationLedger::default();
        assert!(ledger.admit(&screen(Screen::Welcome, None)));
        assert!(!ledger.admit(&screen(Screen::Welcome, None)));

        assert!(ledger.admit(&screen(Screen::Summary, Some("{\"a\":1}"))));
        assert!(ledger.admit(&screen(Screen::Summary, Some("{\"a\":2}"))));
        assert!(!ledger.admit(&screen(Screen::Summary, Some("{\"a\":1}"))));
        assert_eq!(ledger.len(), 3);
    }

    #[test]
    fn protocol_entries_always_pass() {
        let mut ledger = NarrationLedger::default();
        let cue = NarrationCue::ProtocolEntered("A".into());
        assert!(ledger.admit(&cue));
        assert!(ledger.admit(&cue));
        assert!(ledger.is_empty());
    }
}
