//! Session playback
//!
//! Walks the planned protocols phrase by phrase. Two protocols act as
//! checkpoints: when temporal differentiation runs out of phrases the user
//! re-rates intensity (SUDS), and when adult-identity installation does the
//! user re-rates validity (VoC). The engine never owns a clock; `advance` is
//! called by a ticker or by a manual "next", and `timer` says which ticker
//! the owner should have armed.

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};

use crate::content::{ContentLibrary, ADULT_IDENTITY, TEMPORAL_DIFFERENTIATION};
use crate::engine::interpolate::{interpolate, SessionConstants};
use crate::error::SessionError;
use crate::model::evaluation::{clamp_suds, clamp_voc, EvaluationRecord};
use crate::model::protocol::{PlanSequence, PlayableProtocol, ProtocolCategory};
use crate::model::session::{CheckpointKind, SessionReport};

/// Time budget spread over one protocol's taps.
pub const PROTOCOL_BUDGET_MS: u64 = 40_000;

/// Floor for the per-phrase interval.
pub const MIN_PHRASE_INTERVAL_MS: u64 = 3_000;

/// `max(budget / taps, floor)`. Zero taps counts as one.
pub fn phrase_interval(taps: u32) -> Duration {
    let per_tap = PROTOCOL_BUDGET_MS / u64::from(taps.max(1));
    Duration::from_millis(per_tap.max(MIN_PHRASE_INTERVAL_MS))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "checkpoint", rename_all = "snake_case")]
pub enum PlaybackState {
    Running,
    Paused,
    AwaitingCheckpoint(CheckpointKind),
    Complete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    ProtocolEntered(String),
    PhraseAdvanced { protocol: usize, phrase: usize },
    CheckpointOpened(CheckpointKind),
    Paused,
    Resumed,
    Completed(SessionReport),
}

/// What the owner's ticker should look like right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSpec {
    /// Changes every time the timer must be recreated.
    pub generation: u64,
    pub interval: Duration,
}

#[derive(Debug, Clone)]
pub struct PlaybackEngine {
    protocols: Vec<PlayableProtocol>,
    protocol_index: usize,
    phrase_index: usize,
    state: PlaybackState,
    suds_start: u8,
    voc_start: u8,
    suds: u8,
    voc: u8,
    checkpoints: Vec<(usize, CheckpointKind)>,
    report: Option<SessionReport>,
    generation: u64,
}

impl PlaybackEngine {
    /// Builds a paused engine at the first phrase of the first protocol.
    pub fn start(
        plan: Option<&PlanSequence>,
        record: Option<&EvaluationRecord>,
        library: &ContentLibrary,
    ) -> Result<(Self, Vec<PlaybackEvent>), SessionError> {
        let record = record.ok_or(SessionError::MissingEvaluation)?;
        let plan = plan
            .filter(|p| !p.is_empty())
            .ok_or(SessionError::MissingPlan)?;

        let protocols = plan
            .ids()
            .iter()
            .map(|id| {
                library
                    .resolve(id)
                    .ok_or_else(|| SessionError::UnknownProtocol(id.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let engine = Self {
            protocols,
            protocol_index: 0,
            phrase_index: 0,
            state: PlaybackState::Paused,
            suds_start: record.suds,
            voc_start: record.voc,
            suds: record.suds,
            voc: record.voc,
            checkpoints: Vec::new(),
            report: None,
            generation: 0,
        };

        info!(protocols = engine.protocols.len(), "playback ready");
        let first = engine.protocols[0].id.clone();
        Ok((engine, vec![PlaybackEvent::ProtocolEntered(first)]))
    }

    /// One step forward. Timer ticks and manual "next" both land here.
    pub fn advance(&mut self) -> Vec<PlaybackEvent> {
        if !matches!(self.state, PlaybackState::Running | PlaybackState::Paused) {
            return Vec::new();
        }

        let protocol = &self.protocols[self.protocol_index];
        if self.phrase_index + 1 < protocol.phrases.len() {
            self.phrase_index += 1;
            return vec![PlaybackEvent::PhraseAdvanced {
                protocol: self.protocol_index,
                phrase: self.phrase_index,
            }];
        }

        if let Some(kind) = checkpoint_after(&protocol.id) {
            self.state = PlaybackState::AwaitingCheckpoint(kind);
            self.checkpoints.push((self.protocol_index, kind));
            info!(?kind, protocol = %protocol.id, "checkpoint opened");
            return vec![PlaybackEvent::CheckpointOpened(kind)];
        }

        self.enter_next_protocol()
    }

    /// Flips running/paused. Ignored at a checkpoint or after completion.
    pub fn toggle_pause(&mut self) -> Vec<PlaybackEvent> {
        match self.state {
            PlaybackState::Running => {
                self.state = PlaybackState::Paused;
                debug!("playback paused");
                vec![PlaybackEvent::Paused]
            }
            PlaybackState::Paused => {
                self.state = PlaybackState::Running;
                self.generation += 1;
                debug!("playback resumed");
                vec![PlaybackEvent::Resumed]
            }
            _ => Vec::new(),
        }
    }

    /// Records the checkpoint rating and resumes with the next protocol.
    /// Ignored unless a checkpoint is open.
    pub fn resolve_checkpoint(&mut self, rating: i32) -> Vec<PlaybackEvent> {
        let PlaybackState::AwaitingCheckpoint(kind) = self.state else {
            return Vec::new();
        };

        match kind {
            CheckpointKind::Intensity => self.suds = clamp_suds(rating),
            CheckpointKind::Validity => self.voc = clamp_voc(rating),
        }
        info!(?kind, suds = self.suds, voc = self.voc, "checkpoint resolved");

        self.state = PlaybackState::Running;
        self.generation += 1;
        let mut events = vec![PlaybackEvent::Resumed];
        events.extend(self.enter_next_protocol());
        events
    }

    fn enter_next_protocol(&mut self) -> Vec<PlaybackEvent> {
        if self.protocol_index + 1 >= self.protocols.len() {
            return self.complete();
        }

        self.protocol_index += 1;
        self.phrase_index = 0;
        self.generation += 1;
        let id = self.protocols[self.protocol_index].id.clone();
        debug!(protocol = %id, "protocol entered");
        vec![PlaybackEvent::ProtocolEntered(id)]
    }

    fn complete(&mut self) -> Vec<PlaybackEvent> {
        let report = SessionReport {
            suds_start: self.suds_start,
            suds_end: self.suds,
            voc_start: self.voc_start,
            voc_end: self.voc,
        };
        self.state = PlaybackState::Complete;
        self.report = Some(report);
        info!(?report, "session complete");
        vec![PlaybackEvent::Completed(report)]
    }

    pub fn timer(&self) -> Option<TimerSpec> {
        (self.state == PlaybackState::Running).then(|| TimerSpec {
            generation: self.generation,
            interval: phrase_interval(self.current_protocol().taps),
        })
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn protocol_index(&self) -> usize {
        self.protocol_index
    }

    pub fn phrase_index(&self) -> usize {
        self.phrase_index
    }

    pub fn current_protocol(&self) -> &PlayableProtocol {
        &self.protocols[self.protocol_index]
    }

    pub fn current_template(&self) -> &str {
        self.current_protocol()
            .phrases
            .get(self.phrase_index)
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn suds(&self) -> u8 {
        self.suds
    }

    pub fn voc(&self) -> u8 {
        self.voc
    }

    pub fn report(&self) -> Option<SessionReport> {
        self.report
    }

    /// Checkpoints opened so far, with the protocol index they followed.
    #[cfg(test)]
    pub fn checkpoints(&self) -> &[(usize, CheckpointKind)] {
        &self.checkpoints
    }

    pub fn view(&self, record: &EvaluationRecord, constants: &SessionConstants) -> PlaybackView {
        let protocol = self.current_protocol();
        PlaybackView {
            protocol_id: protocol.id.clone(),
            protocol_name: protocol.name.clone(),
            description: protocol.description.clone(),
            category: protocol.category,
            protocol_index: self.protocol_index,
            protocol_count: self.protocols.len(),
            phrase_index: self.phrase_index,
            phrase_count: protocol.phrases.len(),
            phrase: interpolate(self.current_template(), record, constants),
            state: self.state,
            suds: self.suds,
            voc: self.voc,
            progress: self.protocol_index as f32 / self.protocols.len() as f32,
        }
    }
}

fn checkpoint_after(protocol_id: &str) -> Option<CheckpointKind> {
    match protocol_id {
        TEMPORAL_DIFFERENTIATION => Some(CheckpointKind::Intensity),
        ADULT_IDENTITY => Some(CheckpointKind::Validity),
        _ => None,
    }
}

/// Render-ready playback state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackView {
    pub protocol_id: String,
    pub protocol_name: String,
    pub description: String,
    pub category: ProtocolCategory,
    pub protocol_index: usize,
    pub protocol_count: usize,
    pub phrase_index: usize,
    pub phrase_count: usize,
    pub phrase: String,
    pub state: PlaybackState,
    pub suds: u8,
    pub voc: u8,
    pub progress: f32,
}
