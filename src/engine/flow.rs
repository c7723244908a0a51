//! Screen flow
//!
//! Top-level state machine: welcome → evaluation → mapping → session →
//! summary. All per-run state lives in a [`SessionContext`] that is replaced
//! wholesale on restart; its epoch tags every request that leaves the
//! controller so late answers from an earlier run can be recognised and
//! dropped.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::content::ContentLibrary;
use crate::engine::evaluation::{Answer, EvaluationPipeline, StepOutcome};
use crate::engine::interpolate::SessionConstants;
use crate::engine::narration::{NarrationCue, NarrationLedger};
use crate::engine::plan::PlanOutcome;
use crate::engine::playback::{PlaybackEngine, PlaybackEvent, PlaybackView};
use crate::engine::prompt_builder::PromptBuilder;
use crate::engine::ticker::Ticker;
use crate::error::{IntakeError, SessionError};
use crate::model::evaluation::{EvaluationRecord, IntakeDraft};
use crate::model::message::{ChatLog, ChatMessage, ChatSender};
use crate::model::session::{CheckpointKind, Screen, SessionReport};

pub const ANALYSING_MESSAGE: &str =
    "Analizando tu evaluación para crear un plan de sanación personalizado...";

pub const ASSISTANT_UNAVAILABLE_MESSAGE: &str =
    "Lo siento, estoy teniendo problemas para conectarme. La guía IA no estará disponible.";

/// Outbound effects for the shell to carry out.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowEvent {
    ScreenChanged(Screen),
    Prompt { epoch: u64, text: String },
    RequestPlan { epoch: u64, record: EvaluationRecord },
    ProtocolEntered(String),
    CheckpointOpened(CheckpointKind),
    SessionCompleted(SessionReport),
    Reset,
}

/// Everything that belongs to one run through the screens.
#[derive(Debug)]
pub struct SessionContext {
    epoch: u64,
    constants: SessionConstants,
    intake: EvaluationPipeline,
    record: Option<EvaluationRecord>,
    plan: Option<PlanOutcome>,
    playback: Option<PlaybackEngine>,
    report: Option<SessionReport>,
    ledger: NarrationLedger,
    chat: ChatLog,
    ticker: Ticker,
    pending_replies: usize,
}

impl SessionContext {
    fn new(epoch: u64, constants: SessionConstants) -> Self {
        Self {
            epoch,
            constants,
            intake: EvaluationPipeline::new(),
            record: None,
            plan: None,
            playback: None,
            report: None,
            ledger: NarrationLedger::default(),
            chat: ChatLog::default(),
            ticker: Ticker::default(),
            pending_replies: 0,
        }
    }

    /// A fresh context whose chat says up front when guidance is off.
    fn opened(epoch: u64, constants: SessionConstants, assistant_available: bool) -> Self {
        let mut ctx = Self::new(epoch, constants);
        if !assistant_available {
            ctx.chat.push(ChatSender::Assistant, ASSISTANT_UNAVAILABLE_MESSAGE);
        }
        ctx
    }
}

pub struct FlowController {
    screen: Screen,
    library: Arc<ContentLibrary>,
    assistant_available: bool,
    ctx: SessionContext,
}

impl FlowController {
    pub fn new(library: Arc<ContentLibrary>, assistant_available: bool) -> Self {
        Self::with_constants(library, assistant_available, SessionConstants::today())
    }

    pub fn with_constants(
        library: Arc<ContentLibrary>,
        assistant_available: bool,
        constants: SessionConstants,
    ) -> Self {
        Self {
            screen: Screen::Welcome,
            library,
            assistant_available,
            ctx: SessionContext::opened(0, constants, assistant_available),
        }
    }

    /* =========================
       Accessors
       ========================= */

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn epoch(&self) -> u64 {
        self.ctx.epoch
    }

    pub fn library(&self) -> &ContentLibrary {
        &self.library
    }

    pub fn constants(&self) -> &SessionConstants {
        &self.ctx.constants
    }

    pub fn intake(&self) -> &EvaluationPipeline {
        &self.ctx.intake
    }

    pub fn record(&self) -> Option<&EvaluationRecord> {
        self.ctx.record.as_ref()
    }

    pub fn plan(&self) -> Option<&PlanOutcome> {
        self.ctx.plan.as_ref()
    }

    pub fn playback(&self) -> Option<&PlaybackEngine> {
        self.ctx.playback.as_ref()
    }

    pub fn report(&self) -> Option<SessionReport> {
        self.ctx.report
    }

    pub fn chat(&self) -> &[ChatMessage] {
        self.ctx.chat.messages()
    }

    pub fn assistant_busy(&self) -> bool {
        self.ctx.pending_replies > 0
    }

    /// On the session screen but the plan has not arrived yet.
    pub fn waiting_for_plan(&self) -> bool {
        self.screen == Screen::Session && self.ctx.playback.is_none()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.ctx.ticker.next_due()
    }

    pub fn timer_armed(&self) -> bool {
        self.ctx.ticker.is_armed()
    }

    /* =========================
       Transitions
       ========================= */

    /// Narrates the initial welcome screen.
    pub fn open(&mut self) -> Vec<FlowEvent> {
        let mut events = Vec::new();
        self.narrate_screen(Screen::Welcome, &mut events);
        events
    }

    /// Welcome → Evaluation.
    pub fn start(&mut self, now: Instant) -> Vec<FlowEvent> {
        if self.screen != Screen::Welcome {
            return Vec::new();
        }
        self.enter(Screen::Evaluation, now)
    }

    pub fn answer(&mut self, answer: Answer) -> Result<(), IntakeError> {
        if self.screen != Screen::Evaluation {
            return Err(IntakeError::AlreadyFinalized);
        }
        self.ctx.intake.answer(answer)
    }

    /// Forward in the questionnaire; leaving the last question moves to
    /// mapping and requests a plan.
    pub fn next_question(&mut self, now: Instant) -> Result<Vec<FlowEvent>, IntakeError> {
        if self.screen != Screen::Evaluation {
            return Err(IntakeError::AlreadyFinalized);
        }

        let mut events = Vec::new();
        match self.ctx.intake.next()? {
            StepOutcome::Advanced(step) => {
                self.narrate(NarrationCue::EvaluationStep(step), &mut events);
            }
            StepOutcome::Completed(record) => {
                self.ctx.record = Some(record.clone());
                events.extend(self.enter(Screen::Mapping, now));
                if self.assistant_available {
                    self.ctx.chat.push(ChatSender::Assistant, ANALYSING_MESSAGE);
                }
                events.push(FlowEvent::RequestPlan {
                    epoch: self.ctx.epoch,
                    record,
                });
            }
        }
        Ok(events)
    }

    pub fn previous_question(&mut self) -> Vec<FlowEvent> {
        let mut events = Vec::new();
        if self.screen != Screen::Evaluation {
            return events;
        }
        if let Some(step) = self.ctx.intake.back() {
            self.narrate(NarrationCue::EvaluationStep(step), &mut events);
        }
        events
    }

    /// Accepts a plan produced for `epoch`. Plans for an earlier run, or
    /// arriving after one was already applied, are dropped.
    pub fn apply_plan(&mut self, epoch: u64, outcome: PlanOutcome, now: Instant) -> Vec<FlowEvent> {
        let mut events = Vec::new();
        if epoch != self.ctx.epoch {
            warn!(epoch, current = self.ctx.epoch, "discarding plan from an earlier session");
            return events;
        }
        let Some(record) = self.ctx.record.as_ref() else {
            warn!("discarding plan without an evaluation");
            return events;
        };
        if self.ctx.plan.is_some() {
            debug!("plan already applied");
            return events;
        }

        let cue = NarrationCue::PlanReady {
            source: outcome.source,
            emotion: record.emotion.label().to_string(),
        };
        info!(source = ?outcome.source, plan = ?outcome.plan.ids(), "plan applied");
        self.ctx.plan = Some(outcome);
        self.narrate(cue, &mut events);

        if self.waiting_for_plan() {
            events.extend(self.start_playback(now));
        }
        events
    }

    /// Mapping → Session. Shows a waiting state until the plan lands.
    pub fn begin_session(&mut self, now: Instant) -> Vec<FlowEvent> {
        if self.screen != Screen::Mapping {
            return Vec::new();
        }
        self.enter(Screen::Session, now)
    }

    pub fn toggle_pause(&mut self, now: Instant) -> Vec<FlowEvent> {
        let Some(playback) = self.ctx.playback.as_mut() else {
            return Vec::new();
        };
        let events = playback.toggle_pause();
        self.absorb(events, now)
    }

    /// Manual "next phrase".
    pub fn advance(&mut self, now: Instant) -> Vec<FlowEvent> {
        let Some(playback) = self.ctx.playback.as_mut() else {
            return Vec::new();
        };
        let events = playback.advance();
        self.absorb(events, now)
    }

    /// Polls the phrase timer; advances when it is due.
    pub fn tick(&mut self, now: Instant) -> Vec<FlowEvent> {
        if !self.ctx.ticker.poll(now) {
            return Vec::new();
        }
        self.advance(now)
    }

    pub fn submit_checkpoint(&mut self, rating: i32, now: Instant) -> Vec<FlowEvent> {
        let Some(playback) = self.ctx.playback.as_mut() else {
            return Vec::new();
        };
        let events = playback.resolve_checkpoint(rating);
        self.absorb(events, now)
    }

    /// Drops the whole session context and returns to welcome.
    pub fn restart(&mut self) -> Vec<FlowEvent> {
        self.reset()
    }

    pub fn user_message(&mut self, text: &str) -> Vec<FlowEvent> {
        let mut events = Vec::new();
        let text = text.trim();
        if text.is_empty() {
            return events;
        }
        self.ctx.chat.push(ChatSender::User, text);
        self.narrate(NarrationCue::UserMessage(text.to_string()), &mut events);
        events
    }

    pub fn receive_narration(&mut self, epoch: u64, text: String) {
        if epoch != self.ctx.epoch {
            debug!(epoch, "discarding narration from an earlier session");
            return;
        }
        self.ctx.pending_replies = self.ctx.pending_replies.saturating_sub(1);
        self.ctx.chat.push(ChatSender::Assistant, text);
    }

    pub fn narration_failed(&mut self, epoch: u64) {
        if epoch == self.ctx.epoch {
            self.ctx.pending_replies = self.ctx.pending_replies.saturating_sub(1);
        }
    }

    /* =========================
       Internals
       ========================= */

    fn enter(&mut self, screen: Screen, now: Instant) -> Vec<FlowEvent> {
        if let Err(err) = self.check_guard(screen) {
            warn!(error = %err, screen = screen.key(), "guard failed, resetting");
            return self.reset();
        }

        info!(from = self.screen.key(), to = screen.key(), "screen change");
        self.screen = screen;
        let mut events = vec![FlowEvent::ScreenChanged(screen)];
        self.narrate_screen(screen, &mut events);

        match screen {
            Screen::Evaluation => {
                let step = self.ctx.intake.step();
                self.narrate(NarrationCue::EvaluationStep(step), &mut events);
            }
            Screen::Session if self.ctx.plan.is_some() => {
                events.extend(self.start_playback(now));
            }
            _ => {}
        }

        events
    }

    fn check_guard(&self, screen: Screen) -> Result<(), SessionError> {
        let needs_record = matches!(screen, Screen::Mapping | Screen::Session | Screen::Summary);
        if needs_record && self.ctx.record.is_none() {
            return Err(SessionError::MissingEvaluation);
        }
        if screen == Screen::Summary && self.ctx.report.is_none() {
            return Err(SessionError::MissingReport);
        }
        Ok(())
    }

    fn start_playback(&mut self, now: Instant) -> Vec<FlowEvent> {
        let plan = self.ctx.plan.as_ref().map(|p| &p.plan);
        match PlaybackEngine::start(plan, self.ctx.record.as_ref(), &self.library) {
            Ok((engine, events)) => {
                self.ctx.playback = Some(engine);
                self.absorb(events, now)
            }
            Err(err) => {
                warn!(error = %err, "playback could not start, resetting");
                self.reset()
            }
        }
    }

    /// Turns playback events into flow events and keeps the ticker in step.
    fn absorb(&mut self, playback_events: Vec<PlaybackEvent>, now: Instant) -> Vec<FlowEvent> {
        let mut events = Vec::new();

        for event in playback_events {
            match event {
                PlaybackEvent::ProtocolEntered(id) => {
                    self.narrate(NarrationCue::ProtocolEntered(id.clone()), &mut events);
                    events.push(FlowEvent::ProtocolEntered(id));
                }
                PlaybackEvent::CheckpointOpened(kind) => {
                    self.narrate(NarrationCue::Checkpoint(kind), &mut events);
                    events.push(FlowEvent::CheckpointOpened(kind));
                }
                PlaybackEvent::Completed(report) => {
                    self.ctx.report = Some(report);
                    events.push(FlowEvent::SessionCompleted(report));
                    self.sync_timer(now);
                    events.extend(self.enter(Screen::Summary, now));
                    return events;
                }
                PlaybackEvent::PhraseAdvanced { .. } | PlaybackEvent::Paused | PlaybackEvent::Resumed => {}
            }
        }

        self.sync_timer(now);
        events
    }

    fn sync_timer(&mut self, now: Instant) {
        let wanted = self.ctx.playback.as_ref().and_then(|p| p.timer());
        match wanted {
            None => self.ctx.ticker.cancel(),
            Some(spec) if self.ctx.ticker.key() != Some(spec.generation) => {
                debug!(interval_ms = spec.interval.as_millis() as u64, "phrase timer armed");
                self.ctx.ticker.arm(spec.generation, spec.interval, now);
            }
            Some(_) => {}
        }
    }

    fn reset(&mut self) -> Vec<FlowEvent> {
        let epoch = self.ctx.epoch + 1;
        info!(epoch, "session reset");
        self.ctx = SessionContext::opened(epoch, SessionConstants::today(), self.assistant_available);
        self.screen = Screen::Welcome;

        let mut events = vec![FlowEvent::Reset, FlowEvent::ScreenChanged(Screen::Welcome)];
        self.narrate_screen(Screen::Welcome, &mut events);
        events
    }

    fn narrate_screen(&mut self, screen: Screen, events: &mut Vec<FlowEvent>) {
        let payload = match screen {
            Screen::Mapping => self.ctx.record.as_ref().map(EvaluationRecord::to_json),
            Screen::Summary => self.ctx.report.as_ref().map(SessionReport::to_json),
            _ => None,
        };
        self.narrate(NarrationCue::Screen { screen, payload }, events);
    }

    fn narrate(&mut self, cue: NarrationCue, events: &mut Vec<FlowEvent>) {
        if !self.assistant_available || !self.ctx.ledger.admit(&cue) {
            return;
        }
        if let Some(text) = PromptBuilder::for_cue(&cue, &self.library) {
            self.ctx.pending_replies += 1;
            events.push(FlowEvent::Prompt {
                epoch: self.ctx.epoch,
                text,
            });
        }
    }

    pub fn snapshot(&self) -> FlowSnapshot {
        let intake = &self.ctx.intake;
        let question = intake.question();
        FlowSnapshot {
            screen: self.screen,
            epoch: self.ctx.epoch,
            evaluation: EvaluationView {
                step: intake.step(),
                total_steps: intake.total_steps(),
                label: question.label.to_string(),
                placeholder: question.placeholder.to_string(),
                draft: intake.draft().clone(),
            },
            record: self.ctx.record.clone(),
            plan: self.ctx.plan.clone(),
            waiting_for_plan: self.waiting_for_plan(),
            playback: self
                .ctx
                .playback
                .as_ref()
                .zip(self.ctx.record.as_ref())
                .map(|(p, r)| p.view(r, &self.ctx.constants)),
            report: self.ctx.report,
            chat: self.ctx.chat.messages().to_vec(),
            assistant_busy: self.assistant_busy(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EvaluationView {
    pub step: usize,
    pub total_steps: usize,
    pub label: String,
    pub placeholder: String,
    pub draft: IntakeDraft,
}

/// Plain, serializable picture of the controller for a presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct FlowSnapshot {
    pub screen: Screen,
    pub epoch: u64,
    pub evaluation: EvaluationView,
    pub record: Option<EvaluationRecord>,
    pub plan: Option<PlanOutcome>,
    pub waiting_for_plan: bool,
    pub playback: Option<PlaybackView>,
    pub report: Option<SessionReport>,
    pub chat: Vec<ChatMessage>,
    pub assistant_busy: bool,
}
