use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use chrono::NaiveDate;

use mariposa::content::ContentLibrary;
use mariposa::engine::engine::Engine;
use mariposa::engine::evaluation::Answer;
use mariposa::engine::flow::{FlowController, FlowEvent};
use mariposa::engine::interpolate::SessionConstants;
use mariposa::engine::llm_client::Assistant;
use mariposa::engine::plan::PlanSource;
use mariposa::engine::protocol::{EngineCommand, EngineResponse};
use mariposa::model::evaluation::Emotion;
use mariposa::model::message::ChatSender;
use mariposa::model::session::{CheckpointKind, Screen};

/// Answers plan requests with a fixed plan and everything else with a
/// short acknowledgement.
struct CannedAssistant;

impl Assistant for CannedAssistant {
    fn complete(&mut self, prompt: &str) -> anyhow::Result<String> {
        if prompt.contains("Devuelve SÓLO un array JSON") {
            return Ok("```json\n[\"A\", \"C\", \"G4\", \"F\", \"H\"]\n```".to_string());
        }
        Ok("Estoy contigo.".to_string())
    }

    fn reset(&mut self) {}
}

struct Harness {
    flow: FlowController,
    cmd_tx: mpsc::Sender<EngineCommand>,
    resp_rx: mpsc::Receiver<EngineResponse>,
    worker: Option<thread::JoinHandle<()>>,
    now: Instant,
}

impl Harness {
    fn new() -> Self {
        let library = Arc::new(ContentLibrary::standard().clone());
        let constants = SessionConstants::for_date(NaiveDate::from_ymd_opt(2026, 10, 17).unwrap());
        let flow = FlowController::with_constants(library.clone(), true, constants);

        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (resp_tx, resp_rx) = mpsc::channel();
        let worker = thread::spawn(move || {
            Engine::new(cmd_rx, resp_tx, Some(Box::new(CannedAssistant)), library).run();
        });

        Self {
            flow,
            cmd_tx,
            resp_rx,
            worker: Some(worker),
            now: Instant::now(),
        }
    }

    fn dispatch(&mut self, events: Vec<FlowEvent>) -> Vec<FlowEvent> {
        for event in &events {
            let cmd = match event.clone() {
                FlowEvent::Prompt { epoch, text } => EngineCommand::Narrate { epoch, prompt: text },
                FlowEvent::RequestPlan { epoch, record } => EngineCommand::GeneratePlan { epoch, record },
                FlowEvent::Reset => EngineCommand::Reset { epoch: self.flow.epoch() },
                _ => continue,
            };
            self.cmd_tx.send(cmd).unwrap();
        }
        events
    }

    /// Blocks for one worker response and feeds it back.
    fn receive(&mut self) -> Vec<FlowEvent> {
        let resp = self.resp_rx.recv_timeout(Duration::from_secs(5)).expect("worker answered");
        match resp {
            EngineResponse::Narration { epoch, text } => {
                self.flow.receive_narration(epoch, text);
                Vec::new()
            }
            EngineResponse::NarrationFailed { epoch } => {
                self.flow.narration_failed(epoch);
                Vec::new()
            }
            EngineResponse::PlanReady { epoch, outcome } => {
                let events = self.flow.apply_plan(epoch, outcome, self.now);
                self.dispatch(events)
            }
        }
    }

    fn receive_until_plan(&mut self) {
        while self.flow.plan().is_none() {
            self.receive();
        }
    }

    fn finish(mut self) {
        drop(self.cmd_tx);
        if let Some(worker) = self.worker.take() {
            worker.join().unwrap();
        }
    }
}

fn answer_all(h: &mut Harness) {
    let answers = [
        Answer::Text("Me ignoraron en una reunión".into()),
        Answer::Text("Mis compañeros".into()),
        Answer::Emotion(Emotion::Desolacion),
        Answer::Text("En el estómago".into()),
        Answer::Scale(9),
        Answer::Text("En el colegio".into()),
        Answer::Text("Mis compañeros de clase".into()),
        Answer::Text("Me rechazan".into()),
    ];
    for answer in answers {
        h.flow.answer(answer).unwrap();
        let events = h.flow.next_question(h.now).unwrap();
        h.dispatch(events);
    }
}

#[test]
fn full_session_with_personalized_plan() {
    let mut h = Harness::new();
    let events = h.flow.open();
    h.dispatch(events);
    let events = h.flow.start(h.now);
    h.dispatch(events);
    assert_eq!(h.flow.screen(), Screen::Evaluation);

    answer_all(&mut h);
    assert_eq!(h.flow.screen(), Screen::Mapping);
    let record = h.flow.record().unwrap().clone();
    assert_eq!(
        record.positive_cognition,
        "Puedo construir relaciones seguras y soy digno de pertenencia."
    );

    let events = h.flow.begin_session(h.now);
    h.dispatch(events);
    h.receive_until_plan();

    let plan = h.flow.plan().unwrap();
    assert_eq!(plan.source, PlanSource::Personalized);
    assert_eq!(plan.plan.ids(), ["A", "C", "G4", "F", "H"]);
    assert!(!h.flow.waiting_for_plan());

    let view = h.flow.snapshot().playback.unwrap();
    assert_eq!(view.protocol_id, "A");
    assert_eq!(view.phrase, "Desolación que siento es real y válida");

    let events = h.flow.toggle_pause(h.now);
    h.dispatch(events);

    let mut checkpoints = Vec::new();
    let mut guard = 0;
    while h.flow.screen() == Screen::Session {
        guard += 1;
        assert!(guard < 500, "session never completed");
        h.now += Duration::from_secs(6);
        let events = h.flow.tick(h.now);
        let events = h.dispatch(events);
        for event in events {
            if let FlowEvent::CheckpointOpened(kind) = event {
                checkpoints.push(kind);
                let rating = match kind {
                    CheckpointKind::Intensity => 2,
                    CheckpointKind::Validity => 7,
                };
                let events = h.flow.submit_checkpoint(rating, h.now);
                h.dispatch(events);
            }
        }
    }

    assert_eq!(checkpoints, [CheckpointKind::Intensity, CheckpointKind::Validity]);
    assert_eq!(h.flow.screen(), Screen::Summary);
    let report = h.flow.report().unwrap();
    assert_eq!((report.suds_start, report.suds_end), (9, 2));
    assert_eq!((report.voc_start, report.voc_end), (1, 7));
    assert!(!h.flow.timer_armed());

    // Summary narration carries the report.
    let json = report.to_json();
    assert!(json.contains("\"sudsEnd\":2"));

    while h.flow.assistant_busy() {
        h.receive();
    }
    assert!(h
        .flow
        .chat()
        .iter()
        .any(|m| m.sender == ChatSender::Assistant && m.text == "Estoy contigo."));

    h.finish();
}

#[test]
fn restart_during_plan_generation_ignores_the_late_plan() {
    let mut h = Harness::new();
    let events = h.flow.start(h.now);
    h.dispatch(events);
    answer_all(&mut h);

    let events = h.flow.restart();
    h.dispatch(events);
    assert_eq!(h.flow.screen(), Screen::Welcome);
    assert_eq!(h.flow.epoch(), 1);

    // Drain whatever the worker still answers; nothing from epoch 0 sticks.
    while let Ok(resp) = h.resp_rx.recv_timeout(Duration::from_millis(300)) {
        match resp {
            EngineResponse::PlanReady { epoch, outcome } => {
                assert!(h.flow.apply_plan(epoch, outcome, h.now).is_empty());
            }
            EngineResponse::Narration { epoch, text } => h.flow.receive_narration(epoch, text),
            EngineResponse::NarrationFailed { epoch } => h.flow.narration_failed(epoch),
        }
    }
    assert!(h.flow.plan().is_none());
    assert!(h.flow.record().is_none());

    h.finish();
}
