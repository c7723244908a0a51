use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use eframe::egui;
use egui::Layout;
use tracing::{debug, info, warn};

use mariposa::config::AppConfig;
use mariposa::engine::engine::Engine;
use mariposa::engine::flow::{FlowController, FlowEvent};
use mariposa::engine::llm_client::{Assistant, ChatCompletionClient};
use mariposa::engine::protocol::{EngineCommand, EngineResponse};
use mariposa::model::message::{ChatMessage, ChatSender};
use mariposa::model::session::CheckpointKind;

use crate::ui::center_panel::draw_center_panel;
use crate::ui::right_panel::draw_chat_panel;
use crate::ui::settings::UiSettings;
use crate::ui::settings_io::load_settings;
use crate::ui::top_panel::draw_top_panel;

/// How often to look for assistant replies while one is outstanding.
const REPLY_POLL: Duration = Duration::from_millis(150);

/* =========================
   UI State
   ========================= */

#[derive(Default)]
pub struct UiState {
    pub chat_input: String,
    pub intake_error: Option<String>,
    pub checkpoint_rating: i32,
    pub should_auto_scroll: bool,
    pub show_settings: bool,
}

/* =========================
   App
   ========================= */

pub struct MariposaApp {
    pub flow: FlowController,
    pub ui: UiState,
    pub settings: UiSettings,

    cmd_tx: mpsc::Sender<EngineCommand>,
    resp_rx: mpsc::Receiver<EngineResponse>,
}

impl MariposaApp {
    pub fn new(config: &AppConfig) -> Self {
        let library = Arc::new(config.library());
        let assistant = build_assistant(config);
        let flow = FlowController::new(library.clone(), assistant.is_some());

        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (resp_tx, resp_rx) = mpsc::channel();

        std::thread::spawn(move || {
            let mut engine = Engine::new(cmd_rx, resp_tx, assistant, library);
            engine.run();
        });

        let mut app = Self {
            flow,
            ui: UiState::default(),
            settings: load_settings(),
            cmd_tx,
            resp_rx,
        };
        let events = app.flow.open();
        app.dispatch(events);
        app
    }

    pub fn send_command(&self, cmd: EngineCommand) {
        if self.cmd_tx.send(cmd).is_err() {
            warn!("engine thread is gone");
        }
    }

    /// Carries out what the flow controller asked for.
    pub fn dispatch(&mut self, events: Vec<FlowEvent>) {
        for event in events {
            match event {
                FlowEvent::Prompt { epoch, text } => {
                    self.send_command(EngineCommand::Narrate { epoch, prompt: text });
                    self.ui.should_auto_scroll = true;
                }
                FlowEvent::RequestPlan { epoch, record } => {
                    self.send_command(EngineCommand::GeneratePlan { epoch, record });
                }
                FlowEvent::Reset => {
                    self.send_command(EngineCommand::Reset { epoch: self.flow.epoch() });
                    self.ui.chat_input.clear();
                }
                FlowEvent::ScreenChanged(_) => {
                    self.ui.intake_error = None;
                }
                FlowEvent::CheckpointOpened(kind) => {
                    self.ui.checkpoint_rating = self
                        .flow
                        .playback()
                        .map(|p| match kind {
                            CheckpointKind::Intensity => i32::from(p.suds()),
                            CheckpointKind::Validity => i32::from(p.voc()),
                        })
                        .unwrap_or_default();
                }
                FlowEvent::ProtocolEntered(_) | FlowEvent::SessionCompleted(_) => {}
            }
        }
    }

    fn drain_responses(&mut self) {
        while let Ok(resp) = self.resp_rx.try_recv() {
            match resp {
                EngineResponse::Narration { epoch, text } => {
                    self.flow.receive_narration(epoch, text);
                    self.ui.should_auto_scroll = true;
                }
                EngineResponse::NarrationFailed { epoch } => {
                    self.flow.narration_failed(epoch);
                }
                EngineResponse::PlanReady { epoch, outcome } => {
                    let events = self.flow.apply_plan(epoch, outcome, Instant::now());
                    self.dispatch(events);
                }
            }
        }
    }

    fn schedule_repaint(&self, ctx: &egui::Context) {
        if let Some(due) = self.flow.next_deadline() {
            ctx.request_repaint_after(due.saturating_duration_since(Instant::now()));
        }
        if self.flow.assistant_busy() || self.flow.waiting_for_plan() {
            ctx.request_repaint_after(REPLY_POLL);
        }
    }

    pub fn draw_message(&self, ui: &mut egui::Ui, msg: &ChatMessage) {
        let bg = self.settings.color(msg.sender);

        ui.add_space(6.0);

        if msg.sender == ChatSender::User {
            ui.with_layout(Layout::right_to_left(egui::Align::TOP), |ui| {
                bubble(ui, bg, &msg.text);
            });
        } else {
            bubble(ui, bg, &msg.text);
        }
    }
}

fn build_assistant(config: &AppConfig) -> Option<Box<dyn Assistant + Send>> {
    if !config.assistant_enabled() {
        info!("no assistant endpoint configured, assistant disabled");
        return None;
    }
    let key = config.api_key();
    if key.is_none() {
        debug!(variable = %config.assistant.api_key_env, "no API key, sending unauthenticated requests");
    }
    match ChatCompletionClient::new(&config.assistant, key) {
        Ok(client) => Some(Box::new(client)),
        Err(err) => {
            warn!(error = %format!("{err:#}"), "assistant disabled");
            None
        }
    }
}

/* =========================
   egui App
   ========================= */

impl eframe::App for MariposaApp {
    fn update(&mut self, ctx: &egui::Context, _: &mut eframe::Frame) {
        ctx.set_pixels_per_point(self.settings.ui_scale);

        self.drain_responses();
        let events = self.flow.tick(Instant::now());
        self.dispatch(events);

        draw_top_panel(ctx, self);
        if self.settings.show_chat {
            draw_chat_panel(ctx, self);
        }
        draw_center_panel(ctx, self);

        self.schedule_repaint(ctx);
    }
}

/* =========================
   UI Helpers
   ========================= */

pub fn bubble(ui: &mut egui::Ui, color: egui::Color32, text: &str) {
    egui::Frame::new()
        .fill(color)
        .corner_radius(egui::CornerRadius::same(8))
        .inner_margin(egui::Margin::symmetric(10, 6))
        .show(ui, |ui| {
            ui.label(egui::RichText::new(text).color(egui::Color32::WHITE));
        });
}

/// Rounded card used for screen sections.
pub fn card<R>(ui: &mut egui::Ui, fill: egui::Color32, add: impl FnOnce(&mut egui::Ui) -> R) -> R {
    egui::Frame::new()
        .fill(fill)
        .corner_radius(egui::CornerRadius::same(10))
        .inner_margin(egui::Margin::same(14))
        .show(ui, add)
        .inner
}
