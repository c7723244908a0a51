use std::time::Instant;

use eframe::egui;
use egui::{Color32, RichText};

use mariposa::content::{QuestionKind, CRISIS_SUB_PROTOCOL};
use mariposa::engine::evaluation::Answer;
use mariposa::engine::interpolate::interpolate;
use mariposa::engine::playback::{PlaybackState, PlaybackView};
use mariposa::model::evaluation::{Emotion, EvaluationRecord, SUDS_MAX, SUDS_MIN, VOC_MAX, VOC_MIN};
use mariposa::model::session::{CheckpointKind, Screen};

use super::app::{card, MariposaApp};

const ACCENT: Color32 = Color32::from_rgb(124, 58, 237);
const MUTED: Color32 = Color32::from_rgb(241, 245, 249);
const SOFT_ACCENT: Color32 = Color32::from_rgb(237, 233, 254);
const CRISIS: Color32 = Color32::from_rgb(255, 241, 242);

pub fn draw_center_panel(ctx: &egui::Context, app: &mut MariposaApp) {
    egui::CentralPanel::default().show(ctx, |ui| {
        egui::ScrollArea::vertical().show(ui, |ui| {
            ui.vertical_centered(|ui| {
                ui.set_max_width(720.0);
                match app.flow.screen() {
                    Screen::Welcome => draw_welcome(ui, app),
                    Screen::Evaluation => draw_evaluation(ui, app),
                    Screen::Mapping => draw_mapping(ui, app),
                    Screen::Session => draw_session(ui, app),
                    Screen::Summary => draw_summary(ui, app),
                }
            });
        });
    });

    if let Some(PlaybackState::AwaitingCheckpoint(kind)) = app.flow.playback().map(|p| p.state()) {
        draw_checkpoint(ctx, app, kind);
    }
}

fn primary_button(ui: &mut egui::Ui, text: &str) -> bool {
    ui.add(egui::Button::new(RichText::new(text).size(18.0).color(Color32::WHITE)).fill(ACCENT))
        .clicked()
}

/* =========================
   Welcome
   ========================= */

fn draw_welcome(ui: &mut egui::Ui, app: &mut MariposaApp) {
    ui.add_space(40.0);
    ui.label(RichText::new("🦋").size(48.0));
    ui.heading(RichText::new("Método de Mariposa").size(36.0));
    ui.add_space(8.0);
    ui.label(RichText::new("Un sistema de transformación para sanar heridas del pasado.").size(18.0));
    ui.add_space(8.0);
    ui.label(
        "Este es un espacio seguro para explorar lo que estás sintiendo. A través de un proceso guiado, \
conectaremos las dificultades presentes con sus raíces para facilitar una sanación profunda y duradera.",
    );
    ui.add_space(24.0);

    if primary_button(ui, "Comenzar Proceso") {
        let events = app.flow.start(Instant::now());
        app.dispatch(events);
    }
}

/* =========================
   Evaluation
   ========================= */

fn draw_evaluation(ui: &mut egui::Ui, app: &mut MariposaApp) {
    let intake = app.flow.intake();
    let step = intake.step();
    let total = intake.total_steps();
    let is_last = intake.is_last_step();
    let question = *intake.question();
    let draft = intake.draft().clone();

    ui.heading("Evaluación Inicial");
    ui.add(
        egui::ProgressBar::new((step + 1) as f32 / total as f32)
            .text(format!("{} / {}", step + 1, total))
            .fill(ACCENT),
    );
    ui.add_space(16.0);
    ui.label(RichText::new(question.label).size(20.0).strong());
    ui.add_space(8.0);

    let mut answer = None;
    match question.kind {
        QuestionKind::Text => {
            let mut text = draft.text(question.field).unwrap_or_default().to_string();
            let edit = egui::TextEdit::multiline(&mut text)
                .hint_text(question.placeholder)
                .desired_width(f32::INFINITY)
                .desired_rows(3);
            if ui.add(edit).changed() {
                answer = Some(Answer::Text(text));
            }
        }
        QuestionKind::EmotionSelect => {
            let mut selected = draft.emotion;
            egui::ComboBox::from_id_salt("emotion")
                .width(280.0)
                .selected_text(selected.map(|e| e.label()).unwrap_or("Selecciona una emoción..."))
                .show_ui(ui, |ui| {
                    for emotion in Emotion::ALL {
                        ui.selectable_value(&mut selected, Some(emotion), emotion.label());
                    }
                });
            if selected != draft.emotion {
                answer = selected.map(Answer::Emotion);
            }
        }
        QuestionKind::Slider { min, max } => {
            let mut value = i32::from(draft.suds);
            if ui
                .add(egui::Slider::new(&mut value, i32::from(min)..=i32::from(max)))
                .changed()
            {
                answer = Some(Answer::Scale(value));
            }
        }
    }

    if let Some(answer) = answer {
        app.ui.intake_error = app.flow.answer(answer).err().map(|e| e.to_string());
    }
    if let Some(err) = &app.ui.intake_error {
        ui.colored_label(Color32::from_rgb(190, 18, 60), err);
    }

    ui.add_space(16.0);
    ui.horizontal(|ui| {
        if ui.add_enabled(step > 0, egui::Button::new("Atrás")).clicked() {
            let events = app.flow.previous_question();
            app.dispatch(events);
        }

        let label = if is_last { "Finalizar Evaluación" } else { "Siguiente" };
        if primary_button(ui, label) {
            match app.flow.next_question(Instant::now()) {
                Ok(events) => app.dispatch(events),
                Err(err) => app.ui.intake_error = Some(err.to_string()),
            }
        }
    });
}

/* =========================
   Mapping
   ========================= */

fn draw_mapping(ui: &mut egui::Ui, app: &mut MariposaApp) {
    let Some(record) = app.flow.record().cloned() else {
        return;
    };

    ui.heading(RichText::new("Mapeo de Conexiones").size(30.0));
    ui.add_space(8.0);
    ui.label(format!(
        "Lo que estás sintiendo con \"{}\" no es solo sobre eso. Tu sistema está recordando una herida más antigua.",
        record.situation
    ));
    ui.add_space(12.0);

    ui.columns(2, |cols| {
        card(&mut cols[0], MUTED, |ui| {
            ui.label(RichText::new("Disparador Actual").size(18.0).strong());
            ui.label(format!("Situación: {}", record.situation));
            ui.label(format!("Emoción: {} (Intensidad: {}/{})", record.emotion.label(), record.suds, SUDS_MAX));
            ui.label(format!("Creencia Activada: \"{}\"", record.negative_belief));
        });
        card(&mut cols[1], SOFT_ACCENT, |ui| {
            ui.label(RichText::new("Herida Original").size(18.0).strong());
            ui.label(format!("Experiencia: {}", record.first_time));
            ui.label(format!("Involucrado: {}", record.first_involved));
            ui.label(format!("Creencia Formada: \"{}\"", record.negative_belief));
        });
    });

    ui.add_space(16.0);
    ui.label(
        RichText::new(
            "La situación actual actúa como un espejo de la herida original. \
Ahora, vamos a trabajar con ambas capas para sanar desde la raíz.",
        )
        .size(18.0),
    );
    ui.add_space(16.0);

    if primary_button(ui, "Iniciar Sesión de Mariposa") {
        let events = app.flow.begin_session(Instant::now());
        app.dispatch(events);
    }
}

/* =========================
   Session
   ========================= */

fn draw_session(ui: &mut egui::Ui, app: &mut MariposaApp) {
    let view = app
        .flow
        .playback()
        .zip(app.flow.record())
        .map(|(playback, record)| playback.view(record, app.flow.constants()));

    let Some(view) = view else {
        ui.add_space(40.0);
        ui.spinner();
        ui.label("Preparando tu plan de sanación...");
        return;
    };

    ui.add(egui::ProgressBar::new(view.progress).fill(ACCENT));
    ui.add_space(12.0);
    ui.label(RichText::new(&view.protocol_name).color(ACCENT).strong());
    ui.weak(&view.description);
    ui.weak(format!(
        "Protocolo {} de {} · frase {} de {}",
        view.protocol_index + 1,
        view.protocol_count,
        view.phrase_index + 1,
        view.phrase_count
    ));
    ui.add_space(12.0);

    draw_tapping(ui, &view);

    card(ui, MUTED, |ui| {
        ui.set_min_height(100.0);
        ui.vertical_centered(|ui| {
            ui.add_space(20.0);
            ui.label(RichText::new(&view.phrase).size(24.0));
        });
    });
    ui.add_space(16.0);

    ui.horizontal(|ui| {
        let paused = view.state == PlaybackState::Paused;
        if primary_button(ui, if paused { "Continuar" } else { "Pausar" }) {
            let events = app.flow.toggle_pause(Instant::now());
            app.dispatch(events);
        }
        let can_advance = matches!(view.state, PlaybackState::Running | PlaybackState::Paused);
        if ui.add_enabled(can_advance, egui::Button::new("Siguiente frase")).clicked() {
            let events = app.flow.advance(Instant::now());
            app.dispatch(events);
        }
    });
}

/// Left/right hands, highlighted while running.
fn draw_tapping(ui: &mut egui::Ui, view: &PlaybackView) {
    let running = view.state == PlaybackState::Running;
    let lit = if view.phrase_index % 2 == 0 { 0 } else { 1 };
    ui.horizontal(|ui| {
        for side in 0..2 {
            let color = if running && side == lit { ACCENT } else { Color32::GRAY };
            ui.label(RichText::new("✋").size(32.0).color(color));
        }
    });
    ui.add_space(8.0);
}

fn draw_checkpoint(ctx: &egui::Context, app: &mut MariposaApp, kind: CheckpointKind) {
    let positive_cognition = app
        .flow
        .record()
        .map(|r| r.positive_cognition.clone())
        .unwrap_or_default();

    let (title, range, button) = match kind {
        CheckpointKind::Intensity => (
            "Comprobación de Progreso (SUDS)",
            i32::from(SUDS_MIN)..=i32::from(SUDS_MAX),
            "Continuar Sesión",
        ),
        CheckpointKind::Validity => (
            "Comprobación de Creencia (VoC)",
            i32::from(VOC_MIN)..=i32::from(VOC_MAX),
            "Finalizar Sesión",
        ),
    };

    let mut submit = false;
    egui::Window::new(title)
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .show(ctx, |ui| {
            match kind {
                CheckpointKind::Intensity => {
                    ui.label(
                        "Has procesado una parte importante. Vuelve a conectar con la situación inicial. \
En una escala de 0-10, ¿qué tan intensa es la emoción ahora?",
                    );
                }
                CheckpointKind::Validity => {
                    ui.label("Ahora, considera la frase positiva:");
                    ui.label(RichText::new(format!("\"{positive_cognition}\"")).italics().color(ACCENT));
                    ui.label(
                        "En una escala de 1 (totalmente falsa) a 7 (totalmente verdadera), \
¿qué tan verdadera se siente ahora?",
                    );
                }
            }
            ui.add(egui::Slider::new(&mut app.ui.checkpoint_rating, range));
            ui.add_space(8.0);
            submit = primary_button(ui, button);
        });

    if submit {
        let events = app.flow.submit_checkpoint(app.ui.checkpoint_rating, Instant::now());
        app.dispatch(events);
    }
}

/* =========================
   Summary
   ========================= */

fn draw_summary(ui: &mut egui::Ui, app: &mut MariposaApp) {
    let (Some(record), Some(report)) = (app.flow.record().cloned(), app.flow.report()) else {
        return;
    };

    ui.heading(RichText::new("Resumen de la Sesión").size(30.0));
    ui.label("Has hecho un trabajo valiente y profundo hoy. Aquí está tu progreso.");
    ui.add_space(12.0);

    ui.columns(2, |cols| {
        card(&mut cols[0], MUTED, |ui| {
            ui.label(RichText::new("Intensidad de la Emoción (SUDS)").strong());
            ui.weak("Escala de Unidades Subjetivas de Angustia (0-10)");
            before_after(ui, report.suds_start, report.suds_end);
        });
        card(&mut cols[1], MUTED, |ui| {
            ui.label(RichText::new("Validez de la Cognición (VoC)").strong());
            ui.weak("Qué tan verdadera se siente la frase (1-7):");
            ui.label(RichText::new(format!("\"{}\"", record.positive_cognition)).italics());
            before_after(ui, report.voc_start, report.voc_end);
        });
    });
    ui.add_space(12.0);

    card(ui, SOFT_ACCENT, |ui| {
        ui.label(RichText::new("Próximos Pasos y Mantenimiento").size(20.0).strong().color(ACCENT));
        ui.add_space(6.0);
        ui.label(RichText::new("Práctica Matutina (3 min)").strong());
        ui.label(
            "Al despertar, haz unas palmaditas mientras afirmas: \"Hoy es un nuevo día. \
Elijo actuar desde mi fortaleza adulta, no desde mis heridas pasadas.\"",
        );
        ui.add_space(6.0);
        ui.label(RichText::new("Práctica Nocturna (5 min)").strong());
        ui.label(
            "Antes de dormir, procesa tu día con compasión. \"Hoy hice lo mejor que pude. \
Sostengo a mi parte herida con amor. Descanso en paz.\"",
        );
        ui.add_space(6.0);
        draw_crisis_card(ui, app, &record);
    });

    ui.add_space(12.0);
    ui.label(
        "La sanación es un proceso. Sé amable contigo mismo/a y continúa practicando. \
Cada paso es un progreso.",
    );
    ui.add_space(12.0);

    if primary_button(ui, "Realizar otra sesión") {
        let events = app.flow.restart();
        app.dispatch(events);
    }
}

fn before_after(ui: &mut egui::Ui, start: u8, end: u8) {
    ui.horizontal(|ui| {
        ui.label(RichText::new(start.to_string()).size(36.0).color(Color32::GRAY));
        ui.label(RichText::new("→").size(24.0));
        ui.label(RichText::new(end.to_string()).size(36.0).color(ACCENT));
    });
}

/// Quick crisis protocol, shown only if the library still has it.
fn draw_crisis_card(ui: &mut egui::Ui, app: &MariposaApp, record: &EvaluationRecord) {
    let (parent, id) = CRISIS_SUB_PROTOCOL;
    let Some(crisis) = app.flow.library().sub_protocol(parent, id) else {
        return;
    };

    card(ui, CRISIS, |ui| {
        ui.label(RichText::new("Protocolo Rápido de Crisis").strong().color(Color32::from_rgb(159, 18, 57)));
        ui.weak(&crisis.name);
        ui.label("Si sientes una activación intensa, recuerda:");
        for line in &crisis.template {
            ui.label(format!("• {}", interpolate(line, record, app.flow.constants())));
        }
    });
}
