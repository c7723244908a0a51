use eframe::egui;

use mariposa::model::message::ChatSender;

use super::app::MariposaApp;
use super::settings_io::save_settings;

pub fn draw_top_panel(ctx: &egui::Context, app: &mut MariposaApp) {
    egui::TopBottomPanel::top("top").show(ctx, |ui| {
        ui.horizontal(|ui| {
            ui.strong("🦋 Método de Mariposa");
            ui.separator();

            if ui.button("Reiniciar").clicked() {
                let events = app.flow.restart();
                app.dispatch(events);
            }

            let chat_label = if app.settings.show_chat { "Ocultar chat" } else { "Mostrar chat" };
            if ui.button(chat_label).clicked() {
                app.settings.show_chat = !app.settings.show_chat;
                save_settings(&app.settings);
            }

            if ui.button("Ajustes").clicked() {
                app.ui.show_settings = !app.ui.show_settings;
            }
        });
    });

    if app.ui.show_settings {
        draw_settings_window(ctx, app);
    }
}

fn draw_settings_window(ctx: &egui::Context, app: &mut MariposaApp) {
    let mut open = app.ui.show_settings;
    let mut changed = false;

    egui::Window::new("Ajustes")
        .open(&mut open)
        .resizable(false)
        .collapsible(false)
        .show(ctx, |ui| {
            ui.label("Escala de la interfaz");
            changed |= ui
                .add(egui::Slider::new(&mut app.settings.ui_scale, 0.75..=2.0))
                .changed();

            ui.separator();
            ui.label("Colores del chat");
            for (sender, label) in [(ChatSender::Assistant, "Asistente"), (ChatSender::User, "Tú")] {
                let mut color = app.settings.color(sender);
                ui.horizontal(|ui| {
                    ui.label(label);
                    if ui.color_edit_button_srgba(&mut color).changed() {
                        app.settings.set_color(sender, color);
                        changed = true;
                    }
                });
            }
        });

    app.ui.show_settings = open;
    if changed {
        save_settings(&app.settings);
    }
}
