use eframe::egui;

use super::app::MariposaApp;

pub fn draw_chat_panel(ctx: &egui::Context, app: &mut MariposaApp) {
    let input_id = egui::Id::new("chat_input_box");

    egui::SidePanel::right("chat")
        .resizable(true)
        .default_width(340.0)
        .min_width(260.0)
        .show(ctx, |ui| {
            ui.heading("Asistente de Mariposa");
            ui.separator();

            // ---------- Input bar ----------
            egui::TopBottomPanel::bottom("chat_input").show_inside(ui, |ui| {
                let mut send_now = false;

                ui.horizontal(|ui| {
                    let response = ui.add_sized(
                        [ui.available_width() - 70.0, 48.0],
                        egui::TextEdit::multiline(&mut app.ui.chat_input)
                            .id(input_id)
                            .hint_text("Escribe tu mensaje..."),
                    );

                    // Enter sends, Shift+Enter breaks the line
                    if response.has_focus()
                        && ui.input(|i| i.key_pressed(egui::Key::Enter) && !i.modifiers.shift)
                    {
                        send_now = true;
                    }

                    if ui.button("Enviar").clicked() {
                        send_now = true;
                    }
                });

                if send_now {
                    let text = app.ui.chat_input.trim().to_string();
                    app.ui.chat_input.clear();

                    let events = app.flow.user_message(&text);
                    app.dispatch(events);
                    app.ui.should_auto_scroll = true;

                    ui.memory_mut(|m| m.request_focus(input_id));
                }
            });

            // ---------- History ----------
            egui::ScrollArea::vertical()
                .stick_to_bottom(app.ui.should_auto_scroll)
                .show(ui, |ui| {
                    for msg in app.flow.chat() {
                        app.draw_message(ui, msg);
                    }
                    if app.flow.assistant_busy() {
                        ui.add_space(6.0);
                        ui.horizontal(|ui| {
                            ui.spinner();
                            ui.weak("Escribiendo...");
                        });
                    }
                });
        });

    app.ui.should_auto_scroll = false;
}
