use std::collections::HashMap;

use egui::Color32;
use serde::{Deserialize, Serialize};

use mariposa::model::message::ChatSender;

#[derive(Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct UiSettings {
    pub ui_scale: f32,
    pub show_chat: bool,

    // Chat sender → bubble color
    pub sender_colors: HashMap<String, [u8; 4]>,
}

impl Default for UiSettings {
    fn default() -> Self {
        let mut sender_colors = HashMap::new();

        sender_colors.insert(sender_key(ChatSender::User).into(), [40, 70, 120, 255]);
        sender_colors.insert(sender_key(ChatSender::Assistant).into(), [88, 60, 140, 255]);

        Self {
            ui_scale: 1.0,
            show_chat: true,
            sender_colors,
        }
    }
}

impl UiSettings {
    pub fn color(&self, sender: ChatSender) -> Color32 {
        self.sender_colors
            .get(sender_key(sender))
            .map(|c| Color32::from_rgba_unmultiplied(c[0], c[1], c[2], c[3]))
            .unwrap_or(Color32::DARK_GRAY)
    }

    pub fn set_color(&mut self, sender: ChatSender, color: Color32) {
        self.sender_colors.insert(
            sender_key(sender).to_string(),
            [color.r(), color.g(), color.b(), color.a()],
        );
    }
}

fn sender_key(sender: ChatSender) -> &'static str {
    match sender {
        ChatSender::Assistant => "assistant",
        ChatSender::User => "user",
    }
}
