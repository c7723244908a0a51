use serde::{Deserialize, Serialize};

pub const SUDS_MIN: u8 = 0;
pub const SUDS_MAX: u8 = 10;
pub const VOC_MIN: u8 = 1;
pub const VOC_MAX: u8 = 7;

/// Intensity the slider starts at before the user moves it.
pub const DEFAULT_SUDS: u8 = 5;

pub fn clamp_suds(value: i32) -> u8 {
    value.clamp(SUDS_MIN as i32, SUDS_MAX as i32) as u8
}

pub fn clamp_voc(value: i32) -> u8 {
    value.clamp(VOC_MIN as i32, VOC_MAX as i32) as u8
}

/* =========================
   Emotion
   ========================= */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Emotion {
    #[serde(rename = "Desolación")]
    Desolacion,
    #[serde(rename = "Miedo")]
    Miedo,
    #[serde(rename = "Ansiedad")]
    Ansiedad,
    #[serde(rename = "Vacío")]
    Vacio,
    #[serde(rename = "Tristeza")]
    Tristeza,
    #[serde(rename = "Enojo")]
    Enojo,
    #[serde(rename = "Vergüenza")]
    Verguenza,
    #[serde(rename = "Culpa")]
    Culpa,
    #[serde(rename = "Impotencia")]
    Impotencia,
}

impl Emotion {
    pub const ALL: [Emotion; 9] = [
        Emotion::Desolacion,
        Emotion::Miedo,
        Emotion::Ansiedad,
        Emotion::Vacio,
        Emotion::Tristeza,
        Emotion::Enojo,
        Emotion::Verguenza,
        Emotion::Culpa,
        Emotion::Impotencia,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Emotion::Desolacion => "Desolación",
            Emotion::Miedo => "Miedo",
            Emotion::Ansiedad => "Ansiedad",
            Emotion::Vacio => "Vacío",
            Emotion::Tristeza => "Tristeza",
            Emotion::Enojo => "Enojo",
            Emotion::Verguenza => "Vergüenza",
            Emotion::Culpa => "Culpa",
            Emotion::Impotencia => "Impotencia",
        }
    }

    pub fn from_label(label: &str) -> Option<Emotion> {
        let label = label.trim();
        Emotion::ALL.into_iter().find(|e| e.label() == label)
    }
}

/* =========================
   Intake
   ========================= */

/// The eight intake answers, in question order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IntakeField {
    Situation,
    Involved,
    Emotion,
    BodyLocation,
    Suds,
    FirstTime,
    FirstInvolved,
    NegativeBelief,
}

impl IntakeField {
    /// Name used by phrase placeholders and in the JSON sent to the assistant.
    pub fn key(&self) -> &'static str {
        match self {
            IntakeField::Situation => "situation",
            IntakeField::Involved => "involved",
            IntakeField::Emotion => "emotion",
            IntakeField::BodyLocation => "bodyLocation",
            IntakeField::Suds => "suds",
            IntakeField::FirstTime => "firstTime",
            IntakeField::FirstInvolved => "firstInvolved",
            IntakeField::NegativeBelief => "negativeBelief",
        }
    }
}

/// Answers collected so far. Nothing derived lives here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntakeDraft {
    pub situation: String,
    pub involved: String,
    pub emotion: Option<Emotion>,
    pub body_location: String,
    pub suds: u8,
    pub first_time: String,
    pub first_involved: String,
    pub negative_belief: String,
}

impl Default for IntakeDraft {
    fn default() -> Self {
        Self {
            situation: String::new(),
            involved: String::new(),
            emotion: None,
            body_location: String::new(),
            suds: DEFAULT_SUDS,
            first_time: String::new(),
            first_involved: String::new(),
            negative_belief: String::new(),
        }
    }
}

impl IntakeDraft {
    pub fn text(&self, field: IntakeField) -> Option<&str> {
        match field {
            IntakeField::Situation => Some(&self.situation),
            IntakeField::Involved => Some(&self.involved),
            IntakeField::BodyLocation => Some(&self.body_location),
            IntakeField::FirstTime => Some(&self.first_time),
            IntakeField::FirstInvolved => Some(&self.first_involved),
            IntakeField::NegativeBelief => Some(&self.negative_belief),
            IntakeField::Emotion | IntakeField::Suds => None,
        }
    }

    pub fn text_mut(&mut self, field: IntakeField) -> Option<&mut String> {
        match field {
            IntakeField::Situation => Some(&mut self.situation),
            IntakeField::Involved => Some(&mut self.involved),
            IntakeField::BodyLocation => Some(&mut self.body_location),
            IntakeField::FirstTime => Some(&mut self.first_time),
            IntakeField::FirstInvolved => Some(&mut self.first_involved),
            IntakeField::NegativeBelief => Some(&mut self.negative_belief),
            IntakeField::Emotion | IntakeField::Suds => None,
        }
    }

    pub fn is_answered(&self, field: IntakeField) -> bool {
        match field {
            IntakeField::Emotion => self.emotion.is_some(),
            IntakeField::Suds => self.suds <= SUDS_MAX,
            other => self
                .text(other)
                .map(|t| !t.trim().is_empty())
                .unwrap_or(false),
        }
    }
}

/* =========================
   Evaluation Record
   ========================= */

/// A finished intake. The derived fields exist only on this type, so a record
/// with a positive cognition is by construction a complete one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationRecord {
    pub situation: String,
    pub involved: String,
    pub emotion: Emotion,
    pub body_location: String,
    pub suds: u8,
    pub first_time: String,
    pub first_involved: String,
    pub negative_belief: String,
    pub positive_cognition: String,
    pub voc: u8,
}

impl EvaluationRecord {
    /// Looks a field up by its placeholder name.
    pub fn field(&self, name: &str) -> Option<String> {
        let value = match name {
            "situation" => self.situation.clone(),
            "involved" => self.involved.clone(),
            "emotion" => self.emotion.label().to_string(),
            "bodyLocation" => self.body_location.clone(),
            "suds" => self.suds.to_string(),
            "firstTime" => self.first_time.clone(),
            "firstInvolved" => self.first_involved.clone(),
            "negativeBelief" => self.negative_belief.clone(),
            "positiveCognition" => self.positive_cognition.clone(),
            "voc" => self.voc.to_string(),
            _ => return None,
        };
        Some(value)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_scales_to_their_ranges() {
        assert_eq!(clamp_suds(-3), 0);
        assert_eq!(clamp_suds(14), 10);
        assert_eq!(clamp_suds(7), 7);
        assert_eq!(clamp_voc(0), 1);
        assert_eq!(clamp_voc(9), 7);
    }

    #[test]
    fn emotion_labels_round_trip() {
        for emotion in Emotion::ALL {
            assert_eq!(Emotion::from_label(emotion.label()), Some(emotion));
        }
        assert_eq!(Emotion::from_label("Alegría"), None);
    }

    #[test]
    fn record_serializes_with_placeholder_names() {
        let record = EvaluationRecord {
            situation: "una crítica".into(),
            involved: "mi jefe".into(),
            emotion: Emotion::Vacio,
            body_location: "el pecho".into(),
            suds: 8,
            first_time: "en la escuela".into(),
            first_involved: "un profesor".into(),
            negative_belief: "no soy suficiente".into(),
            positive_cognition: "Soy suficiente tal como esto.".into(),
            voc: 1,
        };

        let json: serde_json::Value = serde_json::from_str(&record.to_json()).unwrap();
        assert_eq!(json["emotion"], "Vacío");
        assert_eq!(json["firstInvolved"], "un profesor");
        assert_eq!(record.field("bodyLocation").as_deref(), Some("el pecho"));
        assert_eq!(record.field("nope"), None);
    }

    #[test]
    fn blank_text_is_not_an_answer() {
        let mut draft = IntakeDraft::default();
        draft.situation = "   ".into();
        assert!(!draft.is_answered(IntakeField::Situation));
        assert!(draft.is_answered(IntakeField::Suds));
        assert!(!draft.is_answered(IntakeField::Emotion));
    }
}
