use tracing::debug;

use crate::content::{Question, QuestionKind, QUESTIONS};
use crate::error::IntakeError;
use crate::model::evaluation::{clamp_suds, Emotion, EvaluationRecord, IntakeDraft, IntakeField, VOC_MIN};

/// Keyword rules for the positive cognition, checked in order.
const COGNITION_RULES: [(&[&str], &str); 6] = [
    (&["no soy suficiente"], "Soy suficiente tal como esto."),
    (&["no merezco"], "Merezco amor, paz y éxito."),
    (&["defectuoso"], "Soy un ser humano completo y valioso."),
    (
        &["no puedo confiar"],
        "Puedo aprender a confiar en mí mismo y en los demás de forma segura.",
    ),
    (
        &["me abandonan", "me rechazan"],
        "Puedo construir relaciones seguras y soy digno de pertenencia.",
    ),
    (&["no tengo valor"], "Mi valor es intrínseco e incondicional."),
];

const FALLBACK_COGNITION: &str = "Soy capaz, valioso y merecedor de lo bueno.";

/// Counter-statement for a negative belief. First matching rule wins.
pub fn positive_cognition(negative_belief: &str) -> &'static str {
    let belief = negative_belief.to_lowercase();
    COGNITION_RULES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| belief.contains(k)))
        .map(|(_, affirmation)| *affirmation)
        .unwrap_or(FALLBACK_COGNITION)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Answer {
    Text(String),
    Emotion(Emotion),
    Scale(i32),
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// Moved forward to this step index.
    Advanced(usize),
    Completed(EvaluationRecord),
}

/// The eight-question intake, walked one step at a time.
#[derive(Debug, Clone, Default)]
pub struct EvaluationPipeline {
    step: usize,
    draft: IntakeDraft,
    finalized: bool,
}

impl EvaluationPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn total_steps(&self) -> usize {
        QUESTIONS.len()
    }

    pub fn question(&self) -> &'static Question {
        &QUESTIONS[self.step]
    }

    pub fn draft(&self) -> &IntakeDraft {
        &self.draft
    }

    #[cfg(test)]
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn is_last_step(&self) -> bool {
        self.step + 1 == QUESTIONS.len()
    }

    /// Records an answer for the current question without moving.
    pub fn answer(&mut self, answer: Answer) -> Result<(), IntakeError> {
        if self.finalized {
            return Err(IntakeError::AlreadyFinalized);
        }

        let question = self.question();
        match (question.kind, answer) {
            (QuestionKind::Text, Answer::Text(text)) => {
                if let Some(slot) = self.draft.text_mut(question.field) {
                    *slot = text;
                }
            }
            (QuestionKind::EmotionSelect, Answer::Emotion(emotion)) => {
                self.draft.emotion = Some(emotion);
            }
            (QuestionKind::Slider { .. }, Answer::Scale(value)) => {
                self.draft.suds = clamp_suds(value);
            }
            _ => return Err(IntakeError::WrongAnswerKind(question.field)),
        }
        Ok(())
    }

    /// Forward transition. Finalizes the record when leaving the last step.
    pub fn next(&mut self) -> Result<StepOutcome, IntakeError> {
        if self.finalized {
            return Err(IntakeError::AlreadyFinalized);
        }

        let field = self.question().field;
        if !self.draft.is_answered(field) {
            return Err(IntakeError::MissingAnswer(field));
        }

        if self.is_last_step() {
            let record = self.finalize()?;
            return Ok(StepOutcome::Completed(record));
        }

        self.step += 1;
        debug!(step = self.step, "intake step advanced");
        Ok(StepOutcome::Advanced(self.step))
    }

    /// Backward transition. Returns the new step, or `None` at the first step.
    pub fn back(&mut self) -> Option<usize> {
        if self.finalized || self.step == 0 {
            return None;
        }
        self.step -= 1;
        debug!(step = self.step, "intake step moved back");
        Some(self.step)
    }

    fn finalize(&mut self) -> Result<EvaluationRecord, IntakeError> {
        let draft = &self.draft;
        let emotion = draft
            .emotion
            .ok_or(IntakeError::MissingAnswer(IntakeField::Emotion))?;

        for question in QUESTIONS.iter() {
            if !draft.is_answered(question.field) {
                return Err(IntakeError::MissingAnswer(question.field));
            }
        }

        let record = EvaluationRecord {
            situation: draft.situation.trim().to_string(),
            involved: draft.involved.trim().to_string(),
            emotion,
            body_location: draft.body_location.trim().to_string(),
            suds: draft.suds,
            first_time: draft.first_time.trim().to_string(),
            first_involved: draft.first_involved.trim().to_string(),
            negative_belief: draft.negative_belief.trim().to_string(),
            positive_cognition: positive_cognition(&draft.negative_belief).to_string(),
            voc: VOC_MIN,
        };

        self.finalized = true;
        debug!("intake finalized");
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer_all(pipeline: &mut EvaluationPipeline, belief: &str) -> StepOutcome {
        let answers = [
            Answer::Text("Una crítica en el trabajo".into()),
            Answer::Text("Mi jefe".into()),
            Answer::Emotion(Emotion::Vacio),
            Answer::Text("En el pecho".into()),
            Answer::Scale(8),
            Answer::Text("En la escuela".into()),
            Answer::Text("Un profesor".into()),
            Answer::Text(belief.into()),
        ];

        let mut last = None;
        for answer in answers {
            pipeline.answer(answer).unwrap();
            last = Some(pipeline.next().unwrap());
        }
        last.unwrap()
    }

    #[test]
    fn keyword_rules_first_match_wins() {
        assert_eq!(positive_cognition("No soy suficiente"), "Soy suficiente tal como esto.");
        assert_eq!(positive_cognition("no merezco amor"), "Merezco amor, paz y éxito.");
        assert_eq!(
            positive_cognition("Siempre me RECHAZAN"),
            "Puedo construir relaciones seguras y soy digno de pertenencia."
        );
        // Both rules match; the earlier one wins.
        assert_eq!(
            positive_cognition("no soy suficiente y no merezco nada"),
            "Soy suficiente tal como esto."
        );
        assert_eq!(positive_cognition("todo me sale mal"), FALLBACK_COGNITION);
    }

    #[test]
    fn completes_with_derived_fields() {
        let mut pipeline = EvaluationPipeline::new();
        let StepOutcome::Completed(record) = answer_all(&mut pipeline, "no soy suficiente") else {
            panic!("expected completion");
        };

        assert_eq!(record.emotion, Emotion::Vacio);
        assert_eq!(record.positive_cognition, "Soy suficiente tal como esto.");
        assert_eq!(record.voc, 1);
        assert_eq!(record.suds, 8);
        assert!(pipeline.is_finalized());
    }

    #[test]
    fn finalization_runs_once() {
        let mut pipeline = EvaluationPipeline::new();
        answer_all(&mut pipeline, "soy defectuoso");
        assert_eq!(pipeline.next(), Err(IntakeError::AlreadyFinalized));
        assert_eq!(pipeline.back(), None);
    }

    #[test]
    fn next_requires_an_answer() {
        let mut pipeline = EvaluationPipeline::new();
        assert_eq!(
            pipeline.next(),
            Err(IntakeError::MissingAnswer(IntakeField::Situation))
        );
        pipeline.answer(Answer::Text("   ".into())).unwrap();
        assert!(pipeline.next().is_err());
        assert_eq!(pipeline.step(), 0);
    }

    #[test]
    fn wrong_answer_kind_is_rejected() {
        let mut pipeline = EvaluationPipeline::new();
        assert_eq!(
            pipeline.answer(Answer::Scale(3)),
            Err(IntakeError::WrongAnswerKind(IntakeField::Situation))
        );
    }

    #[test]
    fn slider_has_a_default_and_clamps() {
        let mut pipeline = EvaluationPipeline::new();
        for answer in [
            Answer::Text("a".into()),
            Answer::Text("b".into()),
            Answer::Emotion(Emotion::Miedo),
            Answer::Text("c".into()),
        ] {
            pipeline.answer(answer).unwrap();
            pipeline.next().unwrap();
        }
        assert_eq!(pipeline.draft().suds, 5);
        pipeline.answer(Answer::Scale(42)).unwrap();
        assert_eq!(pipeline.draft().suds, 10);
        assert_eq!(pipeline.next(), Ok(StepOutcome::Advanced(5)));
    }

    #[test]
    fn back_keeps_answers() {
        let mut pipeline = EvaluationPipeline::new();
        assert_eq!(pipeline.back(), None);

        pipeline.answer(Answer::Text("Una discusión".into())).unwrap();
        pipeline.next().unwrap();
        assert_eq!(pipeline.back(), Some(0));
        assert_eq!(pipeline.draft().situation, "Una discusión");
        assert_eq!(pipeline.next(), Ok(StepOutcome::Advanced(1)));
    }
}
