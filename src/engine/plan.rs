use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::content::{default_plan, ContentLibrary};
use crate::engine::llm_client::Assistant;
use crate::engine::prompt_builder::PromptBuilder;
use crate::error::PlanError;
use crate::model::evaluation::EvaluationRecord;
use crate::model::protocol::PlanSequence;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanSource {
    Personalized,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanOutcome {
    pub plan: PlanSequence,
    pub source: PlanSource,
}

impl PlanOutcome {
    pub fn fallback() -> Self {
        Self {
            plan: default_plan(),
            source: PlanSource::Fallback,
        }
    }
}

/// Asks the assistant for a personalized protocol order.
///
/// Any failure (no assistant, transport error, unparsable or unknown
/// identifiers) yields the default sequence, never a partial plan.
pub fn generate_plan(
    assistant: Option<&mut dyn Assistant>,
    record: &EvaluationRecord,
    library: &ContentLibrary,
) -> PlanOutcome {
    match request_plan(assistant, record, library) {
        Ok(plan) => {
            info!(plan = ?plan.ids(), "personalized plan accepted");
            PlanOutcome {
                plan,
                source: PlanSource::Personalized,
            }
        }
        Err(err) => {
            warn!(error = %err, "using default plan");
            PlanOutcome::fallback()
        }
    }
}

fn request_plan(
    assistant: Option<&mut dyn Assistant>,
    record: &EvaluationRecord,
    library: &ContentLibrary,
) -> Result<PlanSequence, PlanError> {
    let assistant = assistant.ok_or(PlanError::AssistantUnavailable)?;
    let prompt = PromptBuilder::plan_request(record);
    let reply = assistant
        .complete(&prompt)
        .map_err(|e| PlanError::Request(format!("{e:#}")))?;
    parse_plan(&reply, library)
}

/// Strict parse: a JSON array of strings, every one playable.
/// Markdown code fences around the array are tolerated.
pub fn parse_plan(reply: &str, library: &ContentLibrary) -> Result<PlanSequence, PlanError> {
    let cleaned = reply.replace("```json", "").replace("```", "");
    let ids: Vec<String> = serde_json::from_str(cleaned.trim())?;

    if let Some(unknown) = ids.iter().find(|id| !library.is_playable(id)) {
        return Err(PlanError::UnknownProtocol(unknown.clone()));
    }

    PlanSequence::new(ids).ok_or(PlanError::Empty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::DEFAULT_SEQUENCE;
    use crate::model::evaluation::Emotion;

    /// Replays canned replies in order.
    struct ScriptedAssistant {
        replies: Vec<anyhow::Result<String>>,
        prompts: Vec<String>,
    }

    impl ScriptedAssistant {
        fn new(replies: Vec<anyhow::Result<String>>) -> Self {
            Self {
                replies,
                prompts: Vec::new(),
            }
        }
    }

    impl Assistant for ScriptedAssistant {
        fn complete(&mut self, prompt: &str) -> anyhow::Result<String> {
            self.prompts.push(prompt.to_string());
            if self.replies.is_empty() {
                anyhow::bail!("no more replies");
            }
            self.replies.remove(0)
        }

        fn reset(&mut self) {}
    }

    fn record() -> EvaluationRecord {
        EvaluationRecord {
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
        }
    }

    fn assert_fallback(outcome: &PlanOutcome) {
        assert_eq!(outcome.source, PlanSource::Fallback);
        assert_eq!(outcome.plan.ids(), DEFAULT_SEQUENCE);
    }

    #[test]
    fn accepts_fenced_plan_with_sub_protocol() {
        let mut assistant = ScriptedAssistant::new(vec![Ok(
            "```json\n[\"A\", \"B\", \"G3\", \"C\", \"D\", \"E\", \"F\", \"H\"]\n```".into(),
        )]);
        let outcome = generate_plan(Some(&mut assistant), &record(), ContentLibrary::standard());

        assert_eq!(outcome.source, PlanSource::Personalized);
        assert_eq!(outcome.plan.ids(), ["A", "B", "G3", "C", "D", "E", "F", "H"]);
        assert!(assistant.prompts[0].contains("\"negativeBelief\":\"no soy suficiente\""));
    }

    #[test]
    fn no_assistant_falls_back() {
        assert_fallback(&generate_plan(None, &record(), ContentLibrary::standard()));
    }

    #[test]
    fn request_failure_falls_back() {
        let mut assistant = ScriptedAssistant::new(vec![Err(anyhow::anyhow!("timeout"))]);
        assert_fallback(&generate_plan(Some(&mut assistant), &record(), ContentLibrary::standard()));
    }

    #[test]
    fn malformed_replies_fall_back() {
        for reply in [
            "Te propongo empezar por A",
            "{\"plan\": [\"A\"]}",
            "[\"A\", 3]",
            "[]",
            "[\"A\", \"Z\"]",
            "[\"A\", \"G\"]",
        ] {
            let mut assistant = ScriptedAssistant::new(vec![Ok(reply.to_string())]);
            let outcome = generate_plan(Some(&mut assistant), &record(), ContentLibrary::standard());
            assert_fallback(&outcome);
        }
    }

    #[test]
    fn parse_reports_reason() {
        let library = ContentLibrary::standard();
        assert!(matches!(parse_plan("[]", library), Err(PlanError::Empty)));
        assert!(matches!(
            parse_plan("[\"Q\"]", library),
            Err(PlanError::UnknownProtocol(id)) if id == "Q"
        ));
        assert!(matches!(parse_plan("nope", library), Err(PlanError::Malformed(_))));
    }
}
