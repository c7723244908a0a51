use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::content::ContentLibrary;
use crate::engine::llm_client::Assistant;
use crate::engine::plan::generate_plan;
use crate::engine::protocol::{EngineCommand, EngineResponse};

/// Runs assistant requests off the UI thread, one at a time.
pub struct Engine {
    rx: Receiver<EngineCommand>,
    tx: Sender<EngineResponse>,
    assistant: Option<Box<dyn Assistant + Send>>,
    library: Arc<ContentLibrary>,
    epoch: u64,
}

impl Engine {
    pub fn new(
        rx: Receiver<EngineCommand>,
        tx: Sender<EngineResponse>,
        assistant: Option<Box<dyn Assistant + Send>>,
        library: Arc<ContentLibrary>,
    ) -> Self {
        Self {
            rx,
            tx,
            assistant,
            library,
            epoch: 0,
        }
    }

    /// Serves commands until every sender is gone or the receiver hangs up.
    pub fn run(&mut self) {
        info!(assistant = self.assistant.is_some(), "engine started");

        while let Ok(cmd) = self.rx.recv() {
            let Some(resp) = self.handle(cmd) else {
                continue;
            };
            if self.tx.send(resp).is_err() {
                break;
            }
        }

        info!("engine stopped");
    }

    fn handle(&mut self, cmd: EngineCommand) -> Option<EngineResponse> {
        match cmd {
            EngineCommand::Reset { epoch } => {
                self.epoch = self.epoch.max(epoch);
                if let Some(assistant) = self.assistant.as_mut() {
                    assistant.reset();
                }
                debug!(epoch, "conversation reset");
                None
            }

            EngineCommand::Narrate { epoch, prompt } => {
                if self.is_stale(epoch) {
                    return None;
                }
                let Some(assistant) = self.assistant.as_mut() else {
                    return Some(EngineResponse::NarrationFailed { epoch });
                };
                match assistant.complete(&prompt) {
                    Ok(text) => Some(EngineResponse::Narration { epoch, text }),
                    Err(err) => {
                        warn!(error = %format!("{err:#}"), "narration failed");
                        Some(EngineResponse::NarrationFailed { epoch })
                    }
                }
            }

            EngineCommand::GeneratePlan { epoch, record } => {
                if self.is_stale(epoch) {
                    return None;
                }
                let assistant = self
                    .assistant
                    .as_deref_mut()
                    .map(|a| a as &mut dyn Assistant);
                let outcome = generate_plan(assistant, &record, &self.library);
                Some(EngineResponse::PlanReady { epoch, outcome })
            }
        }
    }

    fn is_stale(&self, epoch: u64) -> bool {
        let stale = epoch < self.epoch;
        if stale {
            debug!(epoch, current = self.epoch, "dropping queued work");
        }
        stale
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::sync::Mutex;

    use super::*;
    use crate::engine::plan::PlanSource;
    use crate::model::evaluation::{EvaluationRecord, Emotion};

    /// Echoes prompts back; "falla" fails. Counts resets.
    struct EchoAssistant {
        resets: Arc<Mutex<u32>>,
    }

    impl Assistant for EchoAssistant {
        fn complete(&mut self, prompt: &str) -> anyhow::Result<String> {
            if prompt == "falla" {
                anyhow::bail!("sin conexión");
            }
            if prompt.contains("crea una secuencia") {
                return Ok("[\"A\", \"G4\", \"H\"]".to_string());
            }
            Ok(format!("eco: {prompt}"))
        }

        fn reset(&mut self) {
            *self.resets.lock().unwrap() += 1;
        }
    }

    fn record() -> EvaluationRecord {
        EvaluationRecord {
            situation: "una pérdida".into(),
            involved: "mi familia".into(),
            emotion: Emotion::Desolacion,
            body_location: "la garganta".into(),
            suds: 9,
            first_time: "a los siete años".into(),
            first_involved: "mi madre".into(),
            negative_belief: "me abandonan".into(),
            positive_cognition: "Puedo construir relaciones seguras y soy digno de pertenencia.".into(),
            voc: 1,
        }
    }

    /// Feeds `commands` to a fresh engine and returns everything it answered.
    fn run(assistant: Option<Box<dyn Assistant + Send>>, commands: Vec<EngineCommand>) -> Vec<EngineResponse> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (resp_tx, resp_rx) = mpsc::channel();
        for cmd in commands {
            cmd_tx.send(cmd).unwrap();
        }
        drop(cmd_tx);

        let mut engine = Engine::new(cmd_rx, resp_tx, assistant, Arc::new(ContentLibrary::standard().clone()));
        engine.run();
        drop(engine);
        resp_rx.iter().collect()
    }

    #[test]
    fn narration_round_trip() {
        let resets = Arc::new(Mutex::new(0));
        let responses = run(
            Some(Box::new(EchoAssistant { resets })),
            vec![
                EngineCommand::Narrate { epoch: 0, prompt: "hola".into() },
                EngineCommand::Narrate { epoch: 0, prompt: "falla".into() },
            ],
        );
        assert_eq!(
            responses,
            vec![
                EngineResponse::Narration { epoch: 0, text: "eco: hola".into() },
                EngineResponse::NarrationFailed { epoch: 0 },
            ]
        );
    }

    #[test]
    fn reset_drops_older_work() {
        let resets = Arc::new(Mutex::new(0));
        let responses = run(
            Some(Box::new(EchoAssistant { resets: resets.clone() })),
            vec![
                EngineCommand::Reset { epoch: 1 },
                EngineCommand::Narrate { epoch: 0, prompt: "tarde".into() },
                EngineCommand::GeneratePlan { epoch: 0, record: record() },
                EngineCommand::Narrate { epoch: 1, prompt: "nuevo".into() },
            ],
        );
        assert_eq!(responses, vec![EngineResponse::Narration { epoch: 1, text: "eco: nuevo".into() }]);
        assert_eq!(*resets.lock().unwrap(), 1);
    }

    #[test]
    fn plan_uses_assistant_reply() {
        let resets = Arc::new(Mutex::new(0));
        let responses = run(
            Some(Box::new(EchoAssistant { resets })),
            vec![EngineCommand::GeneratePlan { epoch: 0, record: record() }],
        );
        let [EngineResponse::PlanReady { epoch: 0, outcome }] = responses.as_slice() else {
            panic!("unexpected responses: {responses:?}");
        };
        assert_eq!(outcome.source, PlanSource::Personalized);
        assert_eq!(outcome.plan.ids(), ["A", "G4", "H"]);
    }

    #[test]
    fn without_assistant_plans_fall_back_and_narration_fails() {
        let responses = run(
            None,
            vec![
                EngineCommand::GeneratePlan { epoch: 0, record: record() },
                EngineCommand::Narrate { epoch: 0, prompt: "hola".into() },
            ],
        );
        assert!(matches!(
            &responses[0],
            EngineResponse::PlanReady { outcome, .. } if outcome.source == PlanSource::Fallback
        ));
        assert_eq!(responses[1], EngineResponse::NarrationFailed { epoch: 0 });
    }
}
