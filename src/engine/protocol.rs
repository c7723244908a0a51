use crate::engine::plan::PlanOutcome;
use crate::model::evaluation::EvaluationRecord;

/// Work for the assistant thread. Every item carries the session epoch it
/// was issued under.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCommand {
    Narrate { epoch: u64, prompt: String },
    GeneratePlan { epoch: u64, record: EvaluationRecord },
    /// Starts a new conversation; queued work from older epochs is dropped.
    Reset { epoch: u64 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineResponse {
    Narration { epoch: u64, text: String },
    NarrationFailed { epoch: u64 },
    PlanReady { epoch: u64, outcome: PlanOutcome },
}
