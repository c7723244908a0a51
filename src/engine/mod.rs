pub mod engine;
pub mod protocol;

pub mod evaluation;
pub mod flow;
pub mod interpolate;
pub mod narration;
pub mod plan;
pub mod playback;
pub mod ticker;

pub mod llm_client;
pub mod prompt_builder;
