use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AssistantConfig;
use crate::engine::prompt_builder::SYSTEM_INSTRUCTION;

/// Text-completion collaborator. Keeps whatever conversation state it needs
/// between calls; `reset` forgets it.
pub trait Assistant {
    fn complete(&mut self, prompt: &str) -> Result<String>;
    fn reset(&mut self);
}

#[derive(Serialize)]
pub struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatTurn],
    pub temperature: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

impl ChatTurn {
    fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
        }
    }
}

#[derive(Deserialize)]
pub struct ChatCompletionResponse {
    pub choices: Vec<Choice>,
}

#[derive(Deserialize)]
pub struct Choice {
    pub message: ChatMessageResponse,
}

#[derive(Deserialize)]
pub struct ChatMessageResponse {
    pub content: String,
}

/// OpenAI-compatible chat-completions endpoint with a running conversation.
pub struct ChatCompletionClient {
    client: Client,
    endpoint: String,
    model: String,
    temperature: f32,
    api_key: Option<String>,
    max_history: usize,
    history: Vec<ChatTurn>,
}

impl ChatCompletionClient {
    pub fn new(config: &AssistantConfig, api_key: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("building HTTP client")?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            api_key,
            max_history: config.max_history,
            history: Vec::new(),
        })
    }

    fn conversation(&self, prompt: &str) -> Vec<ChatTurn> {
        let mut turns = Vec::with_capacity(self.history.len() + 2);
        turns.push(ChatTurn::new("system", SYSTEM_INSTRUCTION));
        turns.extend(self.history.iter().cloned());
        turns.push(ChatTurn::new("user", prompt));
        turns
    }

    fn remember(&mut self, prompt: &str, reply: &str) {
        self.history.push(ChatTurn::new("user", prompt));
        self.history.push(ChatTurn::new("assistant", reply));
        trim_history(&mut self.history, self.max_history);
    }
}

/// Drops the oldest user/assistant pairs beyond `max_turns` messages.
fn trim_history(history: &mut Vec<ChatTurn>, max_turns: usize) {
    if history.len() > max_turns {
        let mut excess = history.len() - max_turns;
        excess += excess % 2;
        history.drain(..excess.min(history.len()));
    }
}

impl Assistant for ChatCompletionClient {
    fn complete(&mut self, prompt: &str) -> Result<String> {
        let messages = self.conversation(prompt);
        let req = ChatCompletionRequest {
            model: &self.model,
            messages: &messages,
            temperature: self.temperature,
        };

        let mut builder = self.client.post(&self.endpoint).json(&req);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let resp = builder
            .send()
            .context("sending chat completion")?
            .error_for_status()
            .context("chat completion rejected")?
            .json::<ChatCompletionResponse>()
            .context("decoding chat completion")?;

        let reply = resp
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .context("chat completion returned no choices")?;

        debug!(chars = reply.len(), "assistant replied");
        self.remember(prompt, &reply);
        Ok(reply)
    }

    fn reset(&mut self) {
        self.history.clear();
    }
}
