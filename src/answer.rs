//! Reply generation against an OpenAI-compatible chat completions API.

pub mod history;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;
use crate::error::{Error, Result};
use history::SessionHistory;

/// Generates a reply for an aggregated turn.
///
/// Implementations keep their own per-session history keyed by
/// `session_id`; the aggregator never sees it.
#[async_trait]
pub trait Answerer: Send + Sync {
    async fn answer(&self, text: &str, session_id: &str) -> Result<String>;
}

/// One message in a chat completions request or response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// OpenAI-compatible answerer with Redis-backed session history.
pub struct ChatAnswerer {
    client: reqwest::Client,
    config: LlmConfig,
    history: SessionHistory,
}

impl ChatAnswerer {
    pub fn new(config: LlmConfig, history: SessionHistory) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
            history,
        }
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl Answerer for ChatAnswerer {
    #[tracing::instrument(skip(self, text))]
    async fn answer(&self, text: &str, session_id: &str) -> Result<String> {
        let past = self.history.load(session_id).await.unwrap_or_else(|error| {
            tracing::warn!(%error, session_id, "failed to load session history, answering without it");
            Vec::new()
        });

        let request = ChatRequest {
            model: &self.config.model,
            temperature: self.config.temperature,
            messages: build_messages(&self.config.system_prompt, &past, text),
        };

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|error| Error::Answer(error.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::Answer(format!("llm returned {}", response.status())));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|error| Error::Answer(error.to_string()))?;

        let reply = body
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| Error::Answer("llm returned no choices".into()))?;

        // Persist both turns so the next burst in this session sees the
        // exchange. History failures degrade context, not the reply.
        if let Err(error) = self.history.record_exchange(session_id, text, &reply).await {
            tracing::warn!(%error, session_id, "failed to persist session history");
        }

        Ok(reply)
    }
}

/// Assemble the request messages: system prompt, stored history, new turn.
fn build_messages(system_prompt: &str, past: &[ChatMessage], text: &str) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(past.len() + 2);
    messages.push(ChatMessage::new("system", system_prompt));
    messages.extend(past.iter().cloned());
    messages.push(ChatMessage::new("user", text));
    messages
}
