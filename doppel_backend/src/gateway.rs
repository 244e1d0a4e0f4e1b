//! Completion call with a "never crash the conversation" fallback.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::random::RandomSource;

pub const FALLBACK_REPLIES: [&str; 4] = [
    "бля, мозги зависли",
    "чё",
    "не, я пас",
    "хз, спроси позже",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// External language model. Returns the first choice's text.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: 300,
            temperature: 1.0,
        }
    }
}

pub struct CompletionGateway {
    provider: Arc<dyn CompletionProvider>,
    params: GenerationParams,
    rng: Arc<dyn RandomSource>,
}

impl CompletionGateway {
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        params: GenerationParams,
        rng: Arc<dyn RandomSource>,
    ) -> Self {
        Self {
            provider,
            params,
            rng,
        }
    }

    /// Always yields a non-empty reply. Provider errors and blank
    /// completions are logged and replaced by a fallback utterance.
    pub async fn complete(&self, messages: Vec<Message>) -> String {
        let request = CompletionRequest {
            messages,
            max_tokens: self.params.max_tokens,
            temperature: self.params.temperature,
        };

        match self.provider.complete(&request).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => {
                tracing::error!("LLM returned an empty completion");
                self.fallback()
            }
            Err(e) => {
                tracing::error!("LLM error: {:#}", e);
                self.fallback()
            }
        }
    }

    fn fallback(&self) -> String {
        let index = self.rng.pick_index(FALLBACK_REPLIES.len());
        FALLBACK_REPLIES[index].to_string()
    }
}
