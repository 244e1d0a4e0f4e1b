use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::config::BotConfig;
use crate::gateway::{CompletionGateway, CompletionProvider, GenerationParams};
use crate::llm_client::LlmClient;
use crate::memory::{ChanceUpdate, ConversationId, MemoryStore, ResponseChance, Turn};
use crate::prompt::{compose, Persona};
use crate::random::{RandomSource, ThreadRandom};
use crate::trigger::{evaluate, InboundMessage, TargetIdentity};

/// The impersonating bot: memory, trigger policy, prompt and completion.
///
/// `observe` is synchronous and must be called in delivery order so user
/// turns keep their per-chat order; `reply` may run on any task.
pub struct Doppel {
    target: TargetIdentity,
    persona: Persona,
    memory: Arc<MemoryStore>,
    chance: ResponseChance,
    gateway: CompletionGateway,
    rng: Arc<dyn RandomSource>,
}

impl Doppel {
    pub fn new(
        config: &BotConfig,
        provider: Arc<dyn CompletionProvider>,
        rng: Arc<dyn RandomSource>,
    ) -> Self {
        let target = TargetIdentity::new(config.target_username.clone(), config.nicknames.clone());
        let persona = match config.persona_prompt.as_deref() {
            Some(template) => Persona::with_template(&target.handle, template),
            None => Persona::new(&target.handle),
        };
        let params = GenerationParams {
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        };

        Self {
            target,
            persona,
            memory: Arc::new(MemoryStore::with_capacity(
                config.history_capacity,
                config.style_capacity,
            )),
            chance: ResponseChance::new(config.response_chance),
            gateway: CompletionGateway::new(provider, params, rng.clone()),
            rng,
        }
    }

    /// Production wiring: the configured OpenAI-compatible endpoint and the thread RNG.
    pub fn from_config(config: &BotConfig) -> Result<Self> {
        let client = LlmClient::new(
            config.llm_api_url.clone(),
            config.llm_api_key.clone().unwrap_or_default(),
            config.llm_model.clone(),
            Some(Duration::from_secs(config.llm_timeout_secs)),
        )?;
        Ok(Self::new(config, Arc::new(client), Arc::new(ThreadRandom)))
    }

    /// Records the message and decides whether to answer it. Returns the
    /// chat to reply in on a positive decision.
    pub fn observe(&self, message: &InboundMessage, bot_username: &str) -> Option<ConversationId> {
        let text = message.text()?;
        let chat = message.conversation_id;

        if message.author.is(&self.target.handle) {
            self.memory.record_style_sample(chat, text);
        }

        self.memory.record_turn(
            chat,
            Turn::user(format!("{}: {}", message.author.display_name(), text)),
        );

        let reason = evaluate(
            message,
            bot_username,
            &self.target,
            self.chance.get(),
            self.rng.as_ref(),
        )?;
        tracing::debug!("Replying in chat {} ({:?})", chat, reason);
        Some(chat)
    }

    /// Generates a reply from current memory and appends it as an agent turn.
    /// No lock is held while the completion is in flight.
    pub async fn reply(&self, chat: ConversationId) -> String {
        let messages = compose(
            &self.persona,
            &self.memory.style_samples(chat),
            &self.memory.history(chat),
        );

        let reply = self.gateway.complete(messages).await;
        self.memory.record_turn(chat, Turn::agent(reply.clone()));
        reply
    }

    pub async fn handle_message(
        &self,
        message: &InboundMessage,
        bot_username: &str,
    ) -> Option<String> {
        let chat = self.observe(message, bot_username)?;
        Some(self.reply(chat).await)
    }

    pub fn reset_memory(&self, chat: ConversationId) {
        self.memory.reset(chat);
        tracing::info!("Memory reset for chat {}", chat);
    }

    pub fn chance(&self) -> f64 {
        self.chance.get()
    }

    pub fn set_chance(&self, raw: &str) -> ChanceUpdate {
        let update = self.chance.set_from_str(raw);
        match update {
            ChanceUpdate::Applied(value) => tracing::info!("Response chance set to {}", value),
            ChanceUpdate::Rejected { current } => {
                tracing::debug!("Rejected chance {:?}, keeping {}", raw, current)
            }
        }
        update
    }

    pub fn target(&self) -> &TargetIdentity {
        &self.target
    }

    pub fn memory(&self) -> &MemoryStore {
        &self.memory
    }
}
