use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use ferry_agent::prompt::{PromptTemplate, PromptVars};
use ferry_agent::AiProvider;
use ferry_core::types::unix_now;

use crate::cadence::CadenceGate;
use crate::error::PluginError;
use crate::plugin::{Plugin, PluginReply, Turn};

type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

/// Cadence-gated AI responder.
///
/// Feeds the most recent `context_length` history lines to the model. A model
/// that abstains ends the chain for this turn; a provider failure is returned
/// as an error, which the dispatcher logs and skips.
pub struct ChatPlugin {
    provider: AiProvider,
    gate: CadenceGate,
    prompt: PromptTemplate,
    context_length: usize,
    clock: Clock,
}

impl ChatPlugin {
    pub fn new(
        provider: AiProvider,
        gate: CadenceGate,
        prompt: PromptTemplate,
        context_length: usize,
    ) -> Self {
        Self {
            provider,
            gate,
            prompt,
            context_length,
            clock: Arc::new(unix_now),
        }
    }

    /// Replace the wall clock, for deterministic tests.
    pub fn with_clock(mut self, clock: impl Fn() -> i64 + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }
}

#[async_trait]
impl Plugin for ChatPlugin {
    fn name(&self) -> &str {
        "chat"
    }

    async fn handle(&self, turn: &Turn<'_>) -> Result<PluginReply, PluginError> {
        if !turn.message.kind.is_textual() {
            return Ok(PluginReply::pass());
        }

        let conversation = turn.conversation_id();
        if !self.gate.check(conversation, (self.clock)()) {
            return Ok(PluginReply::pass());
        }

        let prompt = self
            .prompt
            .render(&PromptVars {
                self_name: turn.self_name,
                contact: turn.conversation_name,
                is_group: turn.message.is_group,
            })
            .map_err(|e| PluginError::Template(e.to_string()))?;
        let history = turn.window.latest_n(self.context_length).to_string();

        debug!(conversation, provider = %self.provider.name(), lines = self.context_length, "invoking model");
        match self.provider.chat(&prompt, &history, turn.self_name).await? {
            Some(lines) => Ok(PluginReply::reply(lines)),
            None => {
                info!(conversation, "model abstained");
                Ok(PluginReply::stop())
            }
        }
    }
}
