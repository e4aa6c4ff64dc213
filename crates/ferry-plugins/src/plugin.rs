use async_trait::async_trait;

use ferry_channels::NormalizedMessage;
use ferry_context::ContextWindow;

use crate::error::PluginError;

/// Everything a plugin may look at for one inbound message.
pub struct Turn<'a> {
    pub message: &'a NormalizedMessage,
    /// Conversation history, already including `message`.
    pub window: &'a ContextWindow,
    /// The bot's display name in this conversation.
    pub self_name: &'a str,
    /// Group name or contact name of the conversation.
    pub conversation_name: &'a str,
}

impl Turn<'_> {
    pub fn conversation_id(&self) -> &str {
        self.message.conversation.as_str()
    }
}

/// Outcome of one plugin.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginReply {
    /// Texts to send, in order. May be empty.
    pub responses: Vec<String>,
    /// `false` ends the chain after this plugin.
    pub continue_chain: bool,
}

impl PluginReply {
    /// Nothing to say; let the next plugin try.
    pub fn pass() -> Self {
        Self {
            responses: Vec::new(),
            continue_chain: true,
        }
    }

    /// Nothing to say, and nobody else should either.
    pub fn stop() -> Self {
        Self {
            responses: Vec::new(),
            continue_chain: false,
        }
    }

    pub fn reply(responses: Vec<String>) -> Self {
        Self {
            responses,
            continue_chain: true,
        }
    }

    /// A reply that completes the turn.
    pub fn final_reply(responses: Vec<String>) -> Self {
        Self {
            responses,
            continue_chain: false,
        }
    }
}

/// A responder in the per-conversation chain.
///
/// Plugins never send anything themselves; the dispatcher owns delivery and
/// ordering. Implementations keep per-conversation state keyed by
/// [`Turn::conversation_id`]; the dispatcher guarantees at most one turn per
/// conversation is in flight.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Short name for logging.
    fn name(&self) -> &str;

    async fn handle(&self, turn: &Turn<'_>) -> Result<PluginReply, PluginError>;
}
