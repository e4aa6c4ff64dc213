use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use ferry_channels::{DisplayNameResolver, HistorySource, NormalizedMessage, RawMessage, Transport};
use ferry_context::{ContextManager, ContextWindow};
use ferry_core::types::unix_now;
use ferry_core::FerryConfig;
use ferry_plugins::{PluginRegistry, Turn};

use crate::decode::normalize_message;
use crate::describe::ImageDescriber;

/// Delay before each outgoing text, proportional to its length.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pacing {
    pub ms_per_char: u64,
    pub max_ms: u64,
}

impl Pacing {
    pub fn delay_for(&self, text: &str) -> Duration {
        let chars = text.chars().count() as u64;
        Duration::from_millis(chars.saturating_mul(self.ms_per_char).min(self.max_ms))
    }
}

#[derive(Debug, Clone)]
pub struct DispatchSettings {
    /// Platform identity of the bot account.
    pub self_id: String,
    pub max_history: usize,
    pub backfill_limit: usize,
    pub pacing: Pacing,
    /// Prefix for public URLs of downloaded images.
    pub resource_prefix: Option<String>,
}

impl DispatchSettings {
    pub fn from_config(config: &FerryConfig) -> Self {
        Self {
            self_id: config.bot.self_id.clone(),
            max_history: config.history.max_history,
            backfill_limit: config.history.backfill_limit,
            pacing: Pacing {
                ms_per_char: config.dispatch.pacing_ms_per_char,
                max_ms: config.dispatch.pacing_max_ms,
            },
            resource_prefix: config.bot.resource_prefix.clone(),
        }
    }
}

/// What happened to one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Authored by the bot, undecodable, or of an unhandled kind.
    Ignored,
    /// Stored in history; no plugin produced text.
    NoReply,
    /// `sent` of `total` texts were delivered.
    Replied { sent: usize, total: usize },
}

/// Runs one inbound message through decoding, history and the plugin chain,
/// then delivers the replies.
///
/// `dispatch` must not run concurrently for the same conversation;
/// [`ConversationWorkers`](crate::ConversationWorkers) guarantees that.
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    history: Arc<dyn HistorySource>,
    names: Arc<dyn DisplayNameResolver>,
    plugins: PluginRegistry,
    contexts: ContextManager,
    settings: DispatchSettings,
    describer: Option<ImageDescriber>,
}

impl Dispatcher {
    pub fn new(
        transport: Arc<dyn Transport>,
        history: Arc<dyn HistorySource>,
        names: Arc<dyn DisplayNameResolver>,
        plugins: PluginRegistry,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            transport,
            history,
            names,
            plugins,
            contexts: ContextManager::new(settings.max_history),
            settings,
            describer: None,
        }
    }

    /// Describe inbound images and store the description in history.
    pub fn with_image_describer(mut self, describer: ImageDescriber) -> Self {
        self.describer = Some(describer);
        self
    }

    pub fn contexts(&self) -> &ContextManager {
        &self.contexts
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub async fn dispatch(&self, raw: RawMessage) -> DispatchOutcome {
        // the send path already stored anything the bot said
        if raw.is_self || raw.sender == self.settings.self_id {
            return DispatchOutcome::Ignored;
        }

        let Some(msg) = normalize_message(
            &raw,
            self.transport.as_ref(),
            self.settings.resource_prefix.as_deref(),
            self.describer.as_ref(),
        )
        .await
        else {
            return DispatchOutcome::Ignored;
        };
        let conversation = msg.conversation.as_str();

        if self.contexts.is_empty(conversation) {
            self.backfill(conversation).await;
        }

        let sender_name = self.names.resolve(&msg.sender, conversation).await;
        self.contexts
            .push_message(conversation, &sender_name, &msg.text, msg.timestamp);

        let conversation_name = self.names.resolve(conversation, conversation).await;
        let self_name = self.names.resolve(&self.settings.self_id, conversation).await;
        info!(conversation = %conversation_name, sender = %sender_name, text = %msg.text, "new message");

        let replies = self.run_chain(&msg, &self_name, &conversation_name).await;
        if replies.is_empty() {
            debug!(conversation, "no response to send");
            return DispatchOutcome::NoReply;
        }

        let total = replies.len();
        let sent = self.deliver(conversation, &self_name, replies).await;
        DispatchOutcome::Replied { sent, total }
    }

    /// Fill an empty window from stored history.
    pub async fn backfill(&self, conversation: &str) -> usize {
        let records = match self
            .history
            .fetch_history(conversation, self.settings.backfill_limit)
            .await
        {
            Ok(records) => records,
            Err(e) => {
                warn!(conversation, error = %e, "history backfill failed");
                return 0;
            }
        };

        let mut incoming = ContextWindow::from_records(records, self.settings.max_history);
        incoming.sort_by_timestamp();
        let loaded = incoming.len();
        self.contexts.extend(conversation, incoming);
        debug!(conversation, loaded, "window backfilled");
        loaded
    }

    /// Backfill the `count` most recently active conversations.
    pub async fn preload(&self, count: usize) {
        if count == 0 {
            return;
        }
        let sessions = match self.history.recent_sessions(count).await {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "could not list recent sessions");
                return;
            }
        };

        let mut messages = 0;
        for conversation in &sessions {
            if self.contexts.is_empty(conversation) {
                messages += self.backfill(conversation).await;
            }
        }
        info!(sessions = sessions.len(), messages, "history preloaded");
    }

    async fn run_chain(
        &self,
        msg: &NormalizedMessage,
        self_name: &str,
        conversation_name: &str,
    ) -> Vec<String> {
        let conversation = msg.conversation.as_str();
        let mut replies = Vec::new();

        for plugin in self.plugins.resolve(conversation, conversation_name) {
            // each plugin sees the window as left by the previous one
            let window = self.contexts.get_context(conversation);
            let turn = Turn {
                message: msg,
                window: &window,
                self_name,
                conversation_name,
            };

            match plugin.handle(&turn).await {
                Ok(reply) => {
                    replies.extend(reply.responses);
                    if !reply.continue_chain {
                        debug!(conversation, plugin = %plugin.name(), "chain stopped");
                        break;
                    }
                }
                Err(e) => {
                    warn!(conversation, plugin = %plugin.name(), error = %e, "plugin failed");
                }
            }
        }
        replies
    }

    /// Send texts in order, storing each one that went out. Stops at the
    /// first failure. Returns how many were sent.
    async fn deliver(&self, conversation: &str, self_name: &str, texts: Vec<String>) -> usize {
        let mut sent = 0;
        for text in &texts {
            let delay = self.settings.pacing.delay_for(text);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            if let Err(e) = self.transport.send(text, conversation, &[]).await {
                warn!(
                    conversation,
                    error = %e,
                    dropped = texts.len() - sent,
                    "send failed, dropping the rest of this reply"
                );
                break;
            }
            self.contexts
                .push_message(conversation, self_name, text, unix_now());
            sent += 1;
        }
        sent
    }
}
