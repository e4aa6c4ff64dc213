use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::info;

use crate::error::TransportError;
use crate::transport::{compose_text, render_mentions, Transport};
use crate::types::RawMessage;

/// A text the dry-run transport would have sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentText {
    pub conversation: String,
    pub text: String,
}

/// Logs outgoing texts instead of sending them and keeps them in an outbox.
/// Never delivers inbound messages.
#[derive(Default)]
pub struct DryRunTransport {
    outbox: Mutex<Vec<SentText>>,
}

impl DryRunTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything "sent" so far, in order.
    pub fn sent(&self) -> Vec<SentText> {
        self.outbox
            .lock()
            .map(|o| o.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

#[async_trait]
impl Transport for DryRunTransport {
    fn name(&self) -> &str {
        "dry-run"
    }

    async fn start(&self, _inbound: mpsc::Sender<RawMessage>) -> Result<(), TransportError> {
        Ok(())
    }

    async fn stop(&self) {}

    async fn send(
        &self,
        text: &str,
        conversation: &str,
        mentions: &[String],
    ) -> Result<(), TransportError> {
        let text = compose_text(&render_mentions(mentions, |id| id.to_string()), text);
        info!("[DRY RUN] To {conversation}: {text}");
        let mut outbox = self
            .outbox
            .lock()
            .map_err(|_| TransportError::SendFailed("outbox lock poisoned".into()))?;
        outbox.push(SentText {
            conversation: conversation.to_string(),
            text,
        });
        Ok(())
    }
}
