//! Line-oriented transport over stdin/stdout, for trying plugin chains
//! without a platform client.
//!
//! Each input line is `conversation|sender|text`. Replies are printed as
//! `[conversation] text`, or only logged in dry-run mode.

use std::sync::Mutex;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use ferry_channels::{DryRunTransport, RawMessage, Transport, TransportError};
use ferry_core::types::unix_now;

pub struct ConsoleTransport {
    reader: Mutex<Option<JoinHandle<()>>>,
    dry_run: Option<DryRunTransport>,
}

impl ConsoleTransport {
    pub fn new(dry_run: bool) -> Self {
        Self {
            reader: Mutex::new(None),
            dry_run: dry_run.then(DryRunTransport::new),
        }
    }
}

/// Parse one input line. Blank lines and lines missing a field yield `None`.
pub fn parse_line(line: &str, id: u64) -> Option<RawMessage> {
    let mut parts = line.trim_end_matches(['\r', '\n']).splitn(3, '|');
    let conversation = parts.next()?.trim();
    let sender = parts.next()?.trim();
    let text = parts.next()?;
    if conversation.is_empty() || sender.is_empty() || text.is_empty() {
        return None;
    }
    let mut raw = RawMessage::text(conversation, sender, text, unix_now());
    raw.id = id;
    Some(raw)
}

#[async_trait]
impl Transport for ConsoleTransport {
    fn name(&self) -> &str {
        "console"
    }

    async fn start(&self, inbound: mpsc::Sender<RawMessage>) -> Result<(), TransportError> {
        let mut reader = self
            .reader
            .lock()
            .map_err(|_| TransportError::ConnectionFailed("reader lock poisoned".into()))?;
        if reader.is_some() {
            return Err(TransportError::ConnectionFailed("already started".into()));
        }

        *reader = Some(tokio::spawn(async move {
            let mut next_id = 0u64;
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                let line = match lines.next_line().await {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        warn!(error = %e, "stdin read failed");
                        break;
                    }
                };
                next_id += 1;
                let Some(raw) = parse_line(&line, next_id) else {
                    if !line.trim().is_empty() {
                        warn!(line = %line, "expected conversation|sender|text");
                    }
                    continue;
                };
                if inbound.send(raw).await.is_err() {
                    break;
                }
            }
            debug!("console input closed");
        }));
        Ok(())
    }

    async fn stop(&self) {
        let handle = match self.reader.lock() {
            Ok(mut reader) => reader.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(handle) = handle {
            handle.abort();
        }
    }

    async fn send(
        &self,
        text: &str,
        conversation: &str,
        mentions: &[String],
    ) -> Result<(), TransportError> {
        if let Some(dry_run) = &self.dry_run {
            return dry_run.send(text, conversation, mentions).await;
        }
        println!("[{conversation}] {text}");
        Ok(())
    }
}
