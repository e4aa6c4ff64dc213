//! Stored conversation history, as consumed by window backfill.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use ferry_codec::{decode_stored_message, StoredMessage};
use ferry_context::HistoryRecord;
use ferry_core::ConversationId;

use crate::error::TransportError;
use crate::names::DisplayNameResolver;

/// Supplies historical messages. Records may come in any order; callers sort.
#[async_trait]
pub trait HistorySource: Send + Sync {
    /// Up to `limit` most recent messages of `conversation`, labelled with
    /// display names.
    async fn fetch_history(
        &self,
        conversation: &str,
        limit: usize,
    ) -> Result<Vec<HistoryRecord>, TransportError>;

    /// Most recently active conversations, most recent first.
    async fn recent_sessions(&self, count: usize) -> Result<Vec<String>, TransportError> {
        let _ = count;
        Ok(Vec::new())
    }
}

/// Raw access to the platform's message database.
#[async_trait]
pub trait RowSource: Send + Sync {
    /// Text and quoted-message rows of `conversation`, newest first.
    async fn query_rows(
        &self,
        conversation: &str,
        limit: usize,
    ) -> Result<Vec<StoredMessage>, TransportError>;

    /// Conversation ids ordered by last activity, newest first.
    async fn recent_conversations(&self, count: usize) -> Result<Vec<String>, TransportError>;
}

/// [`HistorySource`] over stored rows: decodes each row, labels its author
/// and skips rows that fail to decode.
pub struct StoredHistory<S> {
    rows: S,
    names: Arc<dyn DisplayNameResolver>,
    self_id: String,
}

impl<S: RowSource> StoredHistory<S> {
    pub fn new(rows: S, names: Arc<dyn DisplayNameResolver>, self_id: impl Into<String>) -> Self {
        Self {
            rows,
            names,
            self_id: self_id.into(),
        }
    }
}

#[async_trait]
impl<S: RowSource> HistorySource for StoredHistory<S> {
    async fn fetch_history(
        &self,
        conversation: &str,
        limit: usize,
    ) -> Result<Vec<HistoryRecord>, TransportError> {
        let rows = self.rows.query_rows(conversation, limit).await?;
        let total = rows.len();
        let mut records = Vec::with_capacity(total);

        for row in &rows {
            let decoded = match decode_stored_message(row, conversation, &self.self_id) {
                Ok(Some(d)) => d,
                Ok(None) => continue,
                Err(e) => {
                    debug!(conversation, error = %e, "skipping undecodable history row");
                    continue;
                }
            };
            let sender = self.names.resolve(&decoded.sender, conversation).await;
            records.push(HistoryRecord::new(sender, decoded.text, decoded.timestamp));
        }

        debug!(conversation, total, kept = records.len(), "history fetched");
        Ok(records)
    }

    async fn recent_sessions(&self, count: usize) -> Result<Vec<String>, TransportError> {
        let ids = self.rows.recent_conversations(count).await?;
        Ok(ids
            .into_iter()
            .filter(|id| ConversationId::from(id.as_str()).is_chat())
            .collect())
    }
}

/// In-process history, newest last. Useful for console runs and tests.
#[derive(Default)]
pub struct MemoryHistory {
    conversations: DashMap<String, Vec<HistoryRecord>>,
    order: std::sync::Mutex<Vec<String>>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, conversation: &str, record: HistoryRecord) {
        self.conversations
            .entry(conversation.to_string())
            .or_default()
            .push(record);
        if let Ok(mut order) = self.order.lock() {
            order.retain(|c| c != conversation);
            order.push(conversation.to_string());
        }
    }
}

#[async_trait]
impl HistorySource for MemoryHistory {
    async fn fetch_history(
        &self,
        conversation: &str,
        limit: usize,
    ) -> Result<Vec<HistoryRecord>, TransportError> {
        // newest first, like a database query ordered by time descending
        Ok(self
            .conversations
            .get(conversation)
            .map(|records| records.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn recent_sessions(&self, count: usize) -> Result<Vec<String>, TransportError> {
        let order = self
            .order
            .lock()
            .map_err(|_| TransportError::History("session list lock poisoned".into()))?;
        Ok(order.iter().rev().take(count).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::names::{DirectoryResolver, StaticDirectory};

    struct FixedRows(Vec<StoredMessage>);

    #[async_trait]
    impl RowSource for FixedRows {
        async fn query_rows(
            &self,
            _conversation: &str,
            limit: usize,
        ) -> Result<Vec<StoredMessage>, TransportError> {
            Ok(self.0.iter().take(limit).cloned().collect())
        }

        async fn recent_conversations(&self, _count: usize) -> Result<Vec<String>, TransportError> {
            Ok(vec![
                "wxid_a".into(),
                "gh_official".into(),
                "1@chatroom".into(),
                "filehelper".into(),
            ])
        }
    }

    fn row(is_sender: i32, msg_type: u32, text: &str, ts: i64) -> StoredMessage {
        StoredMessage {
            is_sender,
            str_content: text.into(),
            msg_type,
            create_time: ts,
            ..Default::default()
        }
    }

    fn history(rows: Vec<StoredMessage>) -> StoredHistory<FixedRows> {
        let names = DirectoryResolver::new(
            StaticDirectory::new().with_contact("wxid_a", "阿甲"),
            "wxid_bot",
            "小渡",
        );
        StoredHistory::new(FixedRows(rows), Arc::new(names), "wxid_bot")
    }

    #[tokio::test]
    async fn private_rows_are_labelled() {
        let h = history(vec![row(1, 1, "在", 20), row(0, 1, "在吗", 10)]);
        let records = h.fetch_history("wxid_a", 50).await.unwrap();
        assert_eq!(
            records,
            vec![
                HistoryRecord::new("小渡", "在", 20),
                HistoryRecord::new("阿甲", "在吗", 10),
            ]
        );
    }

    #[tokio::test]
    async fn undecodable_and_unsupported_rows_are_skipped() {
        // group rows need an extension blob for the sender
        let h = history(vec![row(0, 1, "hi", 1), row(1, 1, "我说的", 2), row(0, 3, "", 3)]);
        let records = h.fetch_history("1@chatroom", 50).await.unwrap();
        assert_eq!(records, vec![HistoryRecord::new("小渡", "我说的", 2)]);
    }

    #[tokio::test]
    async fn recent_sessions_keep_people_and_groups() {
        let h = history(Vec::new());
        assert_eq!(
            h.recent_sessions(10).await.unwrap(),
            vec!["wxid_a".to_string(), "1@chatroom".to_string()]
        );
    }

    #[tokio::test]
    async fn memory_history_is_newest_first() {
        let h = MemoryHistory::new();
        for i in 0..5 {
            h.insert("wxid_a", HistoryRecord::new("a", i.to_string(), i));
        }
        h.insert("wxid_b", HistoryRecord::new("b", "x", 9));
        let records = h.fetch_history("wxid_a", 2).await.unwrap();
        assert_eq!(records[0].text, "4");
        assert_eq!(records[1].text, "3");
        assert_eq!(
            h.recent_sessions(10).await.unwrap(),
            vec!["wxid_b".to_string(), "wxid_a".to_string()]
        );
        assert!(h.fetch_history("nobody", 5).await.unwrap().is_empty());
    }
}
