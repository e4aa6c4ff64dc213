//! Process-wide map of conversation windows.

use dashmap::DashMap;
use tracing::debug;

use ferry_core::config::DEFAULT_MAX_HISTORY;

use crate::window::{ContextWindow, HistoryRecord};

/// Windows keyed by conversation id, created lazily on first access.
///
/// Each operation locks only its own conversation's shard; callers that need
/// read-modify-write across several calls serialize per conversation
/// themselves.
pub struct ContextManager {
    windows: DashMap<String, ContextWindow>,
    max_history: usize,
}

impl Default for ContextManager {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY)
    }
}

impl ContextManager {
    pub fn new(max_history: usize) -> Self {
        Self {
            windows: DashMap::new(),
            max_history,
        }
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    /// Snapshot of a conversation's window. Creates an empty one if absent.
    pub fn get_context(&self, id: &str) -> ContextWindow {
        self.windows
            .entry(id.to_string())
            .or_insert_with(|| ContextWindow::new(self.max_history))
            .clone()
    }

    pub fn is_empty(&self, id: &str) -> bool {
        self.windows.get(id).map_or(true, |w| w.is_empty())
    }

    pub fn push_message(&self, id: &str, sender: &str, text: &str, timestamp: i64) {
        self.with_context(id, |w| w.append(sender, text, timestamp));
    }

    pub fn push_record(&self, id: &str, record: HistoryRecord) {
        self.with_context(id, |w| w.push(record));
    }

    /// Merge bulk-loaded history into a conversation's window.
    pub fn extend(&self, id: &str, incoming: ContextWindow) {
        let added = incoming.len();
        let total = self.with_context(id, |w| {
            w.extend(incoming);
            w.len()
        });
        debug!(conversation = %id, added, total, "history merged");
    }

    /// Run `f` against the window while holding its lock.
    pub fn with_context<R>(&self, id: &str, f: impl FnOnce(&mut ContextWindow) -> R) -> R {
        let mut window = self
            .windows
            .entry(id.to_string())
            .or_insert_with(|| ContextWindow::new(self.max_history));
        f(&mut window)
    }

    pub fn clear_context(&self, id: &str) {
        if let Some(mut w) = self.windows.get_mut(id) {
            w.clear();
        }
    }

    pub fn conversation_count(&self) -> usize {
        self.windows.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn get_context_creates_lazily() {
        let mgr = ContextManager::new(5);
        assert_eq!(mgr.conversation_count(), 0);
        assert!(mgr.get_context("room@chatroom").is_empty());
        assert_eq!(mgr.conversation_count(), 1);
        assert_eq!(mgr.get_context("room@chatroom").capacity(), 5);
    }

    #[test]
    fn push_creates_and_appends() {
        let mgr = ContextManager::new(2);
        mgr.push_message("wxid_a", "wxid_a", "一", 1);
        mgr.push_message("wxid_a", "bot", "二", 2);
        mgr.push_message("wxid_a", "wxid_a", "三", 3);
        let w = mgr.get_context("wxid_a");
        assert_eq!(w.to_string(), "bot: 二\nwxid_a: 三");
    }

    #[test]
    fn snapshot_is_detached() {
        let mgr = ContextManager::default();
        mgr.push_message("c", "u", "x", 0);
        let snapshot = mgr.get_context("c");
        mgr.push_message("c", "u", "y", 1);
        assert_eq!(snapshot.len(), 1);
        assert_eq!(mgr.get_context("c").len(), 2);
    }

    #[test]
    fn clear_empties_one_conversation() {
        let mgr = ContextManager::default();
        mgr.push_message("a", "u", "x", 0);
        mgr.push_message("b", "u", "y", 0);
        mgr.clear_context("a");
        assert!(mgr.is_empty("a"));
        assert!(!mgr.is_empty("b"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn parallel_pushes_to_distinct_conversations() {
        let mgr = Arc::new(ContextManager::new(1000));
        let mut handles = Vec::new();
        for c in 0..8 {
            let mgr = mgr.clone();
            handles.push(tokio::spawn(async move {
                let id = format!("conv-{c}");
                for i in 0..200 {
                    mgr.push_message(&id, "u", &i.to_string(), i);
                }
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        for c in 0..8 {
            let w = mgr.get_context(&format!("conv-{c}"));
            assert_eq!(w.len(), 200);
            let ordered: Vec<i64> = w.iter().map(|r| r.timestamp).collect();
            assert_eq!(ordered, (0..200).collect::<Vec<_>>());
        }
    }
}
