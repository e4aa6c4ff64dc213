//! Bounded, time-ordered history of one conversation.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

use ferry_core::config::DEFAULT_MAX_HISTORY;

/// One line of conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub sender: String,
    pub text: String,
    /// Unix seconds. Zero when the arrival time is unknown.
    pub timestamp: i64,
}

impl HistoryRecord {
    pub fn new(sender: impl Into<String>, text: impl Into<String>, timestamp: i64) -> Self {
        Self {
            sender: sender.into(),
            text: text.into(),
            timestamp,
        }
    }
}

impl fmt::Display for HistoryRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.sender, self.text.replace('\n', " "))
    }
}

/// FIFO window of at most `capacity` records.
///
/// The one exception to the bound is [`ContextWindow::extend`] with an
/// incoming window that is itself larger than `capacity`: every incoming
/// record is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextWindow {
    records: VecDeque<HistoryRecord>,
    capacity: usize,
}

impl Default for ContextWindow {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY)
    }
}

impl ContextWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(capacity.min(DEFAULT_MAX_HISTORY)),
            capacity,
        }
    }

    /// Build a window from bulk-loaded records, keeping the first `capacity`.
    ///
    /// History sources return newest first, so call
    /// [`sort_by_timestamp`](Self::sort_by_timestamp) before reading.
    pub fn from_records(records: impl IntoIterator<Item = HistoryRecord>, capacity: usize) -> Self {
        Self {
            records: records.into_iter().take(capacity).collect(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &HistoryRecord> + ExactSizeIterator {
        self.records.iter()
    }

    pub fn last(&self) -> Option<&HistoryRecord> {
        self.records.back()
    }

    /// Append one record, evicting the oldest when full.
    pub fn append(&mut self, sender: impl Into<String>, text: impl Into<String>, timestamp: i64) {
        self.push(HistoryRecord::new(sender, text, timestamp));
    }

    pub fn push(&mut self, record: HistoryRecord) {
        if self.capacity == 0 {
            return;
        }
        while self.records.len() >= self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    /// Stable ascending sort by timestamp.
    pub fn sort_by_timestamp(&mut self) {
        self.records.make_contiguous().sort_by_key(|r| r.timestamp);
    }

    /// Merge `incoming` after the current records.
    ///
    /// Incoming records are all retained; existing records are dropped from
    /// the front until the total fits. If `incoming` alone is longer than
    /// the capacity, the merged window exceeds it.
    pub fn extend(&mut self, incoming: ContextWindow) {
        let room = self.capacity.saturating_sub(incoming.len());
        while self.records.len() > room {
            self.records.pop_front();
        }
        self.records.extend(incoming.records);
    }

    /// Copy of the `n` most recent records. The source is left untouched.
    pub fn latest_n(&self, n: usize) -> ContextWindow {
        let skip = self.records.len().saturating_sub(n);
        Self {
            records: self.records.iter().skip(skip).cloned().collect(),
            capacity: self.capacity,
        }
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

impl fmt::Display for ContextWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, record) in self.records.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{record}")?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a ContextWindow {
    type Item = &'a HistoryRecord;
    type IntoIter = std::collections::vec_deque::Iter<'a, HistoryRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
