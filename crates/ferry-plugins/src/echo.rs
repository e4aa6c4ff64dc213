//! Follow the crowd: when several people just said the same thing, say it too.

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use ferry_context::{normalize, ContextWindow};

use crate::error::PluginError;
use crate::plugin::{Plugin, PluginReply, Turn};

/// Finds the text repeated most often among recent messages.
pub struct RepeatDetector {
    repeat_count: usize,
    context_length: usize,
    max_length: usize,
    /// Last text echoed per conversation.
    last_echoed: DashMap<String, String>,
}

impl RepeatDetector {
    /// Callers validate `repeat_count > 1`, `context_length > repeat_count`
    /// and `max_length > 0` (config validation does).
    pub fn new(repeat_count: usize, context_length: usize, max_length: usize) -> Self {
        Self {
            repeat_count,
            context_length,
            max_length,
            last_echoed: DashMap::new(),
        }
    }

    /// The text to echo in `conversation`, if any. Records the result so the
    /// same text is not echoed twice in a row.
    pub fn detect(&self, conversation: &str, window: &ContextWindow, self_name: &str) -> Option<String> {
        let recent = window.latest_n(self.context_length);

        // (normalized, literal) of other people's messages, oldest first
        let candidates: Vec<(String, &str)> = recent
            .iter()
            .filter(|r| r.sender != self_name)
            .filter_map(|r| {
                let norm = normalize(&r.text);
                (!norm.is_empty()).then_some((norm, r.text.as_str()))
            })
            .collect();

        // groups of positions in first-seen order; ties go to the earliest group
        let mut groups: Vec<(&str, Vec<usize>)> = Vec::new();
        for (pos, (norm, _)) in candidates.iter().enumerate() {
            match groups.iter_mut().find(|(key, _)| *key == norm.as_str()) {
                Some((_, positions)) => positions.push(pos),
                None => groups.push((norm.as_str(), vec![pos])),
            }
        }
        let mut modal: Option<&Vec<usize>> = None;
        for (_, positions) in &groups {
            if modal.map_or(true, |m| positions.len() > m.len()) {
                modal = Some(positions);
            }
        }

        let positions = modal?;
        if positions.len() < self.repeat_count {
            return None;
        }
        let latest = *positions.last()?;
        let text = candidates[latest].1.trim();

        if text.chars().count() > self.max_length {
            debug!(conversation, len = text.chars().count(), "repeat too long to echo");
            return None;
        }
        if self
            .last_echoed
            .get(conversation)
            .is_some_and(|last| last.as_str() == text)
        {
            return None;
        }

        self.last_echoed
            .insert(conversation.to_string(), text.to_string());
        Some(text.to_string())
    }
}

pub struct EchoPlugin {
    detector: RepeatDetector,
}

impl EchoPlugin {
    pub fn new(detector: RepeatDetector) -> Self {
        Self { detector }
    }
}

#[async_trait]
impl Plugin for EchoPlugin {
    fn name(&self) -> &str {
        "echo"
    }

    async fn handle(&self, turn: &Turn<'_>) -> Result<PluginReply, PluginError> {
        if !turn.message.kind.is_textual() {
            return Ok(PluginReply::pass());
        }
        match self
            .detector
            .detect(turn.conversation_id(), turn.window, turn.self_name)
        {
            Some(text) => {
                debug!(conversation = %turn.conversation_id(), text = %text, "echoing");
                Ok(PluginReply::final_reply(vec![text]))
            }
            None => Ok(PluginReply::pass()),
        }
    }
}
