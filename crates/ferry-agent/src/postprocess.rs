//! Output contract shared by every backend.
//!
//! Raw completion text goes through, in order: reasoning-trace removal, the
//! abstain check, line splitting, and removal of the bot's own name prefix.

use std::sync::LazyLock;

use regex::Regex;

/// What the model answers when it decides not to speak this turn.
pub const ABSTAIN_PHRASE: &str = "本轮不发言";

/// Closing marker of a reasoning model's hidden chain of thought.
pub const THINK_CLOSE: &str = "</think>";

/// Raw text to reply lines, or `None` when there is nothing to send.
pub fn shape_reply(raw: &str, self_name: &str) -> Option<Vec<String>> {
    let visible = strip_reasoning(raw);
    if is_abstain(visible) {
        return None;
    }
    let lines: Vec<String> = split_lines(visible)
        .into_iter()
        .filter_map(|line| {
            let line = strip_self_prefix(&line, self_name);
            (!line.is_empty()).then(|| line.to_string())
        })
        .collect();
    (!lines.is_empty()).then_some(lines)
}

pub fn is_abstain(text: &str) -> bool {
    text.contains(ABSTAIN_PHRASE)
}

/// Drop everything up to and including [`THINK_CLOSE`] plus the one character
/// after it (normally the newline). Text without the marker is returned as is.
pub fn strip_reasoning(text: &str) -> &str {
    let Some(pos) = text.find(THINK_CLOSE) else {
        return text;
    };
    let rest = &text[pos + THINK_CLOSE.len()..];
    let mut chars = rest.chars();
    chars.next();
    chars.as_str()
}

/// Non-empty, trimmed lines.
pub fn split_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect()
}

/// Models sometimes imitate the history format and prefix their reply with
/// `"<self_name>: "`. Both ASCII and full-width colons are accepted.
pub fn strip_self_prefix<'a>(line: &'a str, self_name: &str) -> &'a str {
    if self_name.is_empty() {
        return line;
    }
    match line.strip_prefix(self_name) {
        Some(rest) => match rest.strip_prefix(':').or_else(|| rest.strip_prefix('：')) {
            Some(rest) => rest.trim_start(),
            None => line,
        },
        None => line,
    }
}

static WRAP_ARTIFACT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s\S\n").expect("valid wrap artifact regex"));

/// Remove the stray "whitespace, one character, newline" runs some vision
/// models leave when they hard-wrap their output.
pub fn clean_image_description(text: &str) -> String {
    WRAP_ARTIFACT.replace_all(text, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abstain_anywhere_in_text() {
        assert_eq!(shape_reply("本轮不发言", "Bot"), None);
        assert_eq!(shape_reply("嗯。本轮不发言。", "Bot"), None);
    }

    #[test]
    fn abstain_inside_reasoning_does_not_count() {
        let raw = "<think>maybe 本轮不发言?</think>\n好呀";
        assert_eq!(shape_reply(raw, "Bot"), Some(vec!["好呀".to_string()]));
    }

    #[test]
    fn strip_reasoning_skips_one_character() {
        assert_eq!(strip_reasoning("<think>r</think>X\nHello"), "\nHello");
        assert_eq!(strip_reasoning("<think>r</think>\n你好"), "你好");
        assert_eq!(strip_reasoning("<think>r</think>"), "");
    }

    #[test]
    fn strip_reasoning_without_marker_is_identity() {
        assert_eq!(strip_reasoning("plain reply"), "plain reply");
    }

    #[test]
    fn strip_reasoning_handles_multibyte_follower() {
        assert_eq!(strip_reasoning("</think>好的呀"), "的呀");
    }

    #[test]
    fn lines_are_trimmed_and_blank_lines_dropped() {
        assert_eq!(
            split_lines("  one \n\n\t two\r\n   \n"),
            vec!["one".to_string(), "two".to_string()]
        );
    }

    #[test]
    fn self_prefix_variants() {
        assert_eq!(strip_self_prefix("Bot: hi", "Bot"), "hi");
        assert_eq!(strip_self_prefix("Bot：hi", "Bot"), "hi");
        assert_eq!(strip_self_prefix("Bot hi", "Bot"), "Bot hi");
        assert_eq!(strip_self_prefix("Botany: hi", "Bot"), "Botany: hi");
        assert_eq!(strip_self_prefix("hi", ""), "hi");
    }

    #[test]
    fn prefix_only_lines_vanish() {
        assert_eq!(shape_reply("Bot:\nBot: ok", "Bot"), Some(vec!["ok".to_string()]));
        assert_eq!(shape_reply("Bot:", "Bot"), None);
    }

    #[test]
    fn image_description_removes_wrap_artifacts() {
        assert_eq!(
            clean_image_description("一只小狗 在\n草地上"),
            "一只小狗草地上"
        );
        assert_eq!(clean_image_description("no artifacts"), "no artifacts");
    }
}
