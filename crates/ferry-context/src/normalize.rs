//! Text normalization for repeat matching.

use std::sync::LazyLock;

use regex::Regex;

/// Sticker codes of 2 to 9 characters such as `[旺柴]`, then single CJK and ASCII
/// punctuation marks. Codes come first so a whole code goes, not just its
/// brackets.
static STRIP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"\[[^\[\]]{2,9}\]",
        r#"|[，。！？、；：“”‘’（）《》【】…—～·「」『』"#,
        r#",.!?;:'"()\[\]{}<>\-~`]"#,
    ))
    .expect("valid normalization regex")
});

/// Strip punctuation and sticker codes, then surrounding whitespace.
///
/// Two messages that differ only in punctuation or attached stickers
/// normalize to the same string. The result may be empty.
pub fn normalize(text: &str) -> String {
    STRIP.replace_all(text, "").trim().to_string()
}
