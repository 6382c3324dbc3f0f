//! Pure text transforms for the share view.

use std::sync::LazyLock;

use regex::Regex;

// List markers only count when they start a line, i.e. follow a newline
// (optionally after leading whitespace).
static NUMBERED_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n(\s*)(\d{1,3}\.)\s+").expect("numbered item regex"));
static BULLET_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n(\s*)([-*•])\s+").expect("bullet item regex"));
static EXCESS_NEWLINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("excess newlines regex"));

/// Inserts a blank line before numbered (`1.`) and bulleted (`-`, `*`, `•`)
/// list items, then collapses runs of three or more newlines down to two.
///
/// The collapse pass runs last so it also normalizes blank lines the earlier
/// passes just inserted; applying the function to its own output is a no-op.
pub fn format_lists(text: &str) -> String {
    let t = NUMBERED_ITEM.replace_all(text, "\n\n${1}${2} ");
    let t = BULLET_ITEM.replace_all(&t, "\n\n${1}${2} ");
    EXCESS_NEWLINES.replace_all(&t, "\n\n").into_owned()
}

/// Escapes the five HTML-reserved characters. `&` is replaced first so the
/// other entities are not double-escaped.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
