//! Content predicate
//!
//! Decides whether a content item carries anything worth rendering. The walker
//! uses it twice: to drop blank filler items, and to decide whether an
//! unmarked item ends an open list.

use regex::Regex;
use std::borrow::Cow;
use std::sync::OnceLock;

use crate::model::{ContentItem, TextRun};

/// Remove every `<...>` tag, keeping the text between tags
pub fn strip_tags(text: &str) -> Cow<'_, str> {
    static TAG_REGEX: OnceLock<Option<Regex>> = OnceLock::new();

    if !text.contains('<') {
        return Cow::Borrowed(text);
    }

    match TAG_REGEX.get_or_init(|| Regex::new(r"<[^>]*>").ok()) {
        Some(regex) => regex.replace_all(text, ""),
        None => Cow::Borrowed(text),
    }
}

/// Visible text of a run; tags are stripped from markup runs only
pub fn run_text(run: &TextRun) -> Cow<'_, str> {
    match run {
        TextRun::Plain { text, .. } => Cow::Borrowed(text),
        TextRun::Markup(markup) => strip_tags(markup),
    }
}

/// Returns true if the item, or anything nested below it, has real content
///
/// Real content is a run with non-whitespace visible text, any table, or any
/// image. Plain runs are text even when they look like tags.
pub fn has_content(item: &ContentItem) -> bool {
    item.runs
        .iter()
        .any(|run| !run_text(run).trim().is_empty())
        || !item.images.is_empty()
        || !item.tables.is_empty()
        || item.children.iter().any(has_content)
}
