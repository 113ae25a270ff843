//! Inline run renderer
//!
//! Converts one [`TextRun`] into canonical inline markup. Plain runs are
//! HTML-escaped and wrapped according to their [`RunStyle`]; runs that already
//! carry embedded markup are normalized and passed through unescaped.
//!
//! # Markup normalization
//!
//! Embedded markup goes through four rewrites, in order:
//!
//! 1. Whitespace inside `<a ...>` opening tags collapses to single spaces
//! 2. Styled spans become canonical tags (`<strong>`, `<em>`, `<mark>`);
//!    nested spans are paired with their own close tags
//! 3. Any remaining span wrappers are removed, keeping their content
//! 4. Vendor `mso-*` style declarations are dropped
//!
//! ```rust
//! use outline_markdown_converter::inline::render_run;
//! use outline_markdown_converter::model::TextRun;
//!
//! let run = TextRun::Markup("<span style='font-weight:bold'>Hi</span>".to_string());
//! assert_eq!(render_run(&run), "<strong>Hi</strong>");
//! ```

use regex::{Captures, Regex};
use std::sync::OnceLock;

use crate::model::{RunStyle, TextRun};

/// Render one text run into canonical inline markup
pub fn render_run(run: &TextRun) -> String {
    match run {
        TextRun::Plain { text, style } => render_plain(text, *style),
        TextRun::Markup(markup) => normalize_markup(markup),
    }
}

/// Escape text and wrap it in the tags its style calls for
///
/// Strong is outermost, then emphasis, then strikethrough. Highlight is not
/// wrapped for plain runs.
fn render_plain(text: &str, style: RunStyle) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut output = escape_html(text);
    if style.strikethrough {
        output = format!("<del>{}</del>", output);
    }
    if style.italic {
        output = format!("<em>{}</em>", output);
    }
    if style.bold {
        output = format!("<strong>{}</strong>", output);
    }
    output
}

/// Escape the HTML-significant characters of a text
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Normalize pre-embedded markup into canonical inline tags
pub fn normalize_markup(markup: &str) -> String {
    let output = collapse_anchor_whitespace(markup);
    let output = rewrite_styled_spans(&output);
    let output = strip_spans(&output);
    strip_vendor_styles(&output)
}

fn collapse_anchor_whitespace(markup: &str) -> String {
    static ANCHOR_OPEN: OnceLock<Option<Regex>> = OnceLock::new();
    static WHITESPACE: OnceLock<Option<Regex>> = OnceLock::new();

    let (Some(anchor), Some(whitespace)) = (
        ANCHOR_OPEN.get_or_init(|| Regex::new(r"(?i)<a\s[^>]*>").ok()),
        WHITESPACE.get_or_init(|| Regex::new(r"\s+").ok()),
    ) else {
        return markup.to_string();
    };

    anchor
        .replace_all(markup, |caps: &Captures| {
            whitespace.replace_all(&caps[0], " ").into_owned()
        })
        .into_owned()
}

/// Canonical tags a span style maps to, outermost first
fn span_wraps(open_tag: &str) -> Vec<&'static str> {
    static STYLE_ATTR: OnceLock<Option<Regex>> = OnceLock::new();

    let Some(attr) = STYLE_ATTR
        .get_or_init(|| Regex::new(r#"(?i)\bstyle\s*=\s*(?:"([^"]*)"|'([^']*)')"#).ok())
    else {
        return Vec::new();
    };

    let declarations = attr
        .captures(open_tag)
        .and_then(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map_or("", |m| m.as_str());
    let style = RunStyle::parse(declarations);

    let mut wraps = Vec::new();
    if style.bold {
        wraps.push("strong");
    }
    if style.italic {
        wraps.push("em");
    }
    if style.highlight {
        wraps.push("mark");
    }
    wraps
}

/// An open span whose close tag has not been seen yet
struct OpenSpan {
    /// Where its replacement starts in the output
    at: usize,
    /// Length of the replacement written for the open tag
    len: usize,
    original: String,
    wraps: Vec<&'static str>,
}

/// Pair span tags like a stack, so nested spans close at their own close tag
///
/// Spans with an unrecognized style, stray close tags and spans that never
/// close are left as they are for the span stripper.
fn rewrite_styled_spans(markup: &str) -> String {
    static SPAN_TAG: OnceLock<Option<Regex>> = OnceLock::new();

    let Some(tag) = SPAN_TAG.get_or_init(|| Regex::new(r"(?i)<span\b[^>]*>|</span\s*>").ok()) else {
        return markup.to_string();
    };

    let mut output = String::with_capacity(markup.len());
    let mut open: Vec<OpenSpan> = Vec::new();
    let mut last = 0;

    for found in tag.find_iter(markup) {
        output.push_str(&markup[last..found.start()]);
        last = found.end();
        let text = found.as_str();

        if text.starts_with("</") {
            match open.pop() {
                Some(span) if !span.wraps.is_empty() => {
                    for name in span.wraps.iter().rev() {
                        output.push_str(&format!("</{}>", name));
                    }
                }
                _ => output.push_str(text),
            }
            continue;
        }

        let wraps = span_wraps(text);
        let at = output.len();
        if wraps.is_empty() {
            output.push_str(text);
        } else {
            for name in &wraps {
                output.push_str(&format!("<{}>", name));
            }
        }
        open.push(OpenSpan {
            at,
            len: output.len() - at,
            original: text.to_string(),
            wraps,
        });
    }
    output.push_str(&markup[last..]);

    // Unclosed spans get their original tag back, innermost first
    while let Some(span) = open.pop() {
        output.replace_range(span.at..span.at + span.len, &span.original);
    }
    output
}

fn strip_spans(markup: &str) -> String {
    static SPAN_TAG: OnceLock<Option<Regex>> = OnceLock::new();

    match SPAN_TAG.get_or_init(|| Regex::new(r"(?i)</?span\b[^>]*>").ok()) {
        Some(regex) => regex.replace_all(markup, "").into_owned(),
        None => markup.to_string(),
    }
}

fn strip_vendor_styles(markup: &str) -> String {
    static MSO_DECLARATION: OnceLock<Option<Regex>> = OnceLock::new();
    static EMPTY_STYLE: OnceLock<Option<Regex>> = OnceLock::new();

    let Some(mso) = MSO_DECLARATION
        .get_or_init(|| Regex::new(r#"(?i)mso-[a-z0-9-]+\s*:\s*[^;"']*;?\s*"#).ok())
    else {
        return markup.to_string();
    };

    let output = mso.replace_all(markup, "");
    match EMPTY_STYLE.get_or_init(|| Regex::new(r#"\s+style\s*=\s*(?:""|'')"#).ok()) {
        Some(empty) => empty.replace_all(&output, "").into_owned(),
        None => output.into_owned(),
    }
}
