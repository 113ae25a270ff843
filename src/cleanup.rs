//! Markdown cleanup pipeline
//!
//! Post-processes the raw Markdown coming out of the renderer. The steps run
//! in a fixed order:
//!
//! 1. `<br>` markers become newlines
//! 2. Inline `<a href="...">text</a>` anchors are rewritten into Markdown links
//!    by a small scanner (see [`rewrite_anchors`])
//! 3. `\_` is un-escaped inside link destinations
//! 4. `\_` and `\*` are un-escaped everywhere; page text has no literal
//!    emphasis syntax, so these escapes are always spurious
//! 5. Links whose text equals their destination fold into `<url>` autolinks
//! 6. Runs of two or more blank lines collapse to one blank line; a line
//!    holding only spaces or tabs counts as blank
//! 7. The named entities `&nbsp;`, `&lt;`, `&gt;`, `&quot;` and `&amp;` are
//!    decoded, then blank lines are collapsed again
//! 8. Trailing whitespace is trimmed from every line and from the document
//!
//! # Examples
//!
//! ```rust
//! use outline_markdown_converter::cleanup::clean_markdown;
//!
//! let raw = "See <a href=\"https://x.com\">Click</a>\n\n\n\nsnake\\_case";
//! assert_eq!(clean_markdown(raw), "See [Click](https://x.com)\n\nsnake_case");
//! ```
//!
//! Every step is fail-open: a regex that fails to compile skips its step, and
//! an anchor without a closing tag stops the anchor scan and leaves the rest
//! of the document untouched.

use percent_encoding::percent_decode_str;
use regex::{Captures, Regex};
use std::sync::OnceLock;

/// Run the whole cleanup pipeline over raw Markdown
pub fn clean_markdown(markdown: &str) -> String {
    let output = replace_line_breaks(markdown);
    let output = rewrite_anchors(&output);
    let output = unescape_link_destinations(&output);
    let output = output.replace("\\_", "_").replace("\\*", "*");
    let output = fold_naked_links(&output);
    let output = collapse_blank_lines(&output);
    let output = decode_entities(&output);
    let output = collapse_blank_lines(&output);
    trim_whitespace(&output)
}

fn replace_line_breaks(markdown: &str) -> String {
    static LINE_BREAK: OnceLock<Option<Regex>> = OnceLock::new();

    match LINE_BREAK.get_or_init(|| Regex::new(r"(?i)<br\s*/?>").ok()) {
        Some(regex) => regex.replace_all(markdown, "\n").into_owned(),
        None => markdown.to_string(),
    }
}

/// Anchor scanner states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    SeekingOpen,
    /// An opening tag starts at this byte offset
    SeekingClose(usize),
    Done,
}

const ANCHOR_CLOSE: &str = "</a>";

/// Rewrite inline HTML anchors into Markdown links
///
/// The scanner finds the first `<a` opening tag, then the first `</a>` after
/// it, and replaces the whole span:
///
/// - href and text both present and equivalent -> `<href>`
/// - both present but different -> `[text](href)`
/// - only an href -> `<href>`
/// - no href -> the inner text
///
/// Scanning restarts from the top after every rewrite. Anchors do not nest:
/// the first closing tag ends the anchor. An opening tag without a closing tag
/// ends the scan and leaves the remainder as it is.
///
/// ```rust
/// use outline_markdown_converter::cleanup::rewrite_anchors;
///
/// assert_eq!(
///     rewrite_anchors(r#"<a href="https://x.com">https://x.com</a>"#),
///     "<https://x.com>"
/// );
/// assert_eq!(rewrite_anchors("<a href=\"u\">open"), "<a href=\"u\">open");
/// ```
pub fn rewrite_anchors(markdown: &str) -> String {
    let mut text = markdown.to_string();
    let mut state = ScanState::SeekingOpen;

    loop {
        state = match state {
            ScanState::SeekingOpen => match find_anchor_open(&text) {
                Some(open) => ScanState::SeekingClose(open),
                None => ScanState::Done,
            },
            ScanState::SeekingClose(open) => match find_anchor_span(&text, open) {
                Some((body, close)) => {
                    let replacement = anchor_replacement(&text[open..body], &text[body..close]);
                    text.replace_range(open..close + ANCHOR_CLOSE.len(), &replacement);
                    ScanState::SeekingOpen
                }
                None => {
                    tracing::warn!(offset = open, "unterminated anchor, cleanup scan stopped");
                    ScanState::Done
                }
            },
            ScanState::Done => break,
        };
    }

    text
}

/// Byte offset of the first `<a` followed by whitespace or `>`
fn find_anchor_open(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut from = 0;

    while let Some(rel) = text[from..].find('<') {
        let pos = from + rel;
        if bytes.get(pos + 1).is_some_and(|b| b.eq_ignore_ascii_case(&b'a'))
            && bytes
                .get(pos + 2)
                .is_some_and(|b| *b == b'>' || b.is_ascii_whitespace())
        {
            return Some(pos);
        }
        from = pos + 1;
    }

    None
}

/// End of the opening tag and start of the matching `</a>`
fn find_anchor_span(text: &str, open: usize) -> Option<(usize, usize)> {
    let body = open + text[open..].find('>')? + 1;
    let close = body + find_ignore_ascii_case(&text[body..], ANCHOR_CLOSE)?;
    Some((body, close))
}

fn find_ignore_ascii_case(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle.as_bytes()))
}

fn anchor_replacement(open_tag: &str, inner: &str) -> String {
    let text = inner.trim();

    match extract_href(open_tag) {
        Some(href) if !text.is_empty() && !links_equivalent(text, &href) => {
            format!("[{}]({})", text, href)
        }
        Some(href) => format!("<{}>", href),
        None => text.to_string(),
    }
}

/// First quoted `href` value of an opening tag
fn extract_href(open_tag: &str) -> Option<String> {
    static HREF: OnceLock<Option<Regex>> = OnceLock::new();

    let regex = HREF
        .get_or_init(|| Regex::new(r#"(?i)\bhref\s*=\s*(?:"([^"]*)"|'([^']*)')"#).ok())
        .as_ref()?;
    let caps = regex.captures(open_tag)?;
    let href = caps.get(1).or_else(|| caps.get(2))?.as_str().trim();

    (!href.is_empty()).then(|| href.to_string())
}

/// Compare a link text with its destination, ignoring a trailing slash,
/// percent-encoding, backslash escapes and `&amp;` encoding
fn links_equivalent(text: &str, href: &str) -> bool {
    normalize_link(text) == normalize_link(href)
}

fn normalize_link(link: &str) -> String {
    let unescaped = link
        .replace("\\_", "_")
        .replace("\\*", "*")
        .replace("&amp;", "&");
    let decoded = percent_decode_str(&unescaped).decode_utf8_lossy();
    decoded.trim().trim_end_matches('/').to_string()
}

fn unescape_link_destinations(markdown: &str) -> String {
    static DESTINATION: OnceLock<Option<Regex>> = OnceLock::new();

    let Some(regex) = DESTINATION.get_or_init(|| Regex::new(r"\]\(([^)]*)\)").ok()) else {
        return markdown.to_string();
    };

    regex
        .replace_all(markdown, |caps: &Captures| {
            format!("]({})", caps[1].replace("\\_", "_"))
        })
        .into_owned()
}

/// Turn `[url](url)` into `<url>`; image syntax `![..](..)` is left alone
fn fold_naked_links(markdown: &str) -> String {
    static LINK: OnceLock<Option<Regex>> = OnceLock::new();

    let Some(regex) = LINK.get_or_init(|| Regex::new(r"\[([^\]\n]+)\]\(([^)\s]+)\)").ok()) else {
        return markdown.to_string();
    };

    let mut output = String::with_capacity(markdown.len());
    let mut last = 0;

    for caps in regex.captures_iter(markdown) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let is_image = markdown[..whole.start()].ends_with('!');
        let (text, href) = (&caps[1], &caps[2]);

        if !is_image && (text == href || links_equivalent(text, href)) {
            output.push_str(&markdown[last..whole.start()]);
            output.push('<');
            output.push_str(href);
            output.push('>');
            last = whole.end();
        }
    }

    output.push_str(&markdown[last..]);
    output
}

fn collapse_blank_lines(markdown: &str) -> String {
    static BLANK_LINES: OnceLock<Option<Regex>> = OnceLock::new();

    match BLANK_LINES.get_or_init(|| Regex::new(r"\n(?:[ \t]*\n){2,}").ok()) {
        Some(regex) => regex.replace_all(markdown, "\n\n").into_owned(),
        None => markdown.to_string(),
    }
}

/// `&amp;` goes last so `&amp;lt;` decodes to the text `&lt;`
fn decode_entities(markdown: &str) -> String {
    markdown
        .replace("&nbsp;", " ")
        .replace('\u{a0}', " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
}

fn trim_whitespace(markdown: &str) -> String {
    markdown
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
