//! Canonical markup parser using html5ever
//!
//! The outline walker produces an HTML-like intermediate markup. This module
//! parses it into an `RcDom` for the [`crate::renderer`], following the
//! WHATWG HTML5 parsing algorithm so stray or unbalanced tags coming from
//! pre-embedded run markup are recovered the same way a browser would.
//!
//! # Examples
//!
//! ```rust
//! use outline_markdown_converter::parser::parse_markup;
//!
//! let dom = parse_markup("<h1>Hello</h1><p>World").expect("parsed");
//! ```
//!
//! # Configuration
//!
//! - **Scripting**: Disabled (scripts are not executed)
//! - **Document mode**: Standards mode; a doctype is prepended so a block such
//!   as `<table>` closes an open paragraph instead of nesting in it
//! - **Tree Builder**: Uses RcDom for reference-counted DOM nodes

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::RcDom;

use crate::error::ConversionError;

const DOCUMENT_PREFIX: &str = "<!DOCTYPE html><html><body>";
const DOCUMENT_SUFFIX: &str = "</body></html>";

/// Parse canonical markup into a DOM tree
///
/// # Errors
///
/// - `ConversionError::InvalidInput`: markup is empty
pub fn parse_markup(markup: &str) -> Result<RcDom, ConversionError> {
    if markup.is_empty() {
        return Err(ConversionError::InvalidInput(
            "Markup input is empty".to_string(),
        ));
    }

    let mut document =
        String::with_capacity(DOCUMENT_PREFIX.len() + markup.len() + DOCUMENT_SUFFIX.len());
    document.push_str(DOCUMENT_PREFIX);
    document.push_str(markup);
    document.push_str(DOCUMENT_SUFFIX);

    let dom = parse_document(RcDom::default(), Default::default()).one(document.as_str());

    Ok(dom)
}
