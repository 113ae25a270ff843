//! Document assembler and the public conversion entry point
//!
//! [`PageConverter`] drives one page through the whole pipeline:
//!
//! ```text
//! page XML -> Document -> canonical markup -> raw Markdown -> clean Markdown
//!   (page)              (assembler/walker)    (renderer)      (cleanup)
//! ```
//!
//! The converter only holds its renderer. Everything mutable (the image
//! counter, asset paths, the resolver) lives in a [`ConversionSession`]
//! created per call, so one converter can serve any number of pages and
//! threads.

use std::path::Path;

use crate::cleanup::clean_markdown;
use crate::content::strip_tags;
use crate::error::ConversionError;
use crate::image::render_image;
use crate::inline::escape_html;
use crate::model::{Document, has_embedded_markup};
use crate::page::parse_page;
use crate::renderer::{MarkdownRenderer, MarkupRenderer};
use crate::session::{BinaryResolver, ConversionSession, SessionOptions};
use crate::walker::render_child_list;

/// Assemble a document into canonical markup
///
/// Title first, then every outline in order, then page-level images, each in
/// its own paragraph.
pub fn render_document(document: &Document, session: &mut ConversionSession<'_>) -> String {
    let mut output = String::new();

    if let Some(title) = document.title.as_deref() {
        output.push_str(&render_title(title));
    }

    for outline in &document.outlines {
        output.push_str(&render_child_list(&outline.children, session));
    }

    for image in &document.images {
        output.push_str("<p>");
        output.push_str(&render_image(image, session));
        output.push_str("</p>");
    }

    output
}

fn render_title(title: &str) -> String {
    // Markup titles are already entity-encoded
    let text = if has_embedded_markup(title) {
        strip_tags(title).trim().to_string()
    } else {
        escape_html(title.trim())
    };

    if text.is_empty() {
        String::new()
    } else {
        format!("<h1>{}</h1>", text)
    }
}

/// Converts outline pages into Markdown
///
/// ```rust
/// use outline_markdown_converter::PageConverter;
///
/// let page = r#"<Page><Title><OE><T>Groceries</T></OE></Title><Outline><OEChildren>
///   <OE><List><Bullet/></List><T>milk</T></OE>
///   <OE><List><Bullet/></List><T>eggs</T></OE>
/// </OEChildren></Outline></Page>"#;
///
/// let dir = std::env::temp_dir();
/// let markdown = PageConverter::new().convert(page, &dir, "assets", None, "");
/// assert_eq!(markdown, "# Groceries\n\n- milk\n- eggs");
/// ```
pub struct PageConverter<R = MarkdownRenderer> {
    renderer: R,
}

impl PageConverter<MarkdownRenderer> {
    /// Create a converter using the bundled Markdown renderer
    pub fn new() -> Self {
        Self::with_renderer(MarkdownRenderer::new())
    }
}

impl Default for PageConverter<MarkdownRenderer> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: MarkupRenderer> PageConverter<R> {
    /// Create a converter around a custom markup renderer
    pub fn with_renderer(renderer: R) -> Self {
        Self { renderer }
    }

    /// Convert one page to Markdown
    ///
    /// Never fails: malformed page markup or a renderer failure is logged and
    /// yields an empty string. Image failures become placeholders in the text.
    ///
    /// # Arguments
    ///
    /// * `markup` - Raw page XML
    /// * `asset_dir` - Directory image files are written to (created on demand)
    /// * `relative_prefix` - Prefix for image references in the Markdown
    /// * `resolver` - Supplies bytes for images stored outside the page
    /// * `page_prefix` - Filename prefix keeping pages apart in a shared asset directory
    pub fn convert(
        &self,
        markup: &str,
        asset_dir: impl AsRef<Path>,
        relative_prefix: &str,
        resolver: Option<&dyn BinaryResolver>,
        page_prefix: &str,
    ) -> String {
        match self.try_convert(markup, asset_dir, relative_prefix, resolver, page_prefix) {
            Ok(markdown) => markdown,
            Err(err) => {
                tracing::warn!(error = %err, code = err.code(), "page conversion failed, returning empty output");
                String::new()
            }
        }
    }

    /// Convert one page, surfacing parse and render errors
    ///
    /// # Errors
    ///
    /// - `ConversionError::ParseError`: the page markup is not a well-formed page
    /// - `ConversionError::InvalidInput`: the canonical markup nests too deeply
    pub fn try_convert(
        &self,
        markup: &str,
        asset_dir: impl AsRef<Path>,
        relative_prefix: &str,
        resolver: Option<&dyn BinaryResolver>,
        page_prefix: &str,
    ) -> Result<String, ConversionError> {
        let _span = tracing::info_span!("convert_page", page_prefix).entered();

        let options = SessionOptions::new(asset_dir.as_ref(), relative_prefix, page_prefix);
        tracing::debug!(
            asset_dir = %options.asset_dir.display(),
            relative_prefix,
            "converting page"
        );

        let document = parse_page(markup)?;
        let mut session = ConversionSession::new(options).with_resolver(resolver);

        let canonical = self.render_markup(&document, &mut session);
        let raw = self.renderer.render(&canonical)?;
        let markdown = clean_markdown(&raw);

        tracing::debug!(
            images = session.image_count(),
            bytes = markdown.len(),
            "page converted"
        );

        Ok(markdown)
    }

    /// Canonical markup for a parsed document, before rendering and cleanup
    pub fn render_markup(&self, document: &Document, session: &mut ConversionSession<'_>) -> String {
        render_document(document, session)
    }
}
