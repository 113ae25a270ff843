//! Generic Markdown renderer - transforms canonical markup into raw Markdown
//!
//! The outline walker emits a small HTML vocabulary (headings, paragraphs,
//! lists, tables, inline emphasis, anchors, images, line breaks). This module
//! turns that markup into Markdown by a depth-first traversal of the html5ever
//! DOM. Its output is *raw* Markdown: anchors are passed through as inline
//! HTML and line breaks as literal `<br>` markers, both of which the
//! [`crate::cleanup`] pipeline rewrites afterwards.
//!
//! The renderer sits behind the [`MarkupRenderer`] trait so callers can plug
//! in a different engine; [`MarkdownRenderer`] is the bundled default.
//!
//! # Element Handlers
//!
//! - **Headings (h1-h6)**: ATX-style headings (`#` to `######`)
//! - **Paragraphs (p)**: Text with blank line separation
//! - **Lists (ul, ol, li)**: `- ` / `1. ` items, two spaces per nesting level.
//!   A list nested directly inside another list (not inside an `li`) is
//!   rendered one level deeper, and other blocks inside a list become
//!   indented continuation paragraphs.
//! - **Emphasis**: `strong`/`b` -> `**`, `em`/`i` -> `*`, `del`/`s`/`strike`
//!   -> `~~`, `mark` -> `==`
//! - **Anchors (a)**: `<a href="...">text</a>` passthrough
//! - **Images (img)**: `![alt](src)`
//! - **Tables**: GFM pipe tables, first row as header
//! - **Line breaks (br)**: `<br>` marker, or a space inside table cells
//!
//! # Example
//!
//! Input markup:
//! ```html
//! <h1>Title</h1>
//! <ul><li>one</li><li><strong>two</strong></li></ul>
//! ```
//!
//! Output Markdown:
//! ```markdown
//! # Title
//!
//! - one
//! - **two**
//! ```

use markup5ever_rcdom::{Handle, NodeData, RcDom};

use crate::error::ConversionError;
use crate::parser::parse_markup;
use crate::security::{MAX_NESTING_DEPTH, SanitizeAction, SecurityValidator};

/// Converts canonical markup into raw Markdown
pub trait MarkupRenderer {
    fn render(&self, markup: &str) -> Result<String, ConversionError>;
}

/// Renderer options
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Maximum element nesting depth before rendering is refused
    pub max_depth: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            max_depth: MAX_NESTING_DEPTH,
        }
    }
}

/// Where in the document a node is being rendered
#[derive(Debug, Clone, Copy, Default)]
struct RenderContext {
    /// Number of enclosing lists
    list_depth: usize,
    /// Inside a table cell, where Markdown cannot break lines
    in_cell: bool,
}

impl RenderContext {
    fn nested_list(self) -> Self {
        Self {
            list_depth: self.list_depth + 1,
            ..self
        }
    }

    fn cell(self) -> Self {
        Self {
            in_cell: true,
            ..self
        }
    }
}

/// Default html5ever-backed renderer
///
/// The renderer is stateless; one instance may render any number of
/// documents, from any number of threads.
///
/// ```rust
/// use outline_markdown_converter::renderer::{MarkdownRenderer, MarkupRenderer};
///
/// let renderer = MarkdownRenderer::new();
/// let markdown = renderer.render("<h1>Hello</h1><p>World</p>").expect("rendered");
/// assert_eq!(markdown, "# Hello\n\nWorld\n");
/// ```
pub struct MarkdownRenderer {
    security_validator: SecurityValidator,
}

impl MarkupRenderer for MarkdownRenderer {
    fn render(&self, markup: &str) -> Result<String, ConversionError> {
        if markup.trim().is_empty() {
            return Ok(String::new());
        }
        let dom = parse_markup(markup)?;
        self.convert(&dom)
    }
}

impl MarkdownRenderer {
    /// Create a renderer with default options
    pub fn new() -> Self {
        Self::with_options(RenderOptions::default())
    }

    /// Create a renderer with custom options
    pub fn with_options(options: RenderOptions) -> Self {
        Self {
            security_validator: SecurityValidator::with_max_depth(options.max_depth),
        }
    }

    /// Convert a parsed DOM tree to Markdown
    ///
    /// # Errors
    ///
    /// Returns `ConversionError::InvalidInput` when elements nest deeper than
    /// the configured maximum depth.
    pub fn convert(&self, dom: &RcDom) -> Result<String, ConversionError> {
        let mut output = String::with_capacity(1024);
        self.traverse_node(&dom.document, &mut output, 0, RenderContext::default())?;
        Ok(self.normalize_output(output))
    }

    fn traverse_node(
        &self,
        node: &Handle,
        output: &mut String,
        depth: usize,
        ctx: RenderContext,
    ) -> Result<(), ConversionError> {
        match node.data {
            NodeData::Document => {
                for child in node.children.borrow().iter() {
                    self.traverse_node(child, output, depth, ctx)?;
                }
            }
            NodeData::Element { ref name, .. } => {
                let tag_name = name.local.as_ref();
                self.handle_element(node, tag_name, output, depth, ctx)?;
            }
            NodeData::Text { ref contents } => {
                self.push_text(&contents.borrow(), output);
            }
            NodeData::Comment { .. }
            | NodeData::Doctype { .. }
            | NodeData::ProcessingInstruction { .. } => {}
        }

        Ok(())
    }

    fn traverse_children(
        &self,
        node: &Handle,
        output: &mut String,
        depth: usize,
        ctx: RenderContext,
    ) -> Result<(), ConversionError> {
        for child in node.children.borrow().iter() {
            self.traverse_node(child, output, depth + 1, ctx)?;
        }
        Ok(())
    }

    fn handle_element(
        &self,
        node: &Handle,
        tag_name: &str,
        output: &mut String,
        depth: usize,
        ctx: RenderContext,
    ) -> Result<(), ConversionError> {
        if self.security_validator.check_element(tag_name) == SanitizeAction::Remove {
            return Ok(());
        }

        self.security_validator
            .validate_depth(depth)
            .map_err(ConversionError::InvalidInput)?;

        match tag_name {
            "h1" => self.handle_heading(node, 1, output, depth, ctx)?,
            "h2" => self.handle_heading(node, 2, output, depth, ctx)?,
            "h3" => self.handle_heading(node, 3, output, depth, ctx)?,
            "h4" => self.handle_heading(node, 4, output, depth, ctx)?,
            "h5" => self.handle_heading(node, 5, output, depth, ctx)?,
            "h6" => self.handle_heading(node, 6, output, depth, ctx)?,

            "p" => self.handle_paragraph(node, output, depth, ctx)?,

            "a" => self.handle_link(node, output, depth, ctx)?,
            "img" => self.handle_image(node, output),

            "ul" => self.handle_list(node, output, depth, ctx, false)?,
            "ol" => self.handle_list(node, output, depth, ctx, true)?,
            // A stray item outside any list
            "li" => self.handle_list_item(node, output, depth, ctx, false)?,

            "strong" | "b" => self.handle_inline(node, "**", output, depth, ctx)?,
            "em" | "i" => self.handle_inline(node, "*", output, depth, ctx)?,
            "del" | "s" | "strike" => self.handle_inline(node, "~~", output, depth, ctx)?,
            "mark" => self.handle_inline(node, "==", output, depth, ctx)?,

            "table" => self.handle_table(node, output, depth, ctx)?,

            "br" => {
                if ctx.in_cell {
                    output.push(' ');
                } else {
                    output.push_str("<br>");
                }
            }

            _ => self.traverse_children(node, output, depth, ctx)?,
        }

        Ok(())
    }

    fn handle_heading(
        &self,
        node: &Handle,
        level: usize,
        output: &mut String,
        depth: usize,
        ctx: RenderContext,
    ) -> Result<(), ConversionError> {
        let mut content = String::new();
        self.traverse_children(node, &mut content, depth, ctx)?;
        let normalized = self.normalize_text(&content);
        if normalized.is_empty() {
            return Ok(());
        }

        ensure_blank_line(output);
        for _ in 0..level {
            output.push('#');
        }
        output.push(' ');
        output.push_str(&normalized);
        output.push_str("\n\n");

        Ok(())
    }

    fn handle_paragraph(
        &self,
        node: &Handle,
        output: &mut String,
        depth: usize,
        ctx: RenderContext,
    ) -> Result<(), ConversionError> {
        let mut content = String::new();
        self.traverse_children(node, &mut content, depth, ctx)?;
        let content = content.trim();
        if content.is_empty() {
            return Ok(());
        }

        ensure_blank_line(output);
        output.push_str(content);
        output.push_str("\n\n");

        Ok(())
    }

    /// Pass an anchor through as inline HTML for the cleanup pipeline
    ///
    /// Anchors without a usable `href` degrade to their text.
    fn handle_link(
        &self,
        node: &Handle,
        output: &mut String,
        depth: usize,
        ctx: RenderContext,
    ) -> Result<(), ConversionError> {
        let href = attribute(node, "href")
            .filter(|url| self.security_validator.sanitize_url(url).is_some());

        let mut text = String::new();
        self.traverse_children(node, &mut text, depth, ctx)?;

        match href {
            Some(url) => {
                let inner = text.trim();
                if text.starts_with(char::is_whitespace) {
                    push_separator(output);
                }
                output.push_str("<a href=\"");
                output.push_str(&url.replace('"', "&quot;"));
                output.push_str("\">");
                output.push_str(inner);
                output.push_str("</a>");
                if !inner.is_empty() && text.ends_with(char::is_whitespace) {
                    output.push(' ');
                }
            }
            None => output.push_str(&text),
        }

        Ok(())
    }

    fn handle_image(&self, node: &Handle, output: &mut String) {
        let Some(src) = attribute(node, "src") else {
            return;
        };
        let Some(safe_src) = self.security_validator.sanitize_url(&src) else {
            return;
        };
        let alt = attribute(node, "alt").unwrap_or_default();

        output.push_str("![");
        output.push_str(&alt);
        output.push_str("](");
        output.push_str(safe_src);
        output.push(')');
    }

    /// Wrap inline content in a symmetric Markdown marker
    ///
    /// Surrounding whitespace is moved outside the markers; empty content
    /// emits nothing.
    fn handle_inline(
        &self,
        node: &Handle,
        marker: &str,
        output: &mut String,
        depth: usize,
        ctx: RenderContext,
    ) -> Result<(), ConversionError> {
        let mut content = String::new();
        self.traverse_children(node, &mut content, depth, ctx)?;

        let inner = content.trim();
        if inner.is_empty() {
            if !content.is_empty() {
                push_separator(output);
            }
            return Ok(());
        }

        if content.starts_with(char::is_whitespace) {
            push_separator(output);
        }
        output.push_str(marker);
        output.push_str(inner);
        output.push_str(marker);
        if content.ends_with(char::is_whitespace) {
            output.push(' ');
        }

        Ok(())
    }

    fn handle_list(
        &self,
        node: &Handle,
        output: &mut String,
        depth: usize,
        ctx: RenderContext,
        ordered: bool,
    ) -> Result<(), ConversionError> {
        if ctx.list_depth == 0 {
            ensure_blank_line(output);
        } else if !output.is_empty() && !output.ends_with('\n') {
            output.push('\n');
        }

        for child in node.children.borrow().iter() {
            match child.data {
                NodeData::Element { ref name, .. } => match name.local.as_ref() {
                    "li" => self.handle_list_item(child, output, depth + 1, ctx, ordered)?,
                    "ul" => self.handle_list(child, output, depth + 1, ctx.nested_list(), false)?,
                    "ol" => self.handle_list(child, output, depth + 1, ctx.nested_list(), true)?,
                    _ => self.handle_list_continuation(child, output, depth + 1, ctx)?,
                },
                NodeData::Text { ref contents } => {
                    if !contents.borrow().trim().is_empty() {
                        self.handle_list_continuation(child, output, depth + 1, ctx)?;
                    }
                }
                _ => {}
            }
        }

        if ctx.list_depth == 0 && !output.ends_with("\n\n") {
            output.push('\n');
        }

        Ok(())
    }

    fn handle_list_item(
        &self,
        node: &Handle,
        output: &mut String,
        depth: usize,
        ctx: RenderContext,
        ordered: bool,
    ) -> Result<(), ConversionError> {
        let mut line = String::new();
        let mut line_written = false;

        for child in node.children.borrow().iter() {
            let nested_ordered = match child.data {
                NodeData::Element { ref name, .. } => match name.local.as_ref() {
                    "ul" => Some(false),
                    "ol" => Some(true),
                    _ => None,
                },
                _ => None,
            };

            match nested_ordered {
                Some(nested_ordered) => {
                    if !line_written {
                        write_list_line(output, ctx.list_depth, ordered, &line);
                        line_written = true;
                        line.clear();
                    }
                    self.handle_list(child, output, depth + 1, ctx.nested_list(), nested_ordered)?;
                }
                None => self.traverse_node(child, &mut line, depth + 1, ctx)?,
            }
        }

        if !line_written {
            write_list_line(output, ctx.list_depth, ordered, &line);
        } else if !line.trim().is_empty() {
            write_indented(output, ctx.list_depth + 1, line.trim());
        }

        Ok(())
    }

    /// A non-item block sitting directly inside a list
    fn handle_list_continuation(
        &self,
        node: &Handle,
        output: &mut String,
        depth: usize,
        ctx: RenderContext,
    ) -> Result<(), ConversionError> {
        let mut content = String::new();
        self.traverse_node(node, &mut content, depth, ctx)?;
        let content = content.trim();
        if content.is_empty() {
            return Ok(());
        }

        ensure_blank_line(output);
        write_indented(output, ctx.list_depth + 1, content);

        Ok(())
    }

    fn handle_table(
        &self,
        node: &Handle,
        output: &mut String,
        depth: usize,
        ctx: RenderContext,
    ) -> Result<(), ConversionError> {
        let mut rows: Vec<Vec<String>> = Vec::new();
        self.collect_table_rows(node, &mut rows, depth + 1, ctx)?;

        let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
        if columns == 0 {
            return Ok(());
        }

        ensure_blank_line(output);
        write_gfm_table(output, &rows, columns);

        if !output.ends_with("\n\n") {
            output.push('\n');
        }

        Ok(())
    }

    fn collect_table_rows(
        &self,
        node: &Handle,
        rows: &mut Vec<Vec<String>>,
        depth: usize,
        ctx: RenderContext,
    ) -> Result<(), ConversionError> {
        for child in node.children.borrow().iter() {
            if let NodeData::Element { ref name, .. } = child.data {
                match name.local.as_ref() {
                    "thead" | "tbody" | "tfoot" => {
                        self.collect_table_rows(child, rows, depth + 1, ctx)?
                    }
                    "tr" => rows.push(self.extract_table_row(child, depth + 1, ctx)?),
                    _ => {}
                }
            }
        }
        Ok(())
    }

    fn extract_table_row(
        &self,
        tr: &Handle,
        depth: usize,
        ctx: RenderContext,
    ) -> Result<Vec<String>, ConversionError> {
        let mut cells = Vec::new();
        for child in tr.children.borrow().iter() {
            if let NodeData::Element { ref name, .. } = child.data {
                let tag = name.local.as_ref();
                if tag == "td" || tag == "th" {
                    let mut cell_output = String::new();
                    self.traverse_children(child, &mut cell_output, depth, ctx.cell())?;
                    let normalized = self.normalize_text(&cell_output);
                    cells.push(normalized.replace('|', "\\|"));
                }
            }
        }
        Ok(cells)
    }

    /// Append a text node: whitespace collapsed, Markdown-significant
    /// characters escaped, surrounding whitespace kept as single spaces
    fn push_text(&self, text: &str, output: &mut String) {
        let normalized = self.normalize_text(text);
        if normalized.is_empty() {
            if !text.is_empty() {
                push_separator(output);
            }
            return;
        }

        if text.starts_with(char::is_whitespace) {
            push_separator(output);
        }
        escape_markdown_text(&normalized, output);
        if text.ends_with(char::is_whitespace) {
            output.push(' ');
        }
    }

    fn normalize_text(&self, text: &str) -> String {
        let words: Vec<&str> = text.split_whitespace().collect();
        words.join(" ")
    }

    fn normalize_output(&self, output: String) -> String {
        // Step 1: Normalize line endings (CRLF -> LF)
        let output = output.replace("\r\n", "\n");

        let mut result = String::with_capacity(output.len());
        let mut prev_blank = false;

        for line in output.lines() {
            // Step 2: Remove trailing whitespace from all lines
            let trimmed = line.trim_end();

            if trimmed.is_empty() {
                // Step 3: Collapse consecutive blank lines, never lead with one
                if !prev_blank && !result.is_empty() {
                    result.push('\n');
                    prev_blank = true;
                }
            } else {
                // Step 4: Collapse interior runs of spaces
                result.push_str(&self.normalize_line_whitespace(trimmed));
                result.push('\n');
                prev_blank = false;
            }
        }

        // Step 5: Single trailing newline
        while result.ends_with("\n\n") {
            result.pop();
        }

        result
    }

    fn normalize_line_whitespace(&self, line: &str) -> String {
        let mut result = String::with_capacity(line.len());
        let mut prev_space = false;
        let mut at_start = true;

        for ch in line.chars() {
            if ch == ' ' {
                if at_start {
                    // Leading spaces carry list indentation
                    result.push(ch);
                } else if !prev_space {
                    result.push(ch);
                    prev_space = true;
                }
            } else {
                result.push(ch);
                prev_space = false;
                at_start = false;
            }
        }

        result
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

fn attribute(node: &Handle, name: &str) -> Option<String> {
    if let NodeData::Element { ref attrs, .. } = node.data {
        attrs
            .borrow()
            .iter()
            .find(|attr| attr.name.local.as_ref() == name)
            .map(|attr| attr.value.to_string())
    } else {
        None
    }
}

/// Ensure a blank line separates the next block from what came before
fn ensure_blank_line(output: &mut String) {
    if !output.is_empty() && !output.ends_with("\n\n") {
        if output.ends_with('\n') {
            output.push('\n');
        } else {
            output.push_str("\n\n");
        }
    }
}

/// Single space between inline pieces, unless one is already there
fn push_separator(output: &mut String) {
    if !output.ends_with(char::is_whitespace) {
        output.push(' ');
    }
}

fn escape_markdown_text(text: &str, output: &mut String) {
    for ch in text.chars() {
        match ch {
            '*' => output.push_str("\\*"),
            '_' => output.push_str("\\_"),
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            _ => output.push(ch),
        }
    }
}

/// Write one list item line; continuation lines are indented under the marker
fn write_list_line(output: &mut String, list_depth: usize, ordered: bool, content: &str) {
    let indent = "  ".repeat(list_depth);
    let marker = if ordered { "1. " } else { "- " };

    let mut lines = content.trim().lines();
    output.push_str(&indent);
    output.push_str(marker);
    output.push_str(lines.next().unwrap_or_default().trim());
    output.push('\n');

    let continuation = " ".repeat(indent.len() + marker.len());
    for line in lines {
        if !line.trim().is_empty() {
            output.push_str(&continuation);
            output.push_str(line);
        }
        output.push('\n');
    }
}

fn write_indented(output: &mut String, levels: usize, content: &str) {
    let indent = "  ".repeat(levels);
    for line in content.lines() {
        if !line.trim().is_empty() {
            output.push_str(&indent);
            output.push_str(line);
        }
        output.push('\n');
    }
}

fn write_gfm_table(output: &mut String, rows: &[Vec<String>], columns: usize) {
    let Some((header, body)) = rows.split_first() else {
        return;
    };

    write_table_row(output, header, columns);

    output.push('|');
    for _ in 0..columns {
        output.push_str(" --- |");
    }
    output.push('\n');

    for row in body {
        write_table_row(output, row, columns);
    }
}

/// Pads short rows so every row has `columns` cells
fn write_table_row(output: &mut String, row: &[String], columns: usize) {
    output.push('|');
    for index in 0..columns {
        output.push(' ');
        if let Some(cell) = row.get(index) {
            output.push_str(cell);
        }
        output.push_str(" |");
    }
    output.push('\n');
}
