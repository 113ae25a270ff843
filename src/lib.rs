//! Outline Markdown Converter
//!
//! This library converts outline-style note pages (an XML model of rich-text
//! notes, nested lists, tables and embedded images) into Markdown.
//!
//! # Architecture
//!
//! Data flows one way through the modules:
//!
//! - `page`: page XML parsing into the `model` types (roxmltree)
//! - `walker`: the list-context state machine producing canonical markup,
//!   helped by `content`, `inline`, `table` and `image`
//! - `assembler`: title, outlines and stray images into one document, and the
//!   public [`PageConverter`] entry point
//! - `parser` / `renderer`: canonical markup to raw Markdown (html5ever)
//! - `cleanup`: anchor rewriting, un-escaping, entity decoding and whitespace
//!   normalization of the raw Markdown
//! - `session`: per-call state (image counter, asset paths, resolver)
//! - `security`: element and URL sanitization used by the renderer
//!
//! # Example
//!
//! ```rust
//! use outline_markdown_converter::PageConverter;
//!
//! let page = r#"<one:Page xmlns:one="http://schemas.microsoft.com/office/onenote/2013/onenote">
//!   <one:Outline><one:OEChildren>
//!     <one:OE><one:T><![CDATA[Read <a href="https://example.com">the docs</a>]]></one:T></one:OE>
//!   </one:OEChildren></one:Outline>
//! </one:Page>"#;
//!
//! let dir = std::env::temp_dir();
//! let markdown = PageConverter::new().convert(page, &dir, "assets", None, "");
//! assert_eq!(markdown, "Read [the docs](https://example.com)");
//! ```

// Module declarations
pub mod assembler;
pub mod cleanup;
pub mod content;
pub mod error;
pub mod image;
pub mod inline;
pub mod model;
pub mod page;
pub mod parser;
pub mod renderer;
pub mod security;
pub mod session;
pub mod table;
pub mod walker;

// Re-export main types for convenience
pub use assembler::PageConverter;
pub use cleanup::clean_markdown;
pub use error::ConversionError;
pub use model::Document;
pub use page::parse_page;
pub use renderer::{MarkdownRenderer, MarkupRenderer, RenderOptions};
pub use session::{BinaryResolver, ConversionSession, SessionOptions};
