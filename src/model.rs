//! Outline document model
//!
//! A page is parsed once into these types by [`crate::page::parse_page`] and is
//! immutable afterwards. The shape mirrors the page markup: a document holds
//! outlines, an outline holds one child list, and every content item may hold
//! another child list, so nesting depth is unbounded.

/// Substrings that mark a text run as carrying pre-embedded markup
const MARKUP_OPENERS: &[&str] = &[
    "<span", "<a ", "<a>", "<a\n", "<a\t", "<b>", "<i>", "<strong", "<em>", "<del>", "<br",
];

/// A parsed page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    /// Plain-text page title
    pub title: Option<String>,
    /// Top-level content containers in document order
    pub outlines: Vec<Outline>,
    /// Page-level images that sit outside any outline
    pub images: Vec<Image>,
}

/// A top-level content container wrapping one child list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outline {
    pub children: Vec<ContentItem>,
}

/// Classification of a content item
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ListMarker {
    #[default]
    None,
    Bullet,
    Numbered,
}

impl ListMarker {
    pub fn is_list(self) -> bool {
        !matches!(self, ListMarker::None)
    }
}

/// One node of a child list
///
/// Rendering order is fixed: runs, tables, images, then the nested child list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentItem {
    pub marker: ListMarker,
    pub runs: Vec<TextRun>,
    pub tables: Vec<Table>,
    pub images: Vec<Image>,
    pub children: Vec<ContentItem>,
}

impl ContentItem {
    /// Plain, unstyled text item
    pub fn text(text: &str) -> Self {
        Self {
            runs: vec![TextRun::plain(text)],
            ..Default::default()
        }
    }

    /// Text item carrying a list marker
    pub fn list_item(marker: ListMarker, text: &str) -> Self {
        Self {
            marker,
            ..Self::text(text)
        }
    }
}

/// Recognized inline formatting, derived once from a raw style attribute
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStyle {
    pub bold: bool,
    pub italic: bool,
    pub strikethrough: bool,
    pub highlight: bool,
}

impl RunStyle {
    /// Derive the formatting flags from a free-form CSS-like style string
    ///
    /// Matching ignores case and whitespace, so `font-weight: bold` and
    /// `FONT-WEIGHT:bold` are the same declaration.
    pub fn parse(style: &str) -> Self {
        let compact: String = style
            .chars()
            .filter(|c| !c.is_whitespace())
            .flat_map(char::to_lowercase)
            .collect();

        Self {
            bold: compact.contains("font-weight:bold"),
            italic: compact.contains("font-style:italic"),
            strikethrough: compact.contains("line-through"),
            highlight: compact.contains("background:yellow")
                || compact.contains("background-color:yellow"),
        }
    }
}

/// A single run of text inside a content item
#[derive(Debug, Clone, PartialEq)]
pub enum TextRun {
    /// Plain text plus the formatting derived from its style attribute
    Plain { text: String, style: RunStyle },
    /// Pre-embedded inline markup, passed through after normalization
    Markup(String),
}

impl TextRun {
    pub fn plain(text: &str) -> Self {
        TextRun::Plain {
            text: text.to_string(),
            style: RunStyle::default(),
        }
    }

    /// Classify raw run text: markup if it opens a recognized inline construct
    pub fn classify(text: &str, style: Option<&str>) -> Self {
        if has_embedded_markup(text) {
            TextRun::Markup(text.to_string())
        } else {
            TextRun::Plain {
                text: text.to_string(),
                style: style.map(RunStyle::parse).unwrap_or_default(),
            }
        }
    }
}

/// Returns true if `text` opens an emphasis, anchor, or span construct
pub fn has_embedded_markup(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    MARKUP_OPENERS.iter().any(|opener| lower.contains(opener))
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub rows: Vec<Row>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    pub cells: Vec<Cell>,
}

/// A table cell; only the direct runs of its items are ever rendered
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cell {
    pub children: Vec<ContentItem>,
}

/// Format tag carried by an image
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpg,
    Jpeg,
    Gif,
    Bmp,
    Emf,
    Wmf,
    #[default]
    Unknown,
}

impl ImageFormat {
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "png" => ImageFormat::Png,
            "jpg" => ImageFormat::Jpg,
            "jpeg" => ImageFormat::Jpeg,
            "gif" => ImageFormat::Gif,
            "bmp" => ImageFormat::Bmp,
            "emf" => ImageFormat::Emf,
            "wmf" => ImageFormat::Wmf,
            _ => ImageFormat::Unknown,
        }
    }

    /// Destination file extension
    ///
    /// Vector formats are not rasterized; they get a `png` name as a lossy
    /// placeholder, same as unrecognized tags.
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Jpg | ImageFormat::Jpeg => "jpg",
            ImageFormat::Gif => "gif",
            ImageFormat::Bmp => "bmp",
            ImageFormat::Png | ImageFormat::Emf | ImageFormat::Wmf | ImageFormat::Unknown => "png",
        }
    }
}

/// Where an image's bytes come from
#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
    /// Base64 payload embedded in the page (possibly blank)
    Inline(String),
    /// Out-of-band id resolved through a [`crate::session::BinaryResolver`]
    Reference(String),
    /// Neither payload nor reference present
    Missing,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub source: ImageSource,
    pub format: ImageFormat,
}

impl Image {
    pub fn inline(data: &str, format: ImageFormat) -> Self {
        Self {
            source: ImageSource::Inline(data.to_string()),
            format,
        }
    }

    pub fn reference(id: &str, format: ImageFormat) -> Self {
        Self {
            source: ImageSource::Reference(id.to_string()),
            format,
        }
    }
}
