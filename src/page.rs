//! Page markup parser
//!
//! Turns the raw XML page returned by the hierarchy provider into a
//! [`Document`]. Elements are matched by local name, so the vendor namespace
//! prefix (`one:OE`, `one:T`, ...) is irrelevant. Unknown elements are skipped.
//!
//! ```rust
//! use outline_markdown_converter::page::parse_page;
//!
//! let xml = r#"<Page><Title><OE><T>Notes</T></OE></Title>
//!   <Outline><OEChildren><OE><T>Hello</T></OE></OEChildren></Outline></Page>"#;
//! let doc = parse_page(xml).expect("valid page");
//! assert_eq!(doc.title.as_deref(), Some("Notes"));
//! assert_eq!(doc.outlines[0].children.len(), 1);
//! ```

use roxmltree::Node;

use crate::error::ConversionError;
use crate::model::{
    Cell, ContentItem, Document, Image, ImageFormat, ImageSource, ListMarker, Outline, Row,
    Table, TextRun,
};

const PAGE: &str = "Page";
const TITLE: &str = "Title";
const OUTLINE: &str = "Outline";
const CHILDREN: &str = "OEChildren";
const ITEM: &str = "OE";
const LIST: &str = "List";
const BULLET: &str = "Bullet";
const NUMBER: &str = "Number";
const TEXT: &str = "T";
const TABLE: &str = "Table";
const ROW: &str = "Row";
const CELL: &str = "Cell";
const IMAGE: &str = "Image";
const IMAGE_DATA: &str = "Data";
const CALLBACK: &str = "CallbackID";

/// Parse page markup into a document
///
/// # Errors
///
/// Returns `ConversionError::ParseError` if the markup is not well-formed XML
/// or its root element is not a page.
pub fn parse_page(markup: &str) -> Result<Document, ConversionError> {
    let xml = roxmltree::Document::parse(markup)
        .map_err(|e| ConversionError::ParseError(format!("XML parsing error: {}", e)))?;

    let root = xml.root_element();
    if root.tag_name().name() != PAGE {
        return Err(ConversionError::ParseError(format!(
            "Root element is <{}>, expected <{}>",
            root.tag_name().name(),
            PAGE
        )));
    }

    let title = child_elements(root, TITLE).next().map(title_text);

    let outlines = child_elements(root, OUTLINE)
        .map(|outline| Outline {
            children: child_elements(outline, CHILDREN)
                .next()
                .map(parse_child_list)
                .unwrap_or_default(),
        })
        .collect();

    let images = child_elements(root, IMAGE).map(parse_image).collect();

    Ok(Document {
        title,
        outlines,
        images,
    })
}

/// Raw title text: every run of every title item, concatenated
fn title_text(title: Node) -> String {
    title
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == TEXT)
        .map(element_text)
        .collect()
}

fn parse_child_list(list: Node) -> Vec<ContentItem> {
    child_elements(list, ITEM).map(parse_content_item).collect()
}

fn parse_content_item(node: Node) -> ContentItem {
    let mut item = ContentItem::default();
    let item_style = node.attribute("style");

    for child in node.children().filter(Node::is_element) {
        match child.tag_name().name() {
            LIST => item.marker = parse_list_marker(child),
            TEXT => {
                let style = child.attribute("style").or(item_style);
                item.runs.push(TextRun::classify(&element_text(child), style));
            }
            TABLE => item.tables.push(parse_table(child)),
            IMAGE => item.images.push(parse_image(child)),
            CHILDREN => item.children.extend(parse_child_list(child)),
            _ => {}
        }
    }

    item
}

fn parse_list_marker(list: Node) -> ListMarker {
    for child in list.children().filter(Node::is_element) {
        match child.tag_name().name() {
            BULLET => return ListMarker::Bullet,
            NUMBER => return ListMarker::Numbered,
            _ => {}
        }
    }
    ListMarker::None
}

fn parse_table(node: Node) -> Table {
    Table {
        rows: child_elements(node, ROW)
            .map(|row| Row {
                cells: child_elements(row, CELL)
                    .map(|cell| Cell {
                        children: child_elements(cell, CHILDREN)
                            .flat_map(parse_child_list)
                            .collect(),
                    })
                    .collect(),
            })
            .collect(),
    }
}

fn parse_image(node: Node) -> Image {
    let format = node
        .attribute("format")
        .map(ImageFormat::from_tag)
        .unwrap_or_default();

    let source = if let Some(data) = child_elements(node, IMAGE_DATA).next() {
        ImageSource::Inline(element_text(data))
    } else if let Some(id) = child_elements(node, CALLBACK)
        .next()
        .and_then(|callback| callback.attribute("callbackID"))
    {
        ImageSource::Reference(id.to_string())
    } else {
        ImageSource::Missing
    };

    Image { source, format }
}

/// Direct element children with the given local name
fn child_elements<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children()
        .filter(move |n| n.is_element() && n.tag_name().name() == name)
}

/// Concatenated text (including CDATA) directly under an element
fn element_text(node: Node) -> String {
    node.children()
        .filter(Node::is_text)
        .filter_map(|n| n.text())
        .collect()
}
