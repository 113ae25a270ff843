//! End-to-end page conversion tests
//!
//! Every test feeds real page XML through `PageConverter::convert` and checks
//! the final Markdown (and, for images, the asset directory).

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use outline_markdown_converter::PageConverter;
use outline_markdown_converter::session::BinaryResolver;
use std::path::Path;

const NS: &str = "http://schemas.microsoft.com/office/onenote/2013/onenote";

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// A page titled "Test" with one outline holding `items`
fn page(items: &str) -> String {
    format!(
        r#"<?xml version="1.0"?>
<one:Page xmlns:one="{NS}" name="Test">
  <one:Title><one:OE><one:T><![CDATA[Test]]></one:T></one:OE></one:Title>
  <one:Outline><one:OEChildren>{items}</one:OEChildren></one:Outline>
</one:Page>"#
    )
}

fn text(body: &str) -> String {
    format!("<one:OE><one:T><![CDATA[{body}]]></one:T></one:OE>")
}

fn bullet(body: &str) -> String {
    format!("<one:OE><one:List><one:Bullet bullet=\"2\"/></one:List><one:T><![CDATA[{body}]]></one:T></one:OE>")
}

fn numbered(body: &str) -> String {
    format!("<one:OE><one:List><one:Number number=\"0\" text=\"1.\"/></one:List><one:T><![CDATA[{body}]]></one:T></one:OE>")
}

fn blank() -> String {
    text("")
}

fn image(format: &str, data: &str) -> String {
    format!("<one:OE><one:Image format=\"{format}\"><one:Data>{data}</one:Data></one:Image></one:OE>")
}

fn convert_in(dir: &Path, xml: &str) -> String {
    init_tracing();
    PageConverter::new().convert(xml, dir.join("assets"), "assets", None, "")
}

fn convert(xml: &str) -> String {
    let dir = tempfile::tempdir().expect("tempdir");
    convert_in(dir.path(), xml)
}

/// Plain paragraphs, each separated by one blank line
#[test]
fn test_paragraphs() {
    let xml = page(&[text("Para one"), text("Para two")].concat());
    assert_eq!(convert(&xml), "# Test\n\nPara one\n\nPara two");
}

/// Content-free, unmarked items disappear and never leave more than one blank line
#[test]
fn test_blank_items_collapse_to_one_blank_line() {
    let xml = page(&[text("First"), blank(), blank(), blank(), blank(), text("Second")].concat());
    assert_eq!(convert(&xml), "# Test\n\nFirst\n\nSecond");
}

/// Blank filler items between bullets keep the list in one piece
#[test]
fn test_bullets_separated_by_blank_items_form_one_list() {
    let xml = page(&[bullet("alpha"), blank(), blank(), bullet("beta")].concat());
    assert_eq!(convert(&xml), "# Test\n\n- alpha\n- beta");
}

/// Switching list kinds ends the bullet list before the numbered one starts
#[test]
fn test_marker_switch() {
    let xml = page(&[bullet("a"), numbered("one"), numbered("two")].concat());
    assert_eq!(convert(&xml), "# Test\n\n- a\n\n1. one\n1. two");
}

/// A paragraph between bullets splits the list
#[test]
fn test_paragraph_splits_list() {
    let xml = page(&[bullet("a"), text("between"), bullet("b")].concat());
    assert_eq!(convert(&xml), "# Test\n\n- a\n\nbetween\n\n- b");
}

/// Nested child lists render indented under their parent item
#[test]
fn test_nested_list() {
    let xml = page(
        "<one:OE><one:List><one:Bullet/></one:List><one:T>Socks</one:T><one:OEChildren>\
           <one:OE><one:List><one:Number/></one:List><one:T>Wool</one:T></one:OE>\
           <one:OE><one:List><one:Number/></one:List><one:T>Cotton</one:T></one:OE>\
         </one:OEChildren></one:OE>",
    );
    assert_eq!(convert(&xml), "# Test\n\n- Socks\n  1. Wool\n  1. Cotton");
}

/// Special characters in plain text survive the whole pipeline unchanged
#[test]
fn test_special_characters_round_trip() {
    let xml = page(&text("Hello & <World> snake_case 2*3"));
    assert_eq!(convert(&xml), "# Test\n\nHello & <World> snake_case 2*3");
}

/// Plain text that looks like a tag is content, not a blank filler
#[test]
fn test_tag_like_plain_text_is_kept() {
    let xml = page(&[text("<TODO>"), text("next")].concat());
    assert_eq!(convert(&xml), "# Test\n\n<TODO>\n\nnext");

    let xml = page(&[bullet("a"), text("<TODO>"), bullet("b")].concat());
    assert_eq!(convert(&xml), "# Test\n\n- a\n\n<TODO>\n\n- b");
}

/// Bold and italic together: strong outermost
#[test]
fn test_bold_italic_style() {
    let xml = page(
        "<one:OE><one:T style=\"font-weight: bold; font-style: italic\">both</one:T></one:OE>\
         <one:OE><one:T style=\"text-decoration:line-through\">gone</one:T></one:OE>",
    );
    assert_eq!(convert(&xml), "# Test\n\n***both***\n\n~~gone~~");
}

/// Styled spans in embedded markup become Markdown emphasis
#[test]
fn test_embedded_span_styles() {
    let xml = page(&text(
        "<span style='font-weight:bold'>bold</span> <span style='font-style:italic'>it</span> \
         <span style='background:yellow;mso-highlight:yellow'>hi</span> <span lang=en-US>plain</span>",
    ));
    assert_eq!(convert(&xml), "# Test\n\n**bold** *it* ==hi== plain");
}

/// Anchor with identical text becomes an autolink
#[test]
fn test_anchor_autolink() {
    let xml = page(&text("<a href=\"https://x.com\">https://x.com</a>"));
    assert_eq!(convert(&xml), "# Test\n\n<https://x.com>");
}

/// Anchor with descriptive text becomes a Markdown link
#[test]
fn test_anchor_link() {
    let xml = page(&text("Go: <a\nhref=\"https://x.com/my_page\">Click</a>"));
    assert_eq!(convert(&xml), "# Test\n\nGo: [Click](https://x.com/my_page)");
}

/// Underscores in a URL written as link text do not break equivalence
#[test]
fn test_anchor_with_underscore_text() {
    let xml = page(&text("<a href=\"https://x.com/my_page/\">https://x.com/my_page</a>"));
    assert_eq!(convert(&xml), "# Test\n\n<https://x.com/my_page/>");
}

/// Line breaks inside a run become newlines
#[test]
fn test_line_breaks() {
    let xml = page(&text("one<br>two<br />three"));
    assert_eq!(convert(&xml), "# Test\n\none\ntwo\nthree");
}

/// The first row is the header row, whatever it holds
#[test]
fn test_table() {
    let cell = |body: &str| {
        format!("<one:Cell><one:OEChildren><one:OE><one:T><![CDATA[{body}]]></one:T></one:OE></one:OEChildren></one:Cell>")
    };
    let xml = page(&format!(
        "<one:OE><one:Table><one:Row>{}{}</one:Row><one:Row>{}{}</one:Row></one:Table></one:OE>",
        cell("Mon"),
        cell("Paris"),
        cell("Tue"),
        cell("Rome")
    ));
    assert_eq!(
        convert(&xml),
        "# Test\n\n| Mon | Paris |\n| --- | --- |\n| Tue | Rome |"
    );
}

/// Multi-item cells join their runs on one line; nested cell lists are not rendered
#[test]
fn test_table_cell_boundaries() {
    let xml = page(
        "<one:OE><one:Table><one:Row><one:Cell><one:OEChildren>\
           <one:OE><one:T>first</one:T></one:OE>\
           <one:OE><one:T>second</one:T><one:OEChildren><one:OE><one:T>hidden</one:T></one:OE></one:OEChildren></one:OE>\
         </one:OEChildren></one:Cell></one:Row></one:Table></one:OE>",
    );
    let markdown = convert(&xml);
    assert_eq!(markdown, "# Test\n\n| first second |\n| --- |");
    assert!(!markdown.contains("hidden"));
}

/// Inline payloads are written to the asset directory with sequential names
#[test]
fn test_images_are_written_with_sequential_names() {
    let dir = tempfile::tempdir().expect("tempdir");
    let xml = page(
        &[
            image("png", &STANDARD.encode(b"first")),
            image("jpeg", &STANDARD.encode(b"second")),
        ]
        .concat(),
    );

    let markdown = convert_in(dir.path(), &xml);
    assert_eq!(
        markdown,
        "# Test\n\n![image_0001.png](assets/image_0001.png)\n\n![image_0002.jpg](assets/image_0002.jpg)"
    );

    let assets = dir.path().join("assets");
    assert_eq!(std::fs::read(assets.join("image_0001.png")).expect("first"), b"first");
    assert_eq!(std::fs::read(assets.join("image_0002.jpg")).expect("second"), b"second");
}

/// A blank payload becomes a placeholder and uses no image number
#[test]
fn test_missing_payload_placeholder() {
    let dir = tempfile::tempdir().expect("tempdir");
    let xml = page(&[image("png", "  "), image("png", &STANDARD.encode(b"real"))].concat());

    let markdown = convert_in(dir.path(), &xml);
    assert_eq!(
        markdown,
        "# Test\n\n*[Image: no embedded data]*\n\n![image_0001.png](assets/image_0001.png)"
    );
}

/// A corrupt payload is reported inline and the rest of the page still converts
#[test]
fn test_corrupt_payload_does_not_abort_page() {
    let xml = page(&[image("png", "%%%"), text("after")].concat());
    let markdown = convert(&xml);
    assert!(markdown.contains("[Image export failed: "));
    assert!(markdown.ends_with("after"));
}

/// Out-of-band images go through the resolver; unresolved ones become placeholders
#[test]
fn test_resolver_images() {
    init_tracing();
    let dir = tempfile::tempdir().expect("tempdir");
    let xml = page(
        "<one:OE><one:Image format=\"gif\"><one:CallbackID callbackID=\"{known}\"/></one:Image></one:OE>\
         <one:OE><one:Image format=\"gif\"><one:CallbackID callbackID=\"{unknown}\"/></one:Image></one:OE>",
    );
    let resolver = |id: &str| (id == "{known}").then(|| b"GIF89a".to_vec());

    let markdown = PageConverter::new().convert(
        &xml,
        dir.path().join("media"),
        "../media",
        Some(&resolver as &dyn BinaryResolver),
        "",
    );

    assert_eq!(
        markdown,
        "# Test\n\n![image_0001.gif](../media/image_0001.gif)\n\n*[Image: no embedded data]*"
    );
    assert!(dir.path().join("media/image_0001.gif").exists());
}

/// The page prefix keeps pages apart inside one asset directory
#[test]
fn test_page_prefix() {
    init_tracing();
    let dir = tempfile::tempdir().expect("tempdir");
    let xml = page(&image("bmp", &STANDARD.encode(b"BM")));

    let converter = PageConverter::new();
    let first = converter.convert(&xml, dir.path(), "", None, "page-1");
    let second = converter.convert(&xml, dir.path(), "", None, "page-2");

    assert_eq!(first, "# Test\n\n![page-1_image_0001.bmp](page-1_image_0001.bmp)");
    assert_eq!(second, "# Test\n\n![page-2_image_0001.bmp](page-2_image_0001.bmp)");
}

/// A page prefix with path components still writes inside the asset directory
#[test]
fn test_page_prefix_stays_in_asset_dir() {
    init_tracing();
    let dir = tempfile::tempdir().expect("tempdir");
    let assets = dir.path().join("assets");
    let xml = page(&image("png", &STANDARD.encode(b"png")));

    let markdown = PageConverter::new().convert(&xml, &assets, "assets", None, "../escaped");

    assert_eq!(markdown, "# Test\n\n![__escaped_image_0001.png](assets/__escaped_image_0001.png)");
    assert!(assets.join("__escaped_image_0001.png").exists());
    assert!(!dir.path().join("escaped_image_0001.png").exists());
}

/// Nested styled spans keep both styles
#[test]
fn test_nested_span_styles() {
    let xml = page(&text(
        "<span style='font-weight:bold'><span style='font-style:italic'>x</span></span> y",
    ));
    assert_eq!(convert(&xml), "# Test\n\n***x*** y");
}

/// Stray page-level images come after all outlines
#[test]
fn test_stray_images_last() {
    let xml = format!(
        r#"<one:Page xmlns:one="{NS}">
  <one:Image format="png"><one:Data>{}</one:Data></one:Image>
  <one:Outline><one:OEChildren>{}</one:OEChildren></one:Outline>
</one:Page>"#,
        STANDARD.encode(b"stray"),
        text("body")
    );
    assert_eq!(convert(&xml), "body\n\n![image_0001.png](assets/image_0001.png)");
}

/// Malformed or foreign markup yields empty output instead of an error
#[test]
fn test_malformed_input_is_empty() {
    assert_eq!(convert(""), "");
    assert_eq!(convert("<one:Page xmlns:one=\"x\"><one:Outline>"), "");
    assert_eq!(convert("<Notebook name=\"n\"/>"), "");
}

/// A page with no outlines and no title renders to nothing
#[test]
fn test_empty_page() {
    assert_eq!(convert(&format!("<one:Page xmlns:one=\"{NS}\"/>")), "");
}

/// One converter shared across threads; each call numbers its images from 1
#[test]
fn test_shared_converter_across_threads() {
    init_tracing();
    let converter = PageConverter::new();
    let xml = page(&image("png", &STANDARD.encode(b"png")));

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|n| {
                let converter = &converter;
                let xml = &xml;
                scope.spawn(move || {
                    let dir = tempfile::tempdir().expect("tempdir");
                    let prefix = format!("p{n}");
                    let markdown = converter.convert(xml, dir.path(), "a", None, &prefix);
                    markdown.contains(&format!("{prefix}_image_0001.png"))
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.join().expect("thread panicked"));
        }
    });
}
