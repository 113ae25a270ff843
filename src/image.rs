//! Image resource handler
//!
//! Decodes image payloads, writes them into the session's asset directory and
//! returns reference markup. Every failure is contained here: a missing
//! payload, an unresolvable reference, bad base64 or a failed write all turn
//! into a visible placeholder so the rest of the page still converts.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fs;

use crate::error::ConversionError;
use crate::inline::escape_html;
use crate::model::{Image, ImageFormat, ImageSource};
use crate::session::ConversionSession;

/// Placeholder emitted when an image has no usable data
pub const MISSING_DATA_PLACEHOLDER: &str = "<em>[Image: no embedded data]</em>";

/// Render one image, persisting its bytes when there are any
pub fn render_image(image: &Image, session: &mut ConversionSession<'_>) -> String {
    let result = match &image.source {
        ImageSource::Inline(data) if data.trim().is_empty() => return missing_data(),
        ImageSource::Missing => return missing_data(),
        ImageSource::Inline(data) => {
            decode_payload(data).and_then(|bytes| persist(&bytes, image.format, session))
        }
        ImageSource::Reference(id) => match resolve(id, session) {
            Ok(bytes) => persist(&bytes, image.format, session),
            Err(err) => {
                tracing::warn!(error = %err, "image reference not resolved");
                return missing_data();
            }
        },
    };

    result.unwrap_or_else(|err| {
        tracing::warn!(error = %err, "image export failed");
        failure_placeholder(&err)
    })
}

fn missing_data() -> String {
    MISSING_DATA_PLACEHOLDER.to_string()
}

fn failure_placeholder(err: &ConversionError) -> String {
    format!(
        "<em>[Image export failed: {}]</em>",
        escape_html(&err.to_string())
    )
}

fn decode_payload(data: &str) -> Result<Vec<u8>, ConversionError> {
    let cleaned: String = data.chars().filter(|c| !c.is_whitespace()).collect();
    Ok(STANDARD.decode(cleaned)?)
}

fn resolve(id: &str, session: &ConversionSession<'_>) -> Result<Vec<u8>, ConversionError> {
    session
        .resolver()
        .and_then(|resolver| resolver.resolve(id))
        .filter(|bytes| !bytes.is_empty())
        .ok_or_else(|| ConversionError::UnresolvedReference(id.to_string()))
}

fn persist(
    bytes: &[u8],
    format: ImageFormat,
    session: &mut ConversionSession<'_>,
) -> Result<String, ConversionError> {
    let number = session.next_image_number();
    let options = session.options();
    let filename = image_filename(&options.page_prefix, number, format.extension());

    fs::create_dir_all(&options.asset_dir)?;
    fs::write(options.asset_dir.join(&filename), bytes)?;

    tracing::debug!(file = %filename, bytes = bytes.len(), "image written");

    let src = reference_path(&options.relative_prefix, &filename);
    Ok(format!(
        "<img src=\"{}\" alt=\"{}\" />",
        escape_html(&src),
        escape_html(&filename)
    ))
}

/// Asset filename: zero-padded counter, optionally behind the page prefix
///
/// The prefix never leaves the asset directory: path separators and `..` in
/// it become underscores.
pub fn image_filename(page_prefix: &str, number: u32, extension: &str) -> String {
    let prefix = safe_prefix(page_prefix);
    if prefix.is_empty() {
        format!("image_{:04}.{}", number, extension)
    } else {
        format!("{}_image_{:04}.{}", prefix, number, extension)
    }
}

fn safe_prefix(page_prefix: &str) -> String {
    page_prefix
        .replace("..", "_")
        .replace(['/', '\\', '\0'], "_")
}

/// Forward-slash reference to an asset under the relative prefix
pub fn reference_path(relative_prefix: &str, filename: &str) -> String {
    let prefix = relative_prefix.replace('\\', "/");
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        filename.to_string()
    } else {
        format!("{}/{}", prefix, filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{BinaryResolver, SessionOptions};
    use std::path::Path;

    const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nfake";

    fn encoded(bytes: &[u8]) -> String {
        STANDARD.encode(bytes)
    }

    fn session_in<'a>(dir: &Path, prefix: &str) -> ConversionSession<'a> {
        ConversionSession::new(SessionOptions::new(dir, "assets", prefix))
    }

    #[test]
    fn test_filename_format() {
        assert_eq!(image_filename("", 7, "png"), "image_0007.png");
        assert_eq!(image_filename("page-2", 12, "jpg"), "page-2_image_0012.jpg");
        assert_eq!(image_filename("", 12345, "gif"), "image_12345.gif");
    }

    #[test]
    fn test_prefix_cannot_leave_asset_dir() {
        assert_eq!(image_filename("../x", 1, "png"), "__x_image_0001.png");
        assert_eq!(image_filename("a\\b/c", 2, "png"), "a_b_c_image_0002.png");

        let dir = tempfile::tempdir().expect("tempdir");
        let assets = dir.path().join("assets");
        let mut session = session_in(&assets, "../x");

        let markup = render_image(&Image::inline(&encoded(PNG_BYTES), ImageFormat::Png), &mut session);
        assert!(markup.contains("assets/__x_image_0001.png"));
        assert!(assets.join("__x_image_0001.png").exists());
        assert!(!dir.path().join("x_image_0001.png").exists());
        assert_eq!(std::fs::read_dir(dir.path()).expect("read dir").count(), 1);
    }

    #[test]
    fn test_reference_path_normalizes_separators() {
        assert_eq!(reference_path("assets", "a.png"), "assets/a.png");
        assert_eq!(reference_path("..\\notes\\assets\\", "a.png"), "../notes/assets/a.png");
        assert_eq!(reference_path("", "a.png"), "a.png");
    }

    #[test]
    fn test_blank_payload_is_placeholder_without_counting() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut session = session_in(dir.path(), "");

        for data in ["", "   \n\t"] {
            let image = Image::inline(data, ImageFormat::Png);
            assert_eq!(render_image(&image, &mut session), MISSING_DATA_PLACEHOLDER);
        }
        let missing = Image {
            source: ImageSource::Missing,
            format: ImageFormat::Png,
        };
        assert_eq!(render_image(&missing, &mut session), MISSING_DATA_PLACEHOLDER);

        assert_eq!(session.image_count(), 0);
    }

    #[test]
    fn test_inline_payload_is_written() {
        let dir = tempfile::tempdir().expect("tempdir");
        let assets = dir.path().join("assets");
        let mut session = session_in(&assets, "");

        // Payload text wrapped the way the source format wraps it
        let payload = encoded(PNG_BYTES);
        let (head, tail) = payload.split_at(4);
        let image = Image::inline(&format!("  {}\n  {}\n", head, tail), ImageFormat::Png);

        let markup = render_image(&image, &mut session);
        assert_eq!(
            markup,
            "<img src=\"assets/image_0001.png\" alt=\"image_0001.png\" />"
        );
        let written = std::fs::read(assets.join("image_0001.png")).expect("asset written");
        assert_eq!(written, PNG_BYTES);
    }

    #[test]
    fn test_consecutive_images_get_consecutive_numbers() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut session = session_in(dir.path(), "");

        let first = render_image(&Image::inline(&encoded(b"one"), ImageFormat::Jpeg), &mut session);
        let second = render_image(&Image::inline(&encoded(b"two"), ImageFormat::Gif), &mut session);

        assert!(first.contains("image_0001.jpg"));
        assert!(second.contains("image_0002.gif"));
        assert!(dir.path().join("image_0001.jpg").exists());
        assert!(dir.path().join("image_0002.gif").exists());
    }

    #[test]
    fn test_vector_formats_get_png_names() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut session = session_in(dir.path(), "p");

        let markup = render_image(&Image::inline(&encoded(b"emf"), ImageFormat::Emf), &mut session);
        assert!(markup.contains("p_image_0001.png"));
    }

    #[test]
    fn test_bad_base64_becomes_failure_placeholder() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut session = session_in(dir.path(), "");

        let markup = render_image(&Image::inline("!!not base64!!", ImageFormat::Png), &mut session);
        assert!(markup.starts_with("<em>[Image export failed: "));
        assert!(markup.contains("invalid base64 payload"));
        assert_eq!(session.image_count(), 0);
    }

    #[test]
    fn test_write_failure_becomes_failure_placeholder() {
        let dir = tempfile::tempdir().expect("tempdir");
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"file, not a directory").expect("write blocker");

        let mut session = session_in(&blocker.join("assets"), "");
        let markup = render_image(&Image::inline(&encoded(b"x"), ImageFormat::Png), &mut session);
        assert!(markup.starts_with("<em>[Image export failed: "));

        // The failed write does not stop later images
        let mut ok_session = session_in(dir.path(), "");
        let markup = render_image(&Image::inline(&encoded(b"x"), ImageFormat::Png), &mut ok_session);
        assert!(markup.starts_with("<img "));
    }

    #[test]
    fn test_reference_images_use_the_resolver() {
        let dir = tempfile::tempdir().expect("tempdir");
        let resolver = |id: &str| (id == "{img}").then(|| b"bytes".to_vec());
        let mut session = session_in(dir.path(), "").with_resolver(Some(&resolver));

        let markup = render_image(&Image::reference("{img}", ImageFormat::Bmp), &mut session);
        assert!(markup.contains("image_0001.bmp"));

        let markup = render_image(&Image::reference("{gone}", ImageFormat::Bmp), &mut session);
        assert_eq!(markup, MISSING_DATA_PLACEHOLDER);
        assert_eq!(session.image_count(), 1);
    }

    #[test]
    fn test_reference_without_resolver_is_placeholder() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut session = session_in(dir.path(), "");
        let markup = render_image(&Image::reference("{img}", ImageFormat::Png), &mut session);
        assert_eq!(markup, MISSING_DATA_PLACEHOLDER);
    }

    #[test]
    fn test_resolver_trait_object() {
        struct Fixed;
        impl BinaryResolver for Fixed {
            fn resolve(&self, _id: &str) -> Option<Vec<u8>> {
                Some(vec![0u8; 4])
            }
        }

        let dir = tempfile::tempdir().expect("tempdir");
        let resolver = Fixed;
        let mut session = session_in(dir.path(), "").with_resolver(Some(&resolver));
        let markup = render_image(&Image::reference("any", ImageFormat::Unknown), &mut session);
        assert!(markup.contains("image_0001.png"));
    }
}
