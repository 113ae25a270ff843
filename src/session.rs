//! Per-conversion session state
//!
//! A [`ConversionSession`] is born at the start of one page conversion and
//! dropped at its end. It owns the image counter and the asset paths, so a
//! shared [`crate::PageConverter`] never carries mutable state between calls.

use std::path::PathBuf;

/// Supplies binary payloads for images stored outside the page markup
///
/// Returning `None` means the reference could not be resolved; the image is
/// then rendered as a missing-data placeholder.
pub trait BinaryResolver {
    fn resolve(&self, id: &str) -> Option<Vec<u8>>;
}

impl<F> BinaryResolver for F
where
    F: Fn(&str) -> Option<Vec<u8>>,
{
    fn resolve(&self, id: &str) -> Option<Vec<u8>> {
        self(id)
    }
}

/// Where image assets go and how they are referenced
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Directory image files are written to (created on demand)
    pub asset_dir: PathBuf,
    /// Prefix used verbatim in emitted image references
    pub relative_prefix: String,
    /// Page-scoped filename prefix; keeps pages sharing one asset directory apart
    pub page_prefix: String,
}

impl SessionOptions {
    pub fn new(
        asset_dir: impl Into<PathBuf>,
        relative_prefix: impl Into<String>,
        page_prefix: impl Into<String>,
    ) -> Self {
        Self {
            asset_dir: asset_dir.into(),
            relative_prefix: relative_prefix.into(),
            page_prefix: page_prefix.into(),
        }
    }
}

/// Mutable state scoped to one document conversion
pub struct ConversionSession<'a> {
    options: SessionOptions,
    resolver: Option<&'a dyn BinaryResolver>,
    /// Images written so far; the next file gets `image_count + 1`
    image_count: u32,
}

impl<'a> ConversionSession<'a> {
    pub fn new(options: SessionOptions) -> Self {
        Self {
            options,
            resolver: None,
            image_count: 0,
        }
    }

    pub fn with_resolver(mut self, resolver: Option<&'a dyn BinaryResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn resolver(&self) -> Option<&'a dyn BinaryResolver> {
        self.resolver
    }

    /// Number of images written in this session
    pub fn image_count(&self) -> u32 {
        self.image_count
    }

    /// Claim the next image number (first call returns 1)
    pub fn next_image_number(&mut self) -> u32 {
        self.image_count += 1;
        self.image_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_starts_at_zero_and_is_monotonic() {
        let mut session = ConversionSession::new(SessionOptions::default());
        assert_eq!(session.image_count(), 0);
        assert_eq!(session.next_image_number(), 1);
        assert_eq!(session.next_image_number(), 2);
        assert_eq!(session.image_count(), 2);
    }

    #[test]
    fn test_closure_resolver() {
        let resolver = |id: &str| (id == "known").then(|| vec![1u8, 2, 3]);
        let session =
            ConversionSession::new(SessionOptions::default()).with_resolver(Some(&resolver));

        let resolver = session.resolver().expect("resolver set");
        assert_eq!(resolver.resolve("known"), Some(vec![1, 2, 3]));
        assert_eq!(resolver.resolve("other"), None);
    }

    #[test]
    fn test_fresh_sessions_do_not_share_counters() {
        let mut first = ConversionSession::new(SessionOptions::new("a", "a", "p1"));
        first.next_image_number();
        first.next_image_number();

        let mut second = ConversionSession::new(SessionOptions::new("a", "a", "p1"));
        assert_eq!(second.next_image_number(), 1);
    }
}
