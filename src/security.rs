//! Safety checks applied while rendering canonical markup
//!
//! Run text on a page may carry pre-embedded markup, and that markup reaches
//! the renderer verbatim. This module decides what of it is allowed through:
//!
//! - Executable or resource-loading elements (`<script>`, `<iframe>`, ...)
//!   are removed together with their children
//! - Link and image URLs with executable or local schemes (`javascript:`,
//!   `data:`, `file:`, ...) are dropped
//! - Element nesting is bounded so hostile input cannot overflow the stack
//!
//! Attributes other than `href`, `src` and `alt` are never copied into the
//! Markdown output, so event handlers need no separate treatment.

/// Maximum allowed nesting depth for markup elements
pub const MAX_NESTING_DEPTH: usize = 1000;

/// Elements removed entirely, children included
const DANGEROUS_ELEMENTS: &[&str] = &[
    "script",   // JavaScript execution
    "style",    // Stylesheet text, never content
    "noscript", // Alternative content
    "iframe",   // Embedded documents
    "object",   // Plugins
    "embed",    // Plugins
    "applet",   // Legacy Java applets
    "link",     // External stylesheets
    "base",     // Rebases relative URLs
    "template", // Inert fragments
];

/// URL schemes that never survive into a link or image reference
const DANGEROUS_URL_SCHEMES: &[&str] = &[
    "javascript:",
    "data:",
    "vbscript:",
    "file:",
    "about:",
];

/// Action to take for an element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SanitizeAction {
    /// Render the element
    Allow,
    /// Drop the element and all its children
    Remove,
}

/// Security validator for canonical markup
pub struct SecurityValidator {
    /// Maximum allowed nesting depth
    max_depth: usize,
}

impl SecurityValidator {
    /// Create a new security validator with default settings
    pub fn new() -> Self {
        Self {
            max_depth: MAX_NESTING_DEPTH,
        }
    }

    /// Create a security validator with custom maximum depth
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Check if an element should be rendered
    ///
    /// # Examples
    ///
    /// ```
    /// use outline_markdown_converter::security::{SecurityValidator, SanitizeAction};
    ///
    /// let validator = SecurityValidator::new();
    /// assert_eq!(validator.check_element("script"), SanitizeAction::Remove);
    /// assert_eq!(validator.check_element("li"), SanitizeAction::Allow);
    /// ```
    pub fn check_element(&self, tag_name: &str) -> SanitizeAction {
        if DANGEROUS_ELEMENTS.contains(&tag_name) {
            SanitizeAction::Remove
        } else {
            SanitizeAction::Allow
        }
    }

    /// Check if a URL uses a dangerous scheme
    ///
    /// Leading whitespace and letter case are ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// use outline_markdown_converter::security::SecurityValidator;
    ///
    /// let validator = SecurityValidator::new();
    /// assert!(validator.is_dangerous_url("  JavaScript:alert(1)"));
    /// assert!(!validator.is_dangerous_url("assets/image_0001.png"));
    /// ```
    pub fn is_dangerous_url(&self, url: &str) -> bool {
        let url_lower = url.trim_start().to_lowercase();
        DANGEROUS_URL_SCHEMES
            .iter()
            .any(|scheme| url_lower.starts_with(scheme))
    }

    /// Validate nesting depth
    ///
    /// Returns `Err` with a description when `depth` exceeds the maximum.
    pub fn validate_depth(&self, depth: usize) -> Result<(), String> {
        if depth > self.max_depth {
            Err(format!(
                "Markup nesting depth {} exceeds maximum allowed depth {}",
                depth, self.max_depth
            ))
        } else {
            Ok(())
        }
    }

    /// Returns `None` if the URL is dangerous, `Some(url)` if safe
    pub fn sanitize_url<'a>(&self, url: &'a str) -> Option<&'a str> {
        if self.is_dangerous_url(url) {
            None
        } else {
            Some(url)
        }
    }
}

impl Default for SecurityValidator {
    fn default() -> Self {
        Self::new()
    }
}
