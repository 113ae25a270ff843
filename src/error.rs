//! Error types for conversion operations

use std::fmt;

/// Errors that can occur while converting page markup to Markdown
///
/// None of these are fatal to an export: [`crate::PageConverter::convert`]
/// folds every variant into empty output or a visible placeholder.
#[derive(Debug)]
pub enum ConversionError {
    /// Page markup could not be parsed into a document
    ParseError(String),
    /// An image payload could not be decoded or persisted
    ResourceError(String),
    /// The binary resolver had no data for an out-of-band reference
    UnresolvedReference(String),
    /// Invalid input data
    InvalidInput(String),
    /// Internal error
    InternalError(String),
}

impl ConversionError {
    /// Get numeric error code
    pub fn code(&self) -> u32 {
        match self {
            ConversionError::ParseError(_) => 1,
            ConversionError::ResourceError(_) => 2,
            ConversionError::UnresolvedReference(_) => 3,
            ConversionError::InvalidInput(_) => 5,
            ConversionError::InternalError(_) => 99,
        }
    }
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            ConversionError::ResourceError(msg) => write!(f, "Resource error: {}", msg),
            ConversionError::UnresolvedReference(id) => {
                write!(f, "No binary data for reference '{}'", id)
            }
            ConversionError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            ConversionError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ConversionError {}

impl From<std::io::Error> for ConversionError {
    fn from(err: std::io::Error) -> Self {
        ConversionError::ResourceError(err.to_string())
    }
}

impl From<base64::DecodeError> for ConversionError {
    fn from(err: base64::DecodeError) -> Self {
        ConversionError::ResourceError(format!("invalid base64 payload: {}", err))
    }
}
