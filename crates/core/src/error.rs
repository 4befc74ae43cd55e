//! Error types for Prism operations.
//!
//! This module defines the main error type [`PrismError`] which represents
//! everything that can go wrong while reading an input, parsing it into an
//! [`Article`](crate::Article), and rendering that article.
//!
//! Missing optional fields (no DOI, no abstract, no figures) are never errors:
//! parsers fall back to defaults instead. A formula that cannot be converted to
//! LaTeX is dropped without surfacing an error either.
//!
//! # Example
//!
//! ```rust
//! use prism_core::{PrismError, parse_xml};
//!
//! match parse_xml("<article><front>") {
//!     Ok(article) => println!("{}", article.title),
//!     Err(PrismError::MalformedDocument(reason)) => eprintln!("bad input: {reason}"),
//!     Err(e) => eprintln!("error: {e}"),
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for article conversion.
#[derive(Error, Debug)]
pub enum PrismError {
    /// The input cannot be parsed as the claimed format.
    ///
    /// Returned for XML syntax errors, mismatched or unclosed elements, and
    /// documents without a root element. HTML input is parsed leniently and
    /// never produces this variant.
    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    /// HTML selector errors.
    ///
    /// Returned when a custom [`HtmlConfig`](crate::HtmlConfig) carries a CSS
    /// selector that does not parse.
    #[error("Failed to parse HTML: {0}")]
    HtmlParseError(String),

    /// Invalid citation link pattern in a custom configuration.
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    /// Unknown input or output format name, or an unrecognized file extension.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// File not found.
    ///
    /// Returned when attempting to read a file that doesn't exist.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// File read and write errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors.
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for PrismError.
///
/// This is a convenience alias for `std::result::Result<T, PrismError>`.
pub type Result<T> = std::result::Result<T, PrismError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PrismError::MalformedDocument("unexpected end of input".to_string());
        assert!(err.to_string().contains("Malformed document"));
        assert!(err.to_string().contains("unexpected end of input"));
    }

    #[test]
    fn test_file_not_found_display() {
        let err = PrismError::FileNotFound(PathBuf::from("missing.xml"));
        assert_eq!(err.to_string(), "File not found: missing.xml");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: PrismError = io.into();
        assert!(matches!(err, PrismError::Io(_)));
    }

    #[test]
    fn test_unsupported_format() {
        let err = PrismError::UnsupportedFormat("pdf".to_string());
        assert!(err.to_string().contains("pdf"));
    }
}
