//! Error types for the exporter.
//!
//! Extraction misses are not errors: extractors return `None` and the unit is
//! dropped. Everything here either fails a single unit ([`RenderError`]) or a
//! whole page/format conversion ([`ConvertError`]).

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for page conversion.
pub type Result<T> = std::result::Result<T, ConvertError>;

/// The page markup could not be turned into a content tree.
#[derive(Error, Debug)]
pub enum ParseError {
    /// Low-level markup syntax error reported by the reader.
    #[error("markup syntax error at byte {position}: {message}")]
    Syntax { position: u64, message: String },

    /// The input contained no root element.
    #[error("markup has no root element")]
    NoRoot,

    /// A second top-level element followed the root.
    #[error("markup has more than one root element (found <{0}>)")]
    MultipleRoots(String),

    /// An end tag did not match the open element.
    #[error("mismatched end tag </{found}>, expected </{expected}>")]
    MismatchedEnd { expected: String, found: String },

    /// Input ended while elements were still open.
    #[error("unexpected end of markup, <{0}> is not closed")]
    Unclosed(String),
}

/// A renderer failed on one unit. The unit is dropped and the page continues.
#[derive(Error, Debug)]
pub enum RenderError {
    /// Writing the transient image file failed.
    #[error("temporary image file: {0}")]
    TempFile(#[from] io::Error),

    /// Image bytes could not be decoded or re-encoded.
    #[error("image decoding error: {0}")]
    Image(#[from] image::ImageError),

    /// The unit cannot be laid out on the target.
    #[error("layout error: {0}")]
    Layout(String),
}

/// Fatal failure of one page/format conversion.
#[derive(Error, Debug)]
pub enum ConvertError {
    /// The page markup is malformed.
    #[error("failed to parse page markup: {0}")]
    Parse(#[from] ParseError),

    /// Writing the output file failed.
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The output backend could not serialize the document.
    #[error("failed to save document: {0}")]
    Save(String),
}

/// Configuration file problems.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The file is not valid TOML for [`crate::ExportOptions`].
    #[error("invalid config {path}: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::MismatchedEnd {
            expected: "OE".to_string(),
            found: "T".to_string(),
        };
        assert_eq!(err.to_string(), "mismatched end tag </T>, expected </OE>");
        assert_eq!(
            ParseError::Unclosed("Page".to_string()).to_string(),
            "unexpected end of markup, <Page> is not closed"
        );
    }

    #[test]
    fn test_convert_error_from_parse() {
        let err: ConvertError = ParseError::NoRoot.into();
        assert!(matches!(err, ConvertError::Parse(ParseError::NoRoot)));
        assert!(err.to_string().contains("no root element"));
    }

    #[test]
    fn test_render_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let err: RenderError = io_err.into();
        assert!(err.to_string().starts_with("temporary image file"));
    }
}
