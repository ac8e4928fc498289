//! Error types for the shpz library.
//!
//! This module defines all error types that can occur while parsing or
//! writing Shapefile containers and while compressing or decompressing the
//! compact representation.

use thiserror::Error;

use crate::types::ShapeType;

pub type ShpzResult<T> = Result<T, ShpzError>;

/// Errors that can occur during Shapefile and compact-buffer processing.
#[derive(Error, Debug)]
pub enum ShpzError {
    /// Reached end of buffer while reading data.
    #[error("unexpected end of stream")]
    EndOfStream,

    /// The container does not start with the Shapefile magic number.
    #[error("invalid file code: expected 9994, found {0}")]
    InvalidFileCode(i32),

    /// A shape type code is not part of the ESRI enumeration.
    #[error("unrecognized shape type: {0}")]
    InvalidShapeType(i32),

    /// Generic format error with context.
    #[error("format error: {0}")]
    Format(String),

    /// The shape type cannot be serialized in this position.
    #[error("unsupported shape type: {0}")]
    UnsupportedType(ShapeType),

    /// The compact buffer declares a format version this codec does not know.
    #[error("unsupported compact format version: {0} (expected 1 or 2)")]
    UnsupportedVersion(u8),

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ShpzError {
    /// Returns true for errors caused by malformed input data.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            ShpzError::EndOfStream
                | ShpzError::InvalidFileCode(_)
                | ShpzError::InvalidShapeType(_)
                | ShpzError::Format(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_error_family() {
        assert!(ShpzError::InvalidFileCode(1).is_format_error());
        assert!(ShpzError::InvalidShapeType(2).is_format_error());
        assert!(ShpzError::Format("bad".into()).is_format_error());
        assert!(!ShpzError::UnsupportedVersion(3).is_format_error());
        assert!(!ShpzError::UnsupportedType(ShapeType::Point).is_format_error());
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            ShpzError::InvalidFileCode(42).to_string(),
            "invalid file code: expected 9994, found 42"
        );
        assert_eq!(
            ShpzError::UnsupportedType(ShapeType::MultiPatch).to_string(),
            "unsupported shape type: MultiPatch"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let err: ShpzError =
            std::io::Error::new(std::io::ErrorKind::WriteZero, "sink full").into();
        assert!(matches!(err, ShpzError::IoError(_)));
        assert!(!err.is_format_error());
    }
}
