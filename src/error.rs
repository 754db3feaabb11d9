//! Error types for style transfer.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the style-transfer library.
#[derive(Error, Debug)]
pub enum Error {
    /// A required file upload is absent from the request.
    #[error("missing upload '{field}'")]
    MissingUpload { field: String },

    /// The `image_size` form field is not an integer.
    #[error("invalid literal for image_size: '{value}'")]
    ImageSizeParse {
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },

    /// Invalid parameter value.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    /// An uploaded buffer could not be decoded as an image.
    #[error("failed to decode '{field}' image: {source}")]
    ImageDecode {
        field: String,
        #[source]
        source: image::ImageError,
    },

    /// The stylized image could not be encoded.
    #[error("failed to encode output image: {source}")]
    ImageEncode {
        #[source]
        source: image::ImageError,
    },

    /// Failed to download a model.
    #[error("failed to download model {name}: {source}")]
    ModelDownload {
        name: String,
        #[source]
        source: reqwest::Error,
    },

    /// Model file does not exist on disk.
    #[error("model file not found: {}", path.display())]
    ModelNotFound { path: PathBuf },

    /// Failed to load an ONNX model.
    #[error("failed to load ONNX model {name}: {source}")]
    ModelLoad {
        name: String,
        #[source]
        source: ort::Error,
    },

    /// Model inference failed.
    #[error("model inference failed: {source}")]
    Inference {
        #[source]
        source: ort::Error,
    },

    /// Inference failed inside a non-ONNX model implementation.
    #[error("model inference failed: {0}")]
    Model(String),

    /// Failed to create cache directory.
    #[error("failed to create cache directory {path}: {source}")]
    CacheDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Shape mismatch in tensor operations.
    #[error("tensor shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    /// The response body could not be serialized.
    #[error("failed to serialize response body: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Coarse classification of an [`Error`].
///
/// Every kind surfaces to the caller as the same 500 envelope; the kind is only
/// used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or malformed upload, bad `image_size`.
    Request,
    /// Model acquisition or inference failure.
    Model,
    /// Image decode/encode or body serialization failure.
    Encoding,
}

impl ErrorKind {
    /// Returns the kind as a string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::Model => "model",
            Self::Encoding => "encoding",
        }
    }
}

impl Error {
    /// Classify this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingUpload { .. }
            | Self::ImageSizeParse { .. }
            | Self::InvalidParameter { .. } => ErrorKind::Request,
            Self::ModelDownload { .. }
            | Self::ModelNotFound { .. }
            | Self::ModelLoad { .. }
            | Self::Inference { .. }
            | Self::Model(_)
            | Self::CacheDir { .. }
            | Self::Io(_)
            | Self::ShapeMismatch { .. } => ErrorKind::Model,
            Self::ImageDecode { .. } | Self::ImageEncode { .. } | Self::Serialize(_) => {
                ErrorKind::Encoding
            }
        }
    }
}

/// Result type alias for style-transfer operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        let missing = Error::MissingUpload {
            field: "content".to_string(),
        };
        assert_eq!(missing.kind(), ErrorKind::Request);

        let parse = "abc".parse::<i64>().unwrap_err();
        let bad_size = Error::ImageSizeParse {
            value: "abc".to_string(),
            source: parse,
        };
        assert_eq!(bad_size.kind(), ErrorKind::Request);

        assert_eq!(Error::Model("boom".to_string()).kind(), ErrorKind::Model);
    }

    #[test]
    fn test_messages_name_the_field() {
        let err = Error::MissingUpload {
            field: "style".to_string(),
        };
        assert_eq!(err.to_string(), "missing upload 'style'");

        let parse = "12.5".parse::<i64>().unwrap_err();
        let err = Error::ImageSizeParse {
            value: "12.5".to_string(),
            source: parse,
        };
        assert!(err.to_string().contains("'12.5'"));
    }
}
