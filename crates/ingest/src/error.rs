//! Error types produced by the ingest crate.
//!
//! All errors are typed, cloneable, and comparable so callers can tell a
//! missing file from an undecodable one or a failed detection, and record the
//! cause next to the degraded (empty) fingerprint.
//!
//! | Error | Category | Description |
//! |-------|----------|-------------|
//! | [`Io`](IngestError::Io) | I/O | File or directory could not be read |
//! | [`NotADirectory`](IngestError::NotADirectory) | Inventory | Corpus root is not a directory |
//! | [`Decode`](IngestError::Decode) | Image | Bytes are not a supported image |
//! | [`Detect`](IngestError::Detect) | Detection | External keypoint provider failed |
//! | [`Sidecar`](IngestError::Sidecar) | Detection | Stored keypoints could not be parsed |
//! | [`InvalidConfig`](IngestError::InvalidConfig) | Config | Inventory configuration rejected |

use std::path::Path;

use thiserror::Error;

/// Failure reported by an external keypoint provider.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("keypoint detection failed: {0}")]
pub struct DetectError(pub String);

impl DetectError {
    pub fn new<E: std::fmt::Display>(err: E) -> Self {
        DetectError(err.to_string())
    }
}

/// Errors raised while scanning a corpus or loading keypoints for one image.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IngestError {
    #[error("i/o error on {path}: {message}")]
    Io { path: String, message: String },

    #[error("corpus root {0} is not a directory")]
    NotADirectory(String),

    #[error("cannot decode image {path}: {message}")]
    Decode { path: String, message: String },

    #[error(transparent)]
    Detect(#[from] DetectError),

    #[error("invalid keypoint sidecar {path}: {message}")]
    Sidecar { path: String, message: String },

    #[error("invalid ingest config: {0}")]
    InvalidConfig(String),
}

impl IngestError {
    pub(crate) fn io(path: &Path, err: std::io::Error) -> Self {
        IngestError::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }

    pub(crate) fn decode<E: std::fmt::Display>(path: &Path, err: E) -> Self {
        IngestError::Decode {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }

    pub(crate) fn sidecar<E: std::fmt::Display>(path: &Path, err: E) -> Self {
        IngestError::Sidecar {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }
}
