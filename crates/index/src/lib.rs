//! # framefp Index
//!
//! This crate holds the fingerprints of a corpus and persists them. Matching
//! runs against a [`FingerprintIndex`], an ordered in-memory map from image
//! id to fingerprint whose iteration order is the deterministic corpus order.
//!
//! ## Core Features
//!
//! - **Ordered lookups**: [`FingerprintIndex::get`] fails with
//!   [`IndexError::NotFound`] for ids never indexed, which is distinct from an
//!   indexed image whose fingerprint is empty.
//! - **Pluggable backends**: [`IndexStore`] writes records through the
//!   [`IndexBackend`] trait. An in-memory backend ships for tests and a redb
//!   backend (feature `backend-redb`, on by default) for persistent storage.
//! - **Compact records**: records are bincode encoded and zstd compressed
//!   according to [`CompressionConfig`].
//! - **Portable export**: a byte-stable JSON document via
//!   [`FingerprintIndex::write_json`] / [`FingerprintIndex::read_json`].
//!
//! ## Example Usage
//!
//! ```
//! use fingerprint::{fingerprint_keypoints, FingerprintConfig, Keypoint};
//! use framefp_index::{FingerprintIndex, IndexConfig, IndexStore};
//!
//! let cfg = FingerprintConfig::new().with_k(1);
//! let fp = fingerprint_keypoints(
//!     &[Keypoint::new(0.0, 0.0, 5.0, 0.0), Keypoint::new(0.0, 10.0, 5.0, 0.0)],
//!     &cfg,
//! )
//! .unwrap();
//!
//! let mut index = FingerprintIndex::new();
//! index.insert("frame1-full.jpg", fp).unwrap();
//!
//! let store = IndexStore::open(IndexConfig::default()).unwrap();
//! store.save(&index).unwrap();
//! let loaded = store.load().unwrap();
//! assert_eq!(loaded.get("frame1-full.jpg").unwrap().tokens().len(), 2);
//! ```

mod backend;
mod config;
mod document;
mod fingerprint_index;
mod store;

#[cfg(feature = "backend-redb")]
pub use backend::RedbBackend;
pub use backend::{BackendConfig, InMemoryBackend, IndexBackend};
pub use config::{CompressionCodec, CompressionConfig, IndexConfig};
pub use document::{DocumentEntry, IndexDocument};
pub use fingerprint_index::{FingerprintIndex, IndexEntry};
pub use store::{IndexRecord, IndexStore};

use bincode::error::{DecodeError, EncodeError};
use thiserror::Error;

/// Bump this value whenever the stored `IndexRecord` layout changes.
pub const INDEX_SCHEMA_VERSION: u16 = 1;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    #[error("image {image_id} is not in the index")]
    NotFound { image_id: String },
    #[error("image {image_id} is already in the index")]
    DuplicateId { image_id: String },
    #[error("image {image_id} was fingerprinted with different parameters than the index")]
    ParamsMismatch { image_id: String },
    #[error("unsupported index schema version {found}")]
    UnsupportedSchema { found: u16 },
    #[error("invalid index config: {0}")]
    InvalidConfig(String),
    #[error("Backend error: {0}")]
    Backend(String),
    #[error("Serialization encode error: {0}")]
    Encode(String),
    #[error("Serialization decode error: {0}")]
    Decode(String),
    #[error("Compression error: {0}")]
    Compression(String),
    #[error("JSON error: {0}")]
    Json(String),
}

impl From<EncodeError> for IndexError {
    fn from(e: EncodeError) -> Self {
        IndexError::Encode(e.to_string())
    }
}

impl From<DecodeError> for IndexError {
    fn from(e: DecodeError) -> Self {
        IndexError::Decode(e.to_string())
    }
}

// zstd reports failures as io errors.
impl From<std::io::Error> for IndexError {
    fn from(e: std::io::Error) -> Self {
        IndexError::Compression(e.to_string())
    }
}

impl IndexError {
    pub fn backend<E: std::fmt::Display>(err: E) -> Self {
        Self::Backend(err.to_string())
    }
}
