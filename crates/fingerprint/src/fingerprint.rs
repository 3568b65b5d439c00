//! Fingerprint and metadata types for the keypoint-pair layer.
//!
//! The token format and metadata are part of the public contract: any
//! incompatible change must result in a new `algorithm_version`.

use std::borrow::Borrow;
use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Canonical textual token encoding the quantized geometry of one directed
/// keypoint pair, e.g. `"30|120|0|4|9"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HashToken(String);

impl HashToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<String> for HashToken {
    fn from(value: String) -> Self {
        HashToken(value)
    }
}

impl From<&str> for HashToken {
    fn from(value: &str) -> Self {
        HashToken(value.to_string())
    }
}

impl AsRef<str> for HashToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for HashToken {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HashToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fingerprint of one image: every pair token in generation order.
///
/// Duplicates are kept as generated. Matching collapses them through
/// [`Fingerprint::distinct`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Fingerprint {
    pub tokens: Vec<HashToken>,
    pub meta: FingerprintMeta,
}

impl Fingerprint {
    /// Fingerprint with no tokens: the image could not be characterized.
    pub fn empty(meta: FingerprintMeta) -> Self {
        Self {
            tokens: Vec::new(),
            meta,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Distinct tokens as a set of string slices.
    pub fn distinct(&self) -> HashSet<&str> {
        self.tokens.iter().map(HashToken::as_str).collect()
    }

    /// Number of distinct tokens.
    pub fn distinct_len(&self) -> usize {
        self.distinct().len()
    }
}

/// Metadata for traceability and determinism.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FingerprintMeta {
    /// Token algorithm version owned by this crate.
    pub algorithm_version: u16,
    /// Human readable algorithm identifier.
    pub algorithm_name: String,
    /// Neighbor count used for selection.
    pub k: usize,
    /// Angle quantization divisor.
    pub quantization_factor: f64,
    /// Rendered decimals per field.
    pub decimals: usize,
    /// Number of keypoints the fingerprint was built from.
    pub keypoint_count: usize,
    /// Configuration schema version supplied when computing this fingerprint.
    pub config_version: u32,
}

impl FingerprintMeta {
    /// Whether two fingerprints were produced with the same token parameters
    /// and are therefore comparable.
    pub fn same_params(&self, other: &FingerprintMeta) -> bool {
        self.algorithm_version == other.algorithm_version
            && self.k == other.k
            && self.quantization_factor.to_bits() == other.quantization_factor.to_bits()
            && self.decimals == other.decimals
    }
}
