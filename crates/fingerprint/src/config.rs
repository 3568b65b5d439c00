//! Configuration and error types for keypoint-pair fingerprinting.
//!
//! This module defines the public configuration surface for the fingerprint
//! layer. It is free of any I/O or environment-dependent behavior so that the
//! fingerprint pipeline is a pure function of `(keypoints, config)`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound on the number of decimals rendered per hash field.
///
/// Beyond this, tokens stop collapsing jittered detections and every pair
/// becomes unique, which defeats the overlap score.
pub const MAX_DECIMALS: usize = 12;

/// Configuration for the fingerprint pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FingerprintConfig {
    /// Configuration schema version.
    ///
    /// Any change that can affect the emitted tokens must bump this version,
    /// so that persisted fingerprints remain comparable.
    pub version: u32,
    /// Number of nearest neighbors hashed per keypoint.
    pub k: usize,
    /// Divisor applied to the three angle fields before formatting.
    ///
    /// `1.0` keeps one-degree bins; larger values coarsen the bins and make
    /// tokens more tolerant to orientation jitter.
    pub quantization_factor: f64,
    /// Number of decimals rendered for every field of a hash token.
    pub decimals: usize,
}

impl FingerprintConfig {
    /// Create a new configuration with the defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the neighbor count (k). Typical values: 3-8.
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    /// Set the angle quantization divisor.
    pub fn with_quantization_factor(mut self, quantization_factor: f64) -> Self {
        self.quantization_factor = quantization_factor;
        self
    }

    /// Set the number of rendered decimals.
    pub fn with_decimals(mut self, decimals: usize) -> Self {
        self.decimals = decimals;
        self
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), FingerprintError> {
        if self.version < 1 {
            return Err(FingerprintError::InvalidConfigVersion {
                version: self.version,
            });
        }
        if self.k < 1 {
            return Err(FingerprintError::InvalidConfigK { k: self.k });
        }
        if !self.quantization_factor.is_finite() || self.quantization_factor <= 0.0 {
            return Err(FingerprintError::InvalidQuantizationFactor {
                factor: self.quantization_factor,
            });
        }
        if self.decimals > MAX_DECIMALS {
            return Err(FingerprintError::InvalidDecimals {
                decimals: self.decimals,
            });
        }
        Ok(())
    }
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        Self {
            version: 1,
            k: 5,
            quantization_factor: 1.0,
            decimals: 0,
        }
    }
}

/// Errors returned by the fingerprint pipeline.
///
/// Only configuration problems are errors. Images that cannot be
/// characterized produce an empty fingerprint instead.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FingerprintError {
    #[error("invalid config: k must be >= 1 (got {k})")]
    InvalidConfigK { k: usize },

    #[error("invalid config: quantization_factor must be finite and > 0 (got {factor})")]
    InvalidQuantizationFactor { factor: f64 },

    #[error("invalid config: decimals must be <= 12 (got {decimals})")]
    InvalidDecimals { decimals: usize },

    #[error("invalid config version {version}; expected >= 1")]
    InvalidConfigVersion { version: u32 },
}
