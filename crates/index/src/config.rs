use zstd::{decode_all, encode_all};

use crate::backend::BackendConfig;
use crate::IndexError;

/// Compression codec options for stored records.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CompressionCodec {
    /// No compression (useful for debugging or when storage is not a concern).
    None,
    /// Zstd compression (default, good balance of speed and ratio).
    #[default]
    Zstd,
}

/// Compression behavior configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompressionConfig {
    pub codec: CompressionCodec,
    /// Compression level (1-22 for Zstd, higher is smaller but slower).
    pub level: i32,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            codec: CompressionCodec::default(),
            level: 3,
        }
    }
}

impl CompressionConfig {
    pub fn new(codec: CompressionCodec, level: i32) -> Self {
        Self { codec, level }
    }

    pub fn none() -> Self {
        Self::new(CompressionCodec::None, 0)
    }

    pub fn with_codec(mut self, codec: CompressionCodec) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_level(mut self, level: i32) -> Self {
        self.level = level;
        self
    }

    pub fn validate(&self) -> Result<(), IndexError> {
        if self.codec == CompressionCodec::Zstd && !(1..=22).contains(&self.level) {
            return Err(IndexError::InvalidConfig(format!(
                "zstd level must be within 1..=22, got {}",
                self.level
            )));
        }
        Ok(())
    }

    pub(crate) fn compress(&self, data: &[u8]) -> Result<Vec<u8>, IndexError> {
        match self.codec {
            CompressionCodec::None => Ok(data.to_vec()),
            CompressionCodec::Zstd => Ok(encode_all(data, self.level)?),
        }
    }

    pub(crate) fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, IndexError> {
        match self.codec {
            CompressionCodec::None => Ok(data.to_vec()),
            CompressionCodec::Zstd => Ok(decode_all(data)?),
        }
    }
}

/// Config for opening an [`IndexStore`](crate::IndexStore).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IndexConfig {
    /// Backend storage configuration (in-memory or redb).
    pub backend: BackendConfig,
    /// Compression settings for stored records.
    pub compression: CompressionConfig,
}

impl IndexConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_backend(mut self, backend: BackendConfig) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_compression(mut self, compression: CompressionConfig) -> Self {
        self.compression = compression;
        self
    }

    pub fn validate(&self) -> Result<(), IndexError> {
        if let BackendConfig::Redb { path } = &self.backend {
            if path.trim().is_empty() {
                return Err(IndexError::InvalidConfig(
                    "redb backend requires a non-empty path".to_string(),
                ));
            }
        }
        self.compression.validate()
    }
}
