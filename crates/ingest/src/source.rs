//! Keypoint sources.
//!
//! A [`KeypointSource`] turns one [`InventoryEntry`] into the keypoints the
//! fingerprint layer consumes. Two sources ship with the crate:
//!
//! - [`DecodingSource`] decodes the image file, converts it to 8-bit luma and
//!   hands it to a pluggable [`KeypointProvider`] (the external detector).
//! - [`SidecarSource`] reads detections stored as JSON next to the image by
//!   [`write_sidecar`], so a corpus can be re-indexed without re-detecting.

use std::fs;
use std::path::{Path, PathBuf};

use fingerprint::Keypoint;
use image::GrayImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::IngestConfig;
use crate::error::{DetectError, IngestError};
use crate::types::InventoryEntry;

/// Current keypoint sidecar schema version.
pub const SIDECAR_VERSION: u32 = 1;

/// External keypoint detector.
///
/// Keypoint positions are in pixel coordinates of the image passed in,
/// orientations in degrees.
pub trait KeypointProvider: Send + Sync {
    fn detect(&self, image: &GrayImage) -> Result<Vec<Keypoint>, DetectError>;
}

impl<F> KeypointProvider for F
where
    F: Fn(&GrayImage) -> Result<Vec<Keypoint>, DetectError> + Send + Sync,
{
    fn detect(&self, image: &GrayImage) -> Result<Vec<Keypoint>, DetectError> {
        self(image)
    }
}

/// Obtains the keypoints of one corpus image.
pub trait KeypointSource: Send + Sync {
    fn keypoints(&self, entry: &InventoryEntry) -> Result<Vec<Keypoint>, IngestError>;

    /// File whose bytes determine the keypoints of `entry`. Used to key
    /// memoized fingerprints by content.
    fn content_path(&self, entry: &InventoryEntry) -> PathBuf;

    /// Keypoints of `entry` from `content`, the bytes already read from
    /// [`content_path`](Self::content_path).
    ///
    /// Callers that key results by those bytes rely on this not touching
    /// the file again. The default falls back to [`keypoints`](Self::keypoints),
    /// which re-reads; sources backed by `content_path` should override it.
    fn keypoints_from_content(
        &self,
        entry: &InventoryEntry,
        content: &[u8],
    ) -> Result<Vec<Keypoint>, IngestError> {
        let _ = content;
        self.keypoints(entry)
    }
}

fn check_size(path: &Path, len: u64, limit: Option<u64>) -> Result<(), IngestError> {
    match limit {
        Some(limit) if len > limit => Err(IngestError::decode(
            path,
            format!("file size {len} exceeds limit of {limit}"),
        )),
        _ => Ok(()),
    }
}

fn read_limited(path: &Path, limit: Option<u64>) -> Result<Vec<u8>, IngestError> {
    if limit.is_some() {
        let len = fs::metadata(path).map_err(|e| IngestError::io(path, e))?.len();
        check_size(path, len, limit)?;
    }
    fs::read(path).map_err(|e| IngestError::io(path, e))
}

/// Decode an in-memory image to 8-bit luma.
pub fn decode_luma(bytes: &[u8], origin: &Path) -> Result<GrayImage, IngestError> {
    let img = image::load_from_memory(bytes).map_err(|e| IngestError::decode(origin, e))?;
    Ok(img.to_luma8())
}

/// Decodes images and runs a [`KeypointProvider`] on them.
#[derive(Debug, Clone)]
pub struct DecodingSource<P> {
    provider: P,
    cfg: IngestConfig,
}

impl<P: KeypointProvider> DecodingSource<P> {
    pub fn new(provider: P, cfg: IngestConfig) -> Self {
        Self { provider, cfg }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Keypoints of an already loaded image file.
    pub fn keypoints_from_bytes(
        &self,
        bytes: &[u8],
        origin: &Path,
    ) -> Result<Vec<Keypoint>, IngestError> {
        let gray = decode_luma(bytes, origin)?;
        let keypoints = self.provider.detect(&gray)?;
        debug!(
            path = %origin.display(),
            width = gray.width(),
            height = gray.height(),
            keypoints = keypoints.len(),
            "keypoints_detected"
        );
        Ok(keypoints)
    }
}

impl<P: KeypointProvider> KeypointSource for DecodingSource<P> {
    fn keypoints(&self, entry: &InventoryEntry) -> Result<Vec<Keypoint>, IngestError> {
        let bytes = read_limited(&entry.path, self.cfg.max_image_bytes)?;
        self.keypoints_from_bytes(&bytes, &entry.path)
    }

    fn content_path(&self, entry: &InventoryEntry) -> PathBuf {
        entry.path.clone()
    }

    fn keypoints_from_content(
        &self,
        entry: &InventoryEntry,
        content: &[u8],
    ) -> Result<Vec<Keypoint>, IngestError> {
        check_size(&entry.path, content.len() as u64, self.cfg.max_image_bytes)?;
        self.keypoints_from_bytes(content, &entry.path)
    }
}

/// On-disk sidecar document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeypointSidecar {
    pub version: u32,
    pub image_id: String,
    pub keypoints: Vec<Keypoint>,
}

/// Reads keypoints previously stored with [`write_sidecar`].
#[derive(Debug, Clone, Default)]
pub struct SidecarSource {
    cfg: IngestConfig,
}

impl SidecarSource {
    pub fn new(cfg: IngestConfig) -> Self {
        Self { cfg }
    }

    pub fn read(&self, entry: &InventoryEntry) -> Result<KeypointSidecar, IngestError> {
        let path = self.cfg.sidecar_path(&entry.path);
        let bytes = fs::read(&path).map_err(|e| IngestError::sidecar(&path, e))?;
        Self::parse(&bytes, &path)
    }

    fn parse(bytes: &[u8], path: &Path) -> Result<KeypointSidecar, IngestError> {
        let sidecar: KeypointSidecar =
            serde_json::from_slice(bytes).map_err(|e| IngestError::sidecar(path, e))?;
        if sidecar.version != SIDECAR_VERSION {
            return Err(IngestError::sidecar(
                path,
                format!("unsupported sidecar version {}", sidecar.version),
            ));
        }
        Ok(sidecar)
    }
}

impl KeypointSource for SidecarSource {
    fn keypoints(&self, entry: &InventoryEntry) -> Result<Vec<Keypoint>, IngestError> {
        Ok(self.read(entry)?.keypoints)
    }

    fn content_path(&self, entry: &InventoryEntry) -> PathBuf {
        self.cfg.sidecar_path(&entry.path)
    }

    fn keypoints_from_content(
        &self,
        entry: &InventoryEntry,
        content: &[u8],
    ) -> Result<Vec<Keypoint>, IngestError> {
        Ok(Self::parse(content, &self.cfg.sidecar_path(&entry.path))?.keypoints)
    }
}

/// Store detections for `entry` where [`SidecarSource`] will find them.
/// Returns the sidecar path.
pub fn write_sidecar(
    entry: &InventoryEntry,
    keypoints: &[Keypoint],
    cfg: &IngestConfig,
) -> Result<PathBuf, IngestError> {
    let path = cfg.sidecar_path(&entry.path);
    let doc = KeypointSidecar {
        version: SIDECAR_VERSION,
        image_id: entry.id.to_string(),
        keypoints: keypoints.to_vec(),
    };
    let json = serde_json::to_vec_pretty(&doc).map_err(|e| IngestError::sidecar(&path, e))?;
    fs::write(&path, json).map_err(|e| IngestError::io(&path, e))?;
    Ok(path)
}
