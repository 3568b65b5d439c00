//! Configuration types for corpus ingest.
//!
//! [`IngestConfig`] controls which files of a corpus directory are treated as
//! images, where stored keypoints live next to them, and how large an image
//! file may be before it is refused. It is cheap to clone and deserializes
//! from the `corpus` section of the YAML configuration.
//!
//! ```rust
//! use ingest::IngestConfig;
//!
//! let config = IngestConfig::default();
//! config.validate().expect("default config is valid");
//! assert!(config.accepts_extension("JPG"));
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::IngestError;

/// Runtime configuration for corpus ingest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Configuration schema version.
    pub version: u32,
    /// File extensions (lowercase, no dot) considered images.
    pub extensions: Vec<String>,
    /// Extension appended to the image file name for keypoint sidecars,
    /// e.g. `frame1-full.jpg` -> `frame1-full.jpg.kps.json`.
    pub sidecar_extension: String,
    /// Largest image file accepted, in bytes.
    pub max_image_bytes: Option<u64>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            version: 1,
            extensions: vec![
                "jpg".to_string(),
                "jpeg".to_string(),
                "png".to_string(),
                "webp".to_string(),
            ],
            sidecar_extension: "kps.json".to_string(),
            max_image_bytes: Some(64 * 1024 * 1024),
        }
    }
}

impl IngestConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|e| e.into().to_ascii_lowercase())
            .collect();
        self
    }

    pub fn with_sidecar_extension(mut self, ext: impl Into<String>) -> Self {
        self.sidecar_extension = ext.into();
        self
    }

    pub fn with_max_image_bytes(mut self, limit: Option<u64>) -> Self {
        self.max_image_bytes = limit;
        self
    }

    pub fn validate(&self) -> Result<(), IngestError> {
        if self.version == 0 {
            return Err(IngestError::InvalidConfig(
                "version must be >= 1".to_string(),
            ));
        }
        if self.extensions.is_empty() {
            return Err(IngestError::InvalidConfig(
                "at least one image extension is required".to_string(),
            ));
        }
        if let Some(bad) = self
            .extensions
            .iter()
            .find(|e| e.is_empty() || e.starts_with('.'))
        {
            return Err(IngestError::InvalidConfig(format!(
                "image extension '{bad}' must be non-empty and given without a dot"
            )));
        }
        if self.sidecar_extension.is_empty() {
            return Err(IngestError::InvalidConfig(
                "sidecar extension must not be empty".to_string(),
            ));
        }
        if self
            .extensions
            .iter()
            .any(|e| e.eq_ignore_ascii_case(&self.sidecar_extension))
        {
            return Err(IngestError::InvalidConfig(format!(
                "sidecar extension '{}' collides with an image extension",
                self.sidecar_extension
            )));
        }
        if self.max_image_bytes == Some(0) {
            return Err(IngestError::InvalidConfig(
                "max_image_bytes must be > 0 when set".to_string(),
            ));
        }
        Ok(())
    }

    /// Case-insensitive extension check.
    pub fn accepts_extension(&self, ext: &str) -> bool {
        self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
    }

    /// Location of the keypoint sidecar for `image_path`: the full file
    /// name plus the sidecar extension, so images differing only in
    /// extension keep separate sidecars.
    pub fn sidecar_path(&self, image_path: &Path) -> PathBuf {
        let mut name = image_path.as_os_str().to_os_string();
        name.push(".");
        name.push(&self.sidecar_extension);
        PathBuf::from(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(IngestConfig::default().validate().is_ok());
    }

    #[test]
    fn empty_extensions_rejected() {
        let cfg = IngestConfig::new().with_extensions(Vec::<String>::new());
        assert!(matches!(cfg.validate(), Err(IngestError::InvalidConfig(_))));
    }

    #[test]
    fn dotted_extension_rejected() {
        let cfg = IngestConfig::new().with_extensions([".png"]);
        assert!(matches!(cfg.validate(), Err(IngestError::InvalidConfig(_))));
    }

    #[test]
    fn sidecar_colliding_with_image_extension_rejected() {
        let cfg = IngestConfig::new().with_sidecar_extension("png");
        assert!(matches!(cfg.validate(), Err(IngestError::InvalidConfig(_))));
    }

    #[test]
    fn zero_size_limit_rejected() {
        let cfg = IngestConfig::new().with_max_image_bytes(Some(0));
        assert!(cfg.validate().is_err());
        let cfg = IngestConfig::new().with_max_image_bytes(None);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn extensions_match_case_insensitively() {
        let cfg = IngestConfig::new().with_extensions(["PNG"]);
        assert!(cfg.accepts_extension("png"));
        assert!(cfg.accepts_extension("Png"));
        assert!(!cfg.accepts_extension("jpg"));
    }

    #[test]
    fn sidecar_path_keeps_image_extension() {
        let cfg = IngestConfig::default();
        assert_eq!(
            cfg.sidecar_path(Path::new("/corpus/frame4-2.jpg")),
            PathBuf::from("/corpus/frame4-2.jpg.kps.json")
        );
    }

    #[test]
    fn same_stem_images_get_distinct_sidecars() {
        let cfg = IngestConfig::default();
        let jpg = cfg.sidecar_path(Path::new("/corpus/frame1-full.jpg"));
        let png = cfg.sidecar_path(Path::new("/corpus/frame1-full.png"));
        assert_ne!(jpg, png);
        assert_eq!(png, PathBuf::from("/corpus/frame1-full.png.kps.json"));
    }

    #[test]
    fn partial_yaml_like_json_uses_defaults() {
        let cfg: IngestConfig = serde_json::from_str(r#"{"extensions":["png"]}"#).unwrap();
        assert_eq!(cfg.extensions, vec!["png".to_string()]);
        assert_eq!(cfg.sidecar_extension, "kps.json");
    }
}
