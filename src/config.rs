//! YAML configuration file support for framefp.
//!
//! One file describes a corpus and every stage that touches it, so the CLI
//! (and tests) can build, persist and query an index from a single path.
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! version: "1"
//! name: "frame game"
//!
//! fingerprint:
//!   k: 5
//!   quantization_factor: 1.0
//!   decimals: 0
//!
//! corpus:
//!   dir: "images"
//!   keypoint_source: "decode"     # or "sidecar"
//!   extensions: ["jpg", "png"]
//!   harris:
//!     sigma: 1.0
//!     window: 5
//!
//! index:
//!   backend: "redb"
//!   path: "framefp.redb"
//!   compression: "zstd"
//!   level: 3
//!   cache_path: "framefp-cache.redb"
//!
//! matcher:
//!   min_overlap: 1
//!   max_ranked: 10
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use fingerprint::FingerprintConfig;
use index::{BackendConfig, CompressionCodec, CompressionConfig, IndexConfig};
use ingest::{HarrisConfig, IngestConfig};
use matcher::MatchConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when loading YAML configuration files
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),

    #[error("missing required field: {0}")]
    MissingField(String),
}

/// Top-level YAML configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FramefpConfig {
    /// Configuration format version
    pub version: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub fingerprint: FingerprintYamlConfig,

    #[serde(default)]
    pub corpus: CorpusYamlConfig,

    #[serde(default)]
    pub index: IndexYamlConfig,

    #[serde(default)]
    pub matcher: MatchConfig,
}

impl FramefpConfig {
    /// Load a YAML configuration file from the given path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: FramefpConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigLoadError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        self.fingerprint
            .to_config()
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("fingerprint: {e}")))?;
        self.corpus.validate()?;
        self.index.validate()?;
        self.matcher
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("matcher: {e}")))?;
        Ok(())
    }

    pub fn fingerprint_config(&self) -> FingerprintConfig {
        self.fingerprint.to_config()
    }

    pub fn ingest_config(&self) -> IngestConfig {
        self.corpus.ingest_config()
    }

    pub fn index_config(&self) -> Result<IndexConfig, ConfigLoadError> {
        self.index.index_config()
    }

    /// Store for memoized query fingerprints, when `index.cache_path` is set.
    pub fn cache_config(&self) -> Option<IndexConfig> {
        self.index.cache_path.as_ref().map(|path| IndexConfig {
            backend: BackendConfig::redb(path.clone()),
            compression: self.index.compression_config(),
        })
    }

    pub fn match_config(&self) -> MatchConfig {
        self.matcher.clone()
    }
}

impl Default for FramefpConfig {
    fn default() -> Self {
        Self {
            version: "1".to_string(),
            name: None,
            fingerprint: FingerprintYamlConfig::default(),
            corpus: CorpusYamlConfig::default(),
            index: IndexYamlConfig::default(),
            matcher: MatchConfig::default(),
        }
    }
}

/// Fingerprint stage YAML configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FingerprintYamlConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default = "default_k")]
    pub k: usize,

    #[serde(default = "default_quantization_factor")]
    pub quantization_factor: f64,

    #[serde(default)]
    pub decimals: usize,
}

impl FingerprintYamlConfig {
    pub fn to_config(&self) -> FingerprintConfig {
        FingerprintConfig {
            version: self.version,
            k: self.k,
            quantization_factor: self.quantization_factor,
            decimals: self.decimals,
        }
    }
}

impl Default for FingerprintYamlConfig {
    fn default() -> Self {
        let cfg = FingerprintConfig::default();
        Self {
            version: cfg.version,
            k: cfg.k,
            quantization_factor: cfg.quantization_factor,
            decimals: cfg.decimals,
        }
    }
}

/// Where keypoints of corpus images come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeypointSourceKind {
    /// Precomputed detections next to each image.
    #[default]
    Sidecar,
    /// Decode each image and run the built-in corner detector.
    Decode,
}

/// Corpus YAML configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusYamlConfig {
    #[serde(default = "default_corpus_dir")]
    pub dir: PathBuf,

    #[serde(default)]
    pub keypoint_source: KeypointSourceKind,

    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    #[serde(default = "default_sidecar_extension")]
    pub sidecar_extension: String,

    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: Option<u64>,

    #[serde(default)]
    pub harris: HarrisConfig,
}

impl CorpusYamlConfig {
    pub fn ingest_config(&self) -> IngestConfig {
        IngestConfig::new()
            .with_extensions(self.extensions.iter())
            .with_sidecar_extension(self.sidecar_extension.clone())
            .with_max_image_bytes(self.max_image_bytes)
    }

    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.dir.as_os_str().is_empty() {
            return Err(ConfigLoadError::MissingField("corpus.dir".to_string()));
        }
        self.ingest_config()
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("corpus: {e}")))?;
        if self.keypoint_source == KeypointSourceKind::Decode {
            self.harris
                .validate()
                .map_err(|e| ConfigLoadError::Validation(format!("corpus.harris: {e}")))?;
        }
        Ok(())
    }
}

impl Default for CorpusYamlConfig {
    fn default() -> Self {
        Self {
            dir: default_corpus_dir(),
            keypoint_source: KeypointSourceKind::default(),
            extensions: default_extensions(),
            sidecar_extension: default_sidecar_extension(),
            max_image_bytes: default_max_image_bytes(),
            harris: HarrisConfig::default(),
        }
    }
}

/// Index YAML configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexYamlConfig {
    #[serde(default = "default_backend")]
    pub backend: String,

    #[serde(default)]
    pub path: Option<String>,

    #[serde(default = "default_compression")]
    pub compression: String,

    #[serde(default = "default_compression_level")]
    pub level: i32,

    /// Optional redb file for memoized query fingerprints.
    #[serde(default)]
    pub cache_path: Option<String>,
}

impl IndexYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.backend.as_str() {
            "in_memory" => {}
            "redb" => {
                if self.path.as_deref().is_none_or(|p| p.trim().is_empty()) {
                    return Err(ConfigLoadError::MissingField("index.path".to_string()));
                }
            }
            other => {
                return Err(ConfigLoadError::Validation(format!(
                    "index.backend must be 'in_memory' or 'redb', got '{other}'"
                )));
            }
        }
        if !matches!(self.compression.as_str(), "none" | "zstd") {
            return Err(ConfigLoadError::Validation(format!(
                "index.compression must be 'none' or 'zstd', got '{}'",
                self.compression
            )));
        }
        self.compression_config()
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("index: {e}")))?;
        if self.cache_path.as_deref().is_some_and(|p| p.trim().is_empty()) {
            return Err(ConfigLoadError::Validation(
                "index.cache_path must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    fn compression_config(&self) -> CompressionConfig {
        match self.compression.as_str() {
            "none" => CompressionConfig::none(),
            _ => CompressionConfig::new(CompressionCodec::Zstd, self.level),
        }
    }

    pub fn index_config(&self) -> Result<IndexConfig, ConfigLoadError> {
        let backend = match (self.backend.as_str(), &self.path) {
            ("redb", Some(path)) => BackendConfig::redb(path.clone()),
            ("redb", None) => return Err(ConfigLoadError::MissingField("index.path".to_string())),
            _ => BackendConfig::in_memory(),
        };
        Ok(IndexConfig {
            backend,
            compression: self.compression_config(),
        })
    }
}

impl Default for IndexYamlConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: None,
            compression: default_compression(),
            level: default_compression_level(),
            cache_path: None,
        }
    }
}

fn default_version() -> u32 {
    1
}
fn default_k() -> usize {
    FingerprintConfig::default().k
}
fn default_quantization_factor() -> f64 {
    FingerprintConfig::default().quantization_factor
}
fn default_corpus_dir() -> PathBuf {
    PathBuf::from("images")
}
fn default_extensions() -> Vec<String> {
    IngestConfig::default().extensions
}
fn default_sidecar_extension() -> String {
    IngestConfig::default().sidecar_extension
}
fn default_max_image_bytes() -> Option<u64> {
    IngestConfig::default().max_image_bytes
}
fn default_backend() -> String {
    "in_memory".to_string()
}
fn default_compression() -> String {
    "zstd".to_string()
}
fn default_compression_level() -> i32 {
    CompressionConfig::default().level
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_minimal_yaml() {
        let config = FramefpConfig::from_yaml("version: \"1\"\n").unwrap();
        assert_eq!(config.fingerprint_config(), FingerprintConfig::default());
        assert_eq!(config.corpus.keypoint_source, KeypointSourceKind::Sidecar);
        assert_eq!(config.index_config().unwrap(), IndexConfig::default());
        assert_eq!(config.match_config(), MatchConfig::default());
        assert!(config.cache_config().is_none());
    }

    #[test]
    fn test_load_from_file() {
        let yaml = r#"
version: "1.0"
corpus:
  dir: "frames"
"#;
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(yaml.as_bytes()).unwrap();

        let config = FramefpConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.corpus.dir, PathBuf::from("frames"));
    }

    #[test]
    fn test_full_yaml() {
        let yaml = r#"
version: "1"
name: "frame game"
fingerprint:
  version: 1
  k: 3
  quantization_factor: 5.0
  decimals: 1
corpus:
  dir: "images"
  keypoint_source: "decode"
  extensions: ["png"]
  sidecar_extension: "points.json"
  max_image_bytes: 1048576
  harris:
    sigma: 1.5
    window: 7
    max_corners: 200
    threshold: 500000.0
index:
  backend: "redb"
  path: "/tmp/framefp.redb"
  compression: "none"
  cache_path: "/tmp/framefp-cache.redb"
matcher:
  min_overlap: 4
  max_ranked: 3
"#;
        let config = FramefpConfig::from_yaml(yaml).unwrap();

        let fp = config.fingerprint_config();
        assert_eq!((fp.k, fp.quantization_factor, fp.decimals), (3, 5.0, 1));

        let ingest = config.ingest_config();
        assert!(ingest.accepts_extension("png"));
        assert!(!ingest.accepts_extension("jpg"));
        assert_eq!(ingest.sidecar_extension, "points.json");
        assert_eq!(ingest.max_image_bytes, Some(1_048_576));
        assert_eq!(config.corpus.harris.window, 7);

        let index = config.index_config().unwrap();
        assert_eq!(index.backend, BackendConfig::redb("/tmp/framefp.redb"));
        assert_eq!(index.compression, CompressionConfig::none());
        assert_eq!(
            config.cache_config().unwrap().backend,
            BackendConfig::redb("/tmp/framefp-cache.redb")
        );

        assert_eq!(config.match_config().min_overlap, 4);
        assert_eq!(config.match_config().max_ranked, 3);
    }

    #[test]
    fn test_unsupported_version() {
        let err = FramefpConfig::from_yaml("version: \"2\"\n").unwrap_err();
        assert!(matches!(err, ConfigLoadError::UnsupportedVersion(v) if v == "2"));
    }

    #[test]
    fn test_fingerprint_validation() {
        let yaml = r#"
version: "1"
fingerprint:
  k: 0
"#;
        let err = FramefpConfig::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("fingerprint"));
    }

    #[test]
    fn test_redb_requires_path() {
        let yaml = r#"
version: "1"
index:
  backend: "redb"
"#;
        let err = FramefpConfig::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, ConfigLoadError::MissingField(f) if f == "index.path"));
    }

    #[test]
    fn test_index_validation() {
        for yaml in [
            "version: \"1\"\nindex:\n  backend: \"rocksdb\"\n",
            "version: \"1\"\nindex:\n  compression: \"lz4\"\n",
            "version: \"1\"\nindex:\n  level: 40\n",
        ] {
            assert!(matches!(
                FramefpConfig::from_yaml(yaml),
                Err(ConfigLoadError::Validation(_))
            ));
        }
    }

    #[test]
    fn test_matcher_validation() {
        let yaml = "version: \"1\"\nmatcher:\n  min_overlap: 0\n";
        let err = FramefpConfig::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("min_overlap"));
    }

    #[test]
    fn test_harris_checked_only_when_decoding() {
        let bad_window = r#"
version: "1"
corpus:
  keypoint_source: "sidecar"
  harris:
    window: 4
"#;
        assert!(FramefpConfig::from_yaml(bad_window).is_ok());
        let decoding = bad_window.replace("sidecar", "decode");
        assert!(FramefpConfig::from_yaml(&decoding).is_err());
    }

    #[test]
    fn test_yaml_roundtrip() {
        let config = FramefpConfig::default();
        let yaml = config.to_yaml().unwrap();
        let back = FramefpConfig::from_yaml(&yaml).unwrap();
        assert_eq!(back.fingerprint_config(), config.fingerprint_config());
        assert_eq!(back.ingest_config(), config.ingest_config());
    }
}
