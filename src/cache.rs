//! Compute-once fingerprint cache.
//!
//! Query images are usually fingerprinted again and again with the same
//! parameters. [`FingerprintCache`] keys each fingerprint by the SHA-256 of
//! the content its keypoints come from plus every parameter that affects the
//! tokens. Concurrent callers asking for the same key block on a single
//! computation. An optional [`IndexStore`] keeps successful fingerprints
//! across restarts.

use std::fmt;
use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use fingerprint::{ALGORITHM_VERSION, Fingerprint, FingerprintConfig};
use index::IndexStore;
use ingest::{InventoryEntry, KeypointSource};
use once_cell::sync::OnceCell;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::{Degradation, FingerprintReport, PipelineError, fingerprint_content, fingerprint_image};

/// Exact inputs of one fingerprint computation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    content_sha256: String,
    k: usize,
    quantization_bits: u64,
    decimals: usize,
    algorithm_version: u16,
}

impl CacheKey {
    pub fn new(content: &[u8], cfg: &FingerprintConfig) -> Self {
        Self {
            content_sha256: hex::encode(Sha256::digest(content)),
            k: cfg.k,
            quantization_bits: cfg.quantization_factor.to_bits(),
            decimals: cfg.decimals,
            algorithm_version: ALGORITHM_VERSION,
        }
    }

    pub fn content_sha256(&self) -> &str {
        &self.content_sha256
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "fp:v{}:{}:k{}:q{:016x}:d{}",
            self.algorithm_version,
            self.content_sha256,
            self.k,
            self.quantization_bits,
            self.decimals
        )
    }
}

#[derive(Debug, Clone)]
struct Cached {
    fingerprint: Fingerprint,
    degradation: Option<Degradation>,
}

/// Memoizes fingerprints by content and parameters.
pub struct FingerprintCache {
    cfg: FingerprintConfig,
    entries: DashMap<CacheKey, Arc<OnceCell<Cached>>>,
    store: Option<IndexStore>,
    computed: AtomicUsize,
}

impl FingerprintCache {
    pub fn new(cfg: FingerprintConfig) -> Result<Self, PipelineError> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            entries: DashMap::new(),
            store: None,
            computed: AtomicUsize::new(0),
        })
    }

    /// Persist successful fingerprints in `store` and consult it on misses.
    ///
    /// The store should not be the one holding the corpus index:
    /// [`IndexStore::save`] replaces all records.
    pub fn with_store(mut self, store: IndexStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn config(&self) -> &FingerprintConfig {
        &self.cfg
    }

    /// Number of fingerprints actually computed (not served from memory or
    /// the durable store).
    pub fn computed(&self) -> usize {
        self.computed.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop the in-memory entries. The durable store is left untouched.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Fingerprint of `entry`, computed at most once per content and
    /// parameters.
    ///
    /// The content file is read once. Its bytes are both hashed into the key
    /// and handed to [`KeypointSource::keypoints_from_content`], so a file
    /// replaced mid-call cannot pair one content's key with another's
    /// fingerprint.
    ///
    /// Content that cannot be read is not cached; the result is the degraded
    /// report of [`fingerprint_image`].
    pub fn get_or_compute<S>(
        &self,
        source: &S,
        entry: &InventoryEntry,
    ) -> Result<FingerprintReport, PipelineError>
    where
        S: KeypointSource + ?Sized,
    {
        let path = source.content_path(entry);
        let content = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) => {
                debug!(image_id = %entry.id, path = %path.display(), error = %err, "cache_bypassed");
                return fingerprint_image(source, entry, &self.cfg);
            }
        };

        let key = CacheKey::new(&content, &self.cfg);
        let cell = self
            .entries
            .entry(key.clone())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .value()
            .clone();

        let cached =
            cell.get_or_try_init(|| self.load_or_compute(&key, source, entry, &content))?;
        Ok(FingerprintReport {
            image_id: entry.id.clone(),
            fingerprint: cached.fingerprint.clone(),
            degradation: cached.degradation.clone(),
        })
    }

    fn load_or_compute<S>(
        &self,
        key: &CacheKey,
        source: &S,
        entry: &InventoryEntry,
        content: &[u8],
    ) -> Result<Cached, PipelineError>
    where
        S: KeypointSource + ?Sized,
    {
        let storage_key = key.to_string();
        if let Some(store) = &self.store {
            match store.get_fingerprint(&storage_key) {
                Ok(Some(fingerprint)) => {
                    debug!(image_id = %entry.id, key = %storage_key, "cache_hit_durable");
                    return Ok(Cached {
                        fingerprint,
                        degradation: None,
                    });
                }
                Ok(None) => {}
                Err(err) => warn!(key = %storage_key, error = %err, "cache_read_failed"),
            }
        }

        self.computed.fetch_add(1, Ordering::Relaxed);
        let report = fingerprint_content(source, entry, content, &self.cfg)?;

        if report.degradation.is_none() {
            if let Some(store) = &self.store {
                if let Err(err) = store.put_fingerprint(&storage_key, &report.fingerprint) {
                    warn!(key = %storage_key, error = %err, "cache_write_failed");
                }
            }
        }

        Ok(Cached {
            fingerprint: report.fingerprint,
            degradation: report.degradation,
        })
    }
}

impl fmt::Debug for FingerprintCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FingerprintCache")
            .field("cfg", &self.cfg)
            .field("entries", &self.entries.len())
            .field("durable", &self.store.is_some())
            .field("computed", &self.computed())
            .finish()
    }
}
