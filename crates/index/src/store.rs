//! Persistence of fingerprint indexes through an [`IndexBackend`].

use std::time::Instant;

use bincode::config::standard;
use bincode::serde::{decode_from_slice, encode_to_vec};
use fingerprint::{Fingerprint, FingerprintMeta, HashToken};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{FingerprintIndex, IndexBackend, IndexConfig, IndexError, INDEX_SCHEMA_VERSION};

/// Stored form of one fingerprint.
///
/// `position` keeps the corpus order, which the backend key order does not.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct IndexRecord {
    pub schema_version: u16,
    /// Image id for index records, cache key for memoized fingerprints.
    pub key: String,
    pub position: u64,
    pub tokens: Vec<String>,
    pub meta: FingerprintMeta,
}

impl IndexRecord {
    pub fn from_fingerprint(key: impl Into<String>, position: u64, fp: &Fingerprint) -> Self {
        Self {
            schema_version: INDEX_SCHEMA_VERSION,
            key: key.into(),
            position,
            tokens: fp.tokens.iter().map(|t| t.as_str().to_string()).collect(),
            meta: fp.meta.clone(),
        }
    }

    pub fn into_fingerprint(self) -> Fingerprint {
        Fingerprint {
            tokens: self.tokens.into_iter().map(HashToken::from).collect(),
            meta: self.meta,
        }
    }
}

/// A backend plus the codec settings used to read and write it.
pub struct IndexStore {
    backend: Box<dyn IndexBackend>,
    cfg: IndexConfig,
}

impl IndexStore {
    /// Open the backend named by `cfg`.
    pub fn open(cfg: IndexConfig) -> Result<Self, IndexError> {
        cfg.validate()?;
        let backend = cfg.backend.build()?;
        Ok(Self { backend, cfg })
    }

    /// Use a caller-provided backend (e.g. a shared in-memory one in tests).
    pub fn with_backend(cfg: IndexConfig, backend: Box<dyn IndexBackend>) -> Self {
        Self { backend, cfg }
    }

    pub fn config(&self) -> &IndexConfig {
        &self.cfg
    }

    /// Replace the stored contents with `index`.
    ///
    /// Records are encoded up front and handed to the backend as one
    /// replacement, so a failed save leaves the previously saved index
    /// loadable.
    pub fn save(&self, index: &FingerprintIndex) -> Result<usize, IndexError> {
        let start = Instant::now();
        let mut records = Vec::with_capacity(index.len());
        for (pos, entry) in index.iter().enumerate() {
            let record =
                IndexRecord::from_fingerprint(entry.image_id(), pos as u64, entry.fingerprint());
            records.push((record.key.clone(), self.encode_record(&record)?));
        }

        let previous = self.backend.record_count()?;
        let written = records.len();
        self.backend.replace_all(records)?;
        info!(
            records = written,
            previous,
            elapsed_micros = start.elapsed().as_micros(),
            "index_saved"
        );
        Ok(written)
    }

    /// Rebuild the index in its stored corpus order.
    pub fn load(&self) -> Result<FingerprintIndex, IndexError> {
        let start = Instant::now();
        let mut records = Vec::new();
        self.scan_records(&mut |record| {
            records.push(record);
            Ok(())
        })?;
        records.sort_by_key(|r| r.position);

        for (expected, record) in records.iter().enumerate() {
            if record.position != expected as u64 {
                return Err(IndexError::Decode(format!(
                    "record {} has position {}, expected {expected}",
                    record.key, record.position
                )));
            }
        }

        let index = FingerprintIndex::from_entries(
            records
                .into_iter()
                .map(|r| (r.key.clone(), r.into_fingerprint())),
        )?;
        info!(
            records = index.len(),
            elapsed_micros = start.elapsed().as_micros(),
            "index_loaded"
        );
        Ok(index)
    }

    /// Store a single fingerprint under `key`.
    pub fn put_fingerprint(&self, key: &str, fp: &Fingerprint) -> Result<(), IndexError> {
        let record = IndexRecord::from_fingerprint(key, 0, fp);
        self.backend.put_record(key, &self.encode_record(&record)?)
    }

    /// Fingerprint stored under `key`, if any.
    pub fn get_fingerprint(&self, key: &str) -> Result<Option<Fingerprint>, IndexError> {
        match self.backend.record(key)? {
            Some(data) => {
                let record = self.decode_record(&data)?;
                debug!(key, tokens = record.tokens.len(), "fingerprint_read");
                Ok(Some(record.into_fingerprint()))
            }
            None => Ok(None),
        }
    }

    /// Number of stored records.
    pub fn len(&self) -> Result<usize, IndexError> {
        self.backend.record_count()
    }

    pub fn is_empty(&self) -> Result<bool, IndexError> {
        Ok(self.len()? == 0)
    }

    fn scan_records(
        &self,
        visitor: &mut dyn FnMut(IndexRecord) -> Result<(), IndexError>,
    ) -> Result<(), IndexError> {
        self.backend.scan_records(&mut |key, data| {
            let record = self.decode_record(data)?;
            if record.key != key {
                return Err(IndexError::Decode(format!(
                    "record stored under {key} carries key {}",
                    record.key
                )));
            }
            visitor(record)
        })
    }

    pub(crate) fn decode_record(&self, data: &[u8]) -> Result<IndexRecord, IndexError> {
        let decompressed = self.cfg.compression.decompress(data)?;
        let (record, _): (IndexRecord, usize) = decode_from_slice(&decompressed, standard())?;
        if record.schema_version != INDEX_SCHEMA_VERSION {
            return Err(IndexError::UnsupportedSchema {
                found: record.schema_version,
            });
        }
        Ok(record)
    }

    fn encode_record(&self, rec: &IndexRecord) -> Result<Vec<u8>, IndexError> {
        let encoded = encode_to_vec(rec, standard())?;
        self.cfg.compression.compress(&encoded)
    }
}
