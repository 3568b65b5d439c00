use crate::IndexError;
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Encoded fingerprint records keyed by image id (index records) or cache
/// key (memoized fingerprints).
pub trait IndexBackend: Send + Sync {
    /// Make `records` the complete contents of the backend.
    ///
    /// Either every record is replaced or nothing changes: a failure leaves
    /// the previous contents readable.
    fn replace_all(&self, records: Vec<(String, Vec<u8>)>) -> Result<(), IndexError>;

    /// Insert or overwrite the record under `key`, keeping all others.
    fn put_record(&self, key: &str, record: &[u8]) -> Result<(), IndexError>;

    /// The record under `key`.
    fn record(&self, key: &str) -> Result<Option<Vec<u8>>, IndexError>;

    /// Visit every record in ascending key order. A visitor error stops the
    /// scan and is returned.
    fn scan_records(
        &self,
        visitor: &mut dyn FnMut(&str, &[u8]) -> Result<(), IndexError>,
    ) -> Result<(), IndexError>;

    fn record_count(&self) -> Result<usize, IndexError>;
}

/// Selects and builds a backend.
///
/// ```
/// use framefp_index::BackendConfig;
///
/// let ephemeral = BackendConfig::in_memory();
/// let on_disk = BackendConfig::redb("/data/framefp.redb");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum BackendConfig {
    /// Redb database file at `path`. Requires the `backend-redb` feature
    /// (enabled by default).
    Redb { path: String },
    /// Process-local map. Contents vanish with the process.
    #[default]
    InMemory,
}

impl BackendConfig {
    pub fn in_memory() -> Self {
        BackendConfig::InMemory
    }

    pub fn redb<P: Into<String>>(path: P) -> Self {
        BackendConfig::Redb { path: path.into() }
    }

    pub fn is_persistent(&self) -> bool {
        matches!(self, BackendConfig::Redb { .. })
    }

    pub fn build(&self) -> Result<Box<dyn IndexBackend>, IndexError> {
        match self {
            BackendConfig::InMemory => Ok(Box::new(InMemoryBackend::new())),
            #[cfg(feature = "backend-redb")]
            BackendConfig::Redb { path } => Ok(Box::new(RedbBackend::open(path)?)),
            #[cfg(not(feature = "backend-redb"))]
            BackendConfig::Redb { .. } => Err(IndexError::InvalidConfig(
                "redb backend disabled at compile time".into(),
            )),
        }
    }
}

/// Records in a key-ordered map behind one lock.
#[derive(Default)]
pub struct InMemoryBackend {
    records: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<String, Vec<u8>>>, IndexError> {
        self.records
            .read()
            .map_err(|_| IndexError::backend("in-memory records lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<String, Vec<u8>>>, IndexError> {
        self.records
            .write()
            .map_err(|_| IndexError::backend("in-memory records lock poisoned"))
    }
}

impl IndexBackend for InMemoryBackend {
    fn replace_all(&self, records: Vec<(String, Vec<u8>)>) -> Result<(), IndexError> {
        let fresh: BTreeMap<String, Vec<u8>> = records.into_iter().collect();
        *self.write()? = fresh;
        Ok(())
    }

    fn put_record(&self, key: &str, record: &[u8]) -> Result<(), IndexError> {
        self.write()?.insert(key.to_string(), record.to_vec());
        Ok(())
    }

    fn record(&self, key: &str) -> Result<Option<Vec<u8>>, IndexError> {
        Ok(self.read()?.get(key).cloned())
    }

    fn scan_records(
        &self,
        visitor: &mut dyn FnMut(&str, &[u8]) -> Result<(), IndexError>,
    ) -> Result<(), IndexError> {
        for (key, record) in self.read()?.iter() {
            visitor(key, record)?;
        }
        Ok(())
    }

    fn record_count(&self) -> Result<usize, IndexError> {
        Ok(self.read()?.len())
    }
}

#[cfg(feature = "backend-redb")]
pub mod redb;

#[cfg(feature = "backend-redb")]
pub use self::redb::RedbBackend;
