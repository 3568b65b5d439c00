//! Redb backend for persisted fingerprint indexes.
//!
//! Every operation is one redb transaction. `replace_all` drops and refills
//! the records table inside a single write transaction, so an index save
//! that fails before commit leaves the previous index on disk.
//!
//! ```yaml
//! index:
//!   backend: redb
//!   path: /data/framefp.redb
//! ```

use crate::{IndexBackend, IndexError};
use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition};
use std::path::Path;

const RECORDS: TableDefinition<&str, &[u8]> = TableDefinition::new("framefp_records");

fn backend_err<E: std::fmt::Display>(e: E) -> IndexError {
    IndexError::backend(e)
}

/// Persistent backend stored in a single redb file.
pub struct RedbBackend {
    db: Database,
}

impl RedbBackend {
    /// Open or create the database at `path`.
    ///
    /// ```no_run
    /// use framefp_index::RedbBackend;
    ///
    /// let backend = RedbBackend::open("/tmp/framefp.redb").unwrap();
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, IndexError> {
        let db = Database::create(path).map_err(backend_err)?;

        // Readers expect the table to exist even before the first save.
        let txn = db.begin_write().map_err(backend_err)?;
        txn.open_table(RECORDS).map_err(backend_err)?;
        txn.commit().map_err(backend_err)?;

        Ok(Self { db })
    }
}

impl IndexBackend for RedbBackend {
    fn replace_all(&self, records: Vec<(String, Vec<u8>)>) -> Result<(), IndexError> {
        let txn = self.db.begin_write().map_err(backend_err)?;
        txn.delete_table(RECORDS).map_err(backend_err)?;
        {
            let mut table = txn.open_table(RECORDS).map_err(backend_err)?;
            for (key, record) in &records {
                table
                    .insert(key.as_str(), record.as_slice())
                    .map_err(backend_err)?;
            }
        }
        // Dropping an uncommitted transaction aborts it.
        txn.commit().map_err(backend_err)
    }

    fn put_record(&self, key: &str, record: &[u8]) -> Result<(), IndexError> {
        let txn = self.db.begin_write().map_err(backend_err)?;
        {
            let mut table = txn.open_table(RECORDS).map_err(backend_err)?;
            table.insert(key, record).map_err(backend_err)?;
        }
        txn.commit().map_err(backend_err)
    }

    fn record(&self, key: &str) -> Result<Option<Vec<u8>>, IndexError> {
        let txn = self.db.begin_read().map_err(backend_err)?;
        let table = txn.open_table(RECORDS).map_err(backend_err)?;
        let found = table.get(key).map_err(backend_err)?;
        Ok(found.map(|guard| guard.value().to_vec()))
    }

    fn scan_records(
        &self,
        visitor: &mut dyn FnMut(&str, &[u8]) -> Result<(), IndexError>,
    ) -> Result<(), IndexError> {
        let txn = self.db.begin_read().map_err(backend_err)?;
        let table = txn.open_table(RECORDS).map_err(backend_err)?;
        for item in table.iter().map_err(backend_err)? {
            let (key, record) = item.map_err(backend_err)?;
            visitor(key.value(), record.value())?;
        }
        Ok(())
    }

    fn record_count(&self) -> Result<usize, IndexError> {
        let txn = self.db.begin_read().map_err(backend_err)?;
        let table = txn.open_table(RECORDS).map_err(backend_err)?;
        Ok(table.len().map_err(backend_err)? as usize)
    }
}
