//! Portable JSON form of a fingerprint index.
//!
//! Entries are an ordered array, so serializing the same index always yields
//! the same bytes and reading it back restores the corpus order.

use std::io::{Read, Write};

use fingerprint::Fingerprint;
use serde::{Deserialize, Serialize};

use crate::{FingerprintIndex, IndexError, INDEX_SCHEMA_VERSION};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDocument {
    pub schema_version: u16,
    pub entries: Vec<DocumentEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentEntry {
    pub image_id: String,
    pub fingerprint: Fingerprint,
}

impl From<&FingerprintIndex> for IndexDocument {
    fn from(index: &FingerprintIndex) -> Self {
        Self {
            schema_version: INDEX_SCHEMA_VERSION,
            entries: index
                .iter()
                .map(|e| DocumentEntry {
                    image_id: e.image_id().to_string(),
                    fingerprint: e.fingerprint().clone(),
                })
                .collect(),
        }
    }
}

impl TryFrom<IndexDocument> for FingerprintIndex {
    type Error = IndexError;

    fn try_from(doc: IndexDocument) -> Result<Self, Self::Error> {
        if doc.schema_version != INDEX_SCHEMA_VERSION {
            return Err(IndexError::UnsupportedSchema {
                found: doc.schema_version,
            });
        }
        FingerprintIndex::from_entries(
            doc.entries
                .into_iter()
                .map(|e| (e.image_id, e.fingerprint)),
        )
    }
}

impl FingerprintIndex {
    /// Write the index as pretty-printed JSON.
    pub fn write_json<W: Write>(&self, writer: W) -> Result<(), IndexError> {
        serde_json::to_writer_pretty(writer, &IndexDocument::from(self))
            .map_err(|e| IndexError::Json(e.to_string()))
    }

    pub fn to_json_string(&self) -> Result<String, IndexError> {
        serde_json::to_string_pretty(&IndexDocument::from(self))
            .map_err(|e| IndexError::Json(e.to_string()))
    }

    /// Read an index written by [`write_json`](Self::write_json).
    pub fn read_json<R: Read>(reader: R) -> Result<Self, IndexError> {
        let doc: IndexDocument =
            serde_json::from_reader(reader).map_err(|e| IndexError::Json(e.to_string()))?;
        doc.try_into()
    }
}
