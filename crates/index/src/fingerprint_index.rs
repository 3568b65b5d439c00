//! The in-memory, ordered fingerprint index queried by the matcher.

use std::collections::HashSet;

use fingerprint::{Fingerprint, FingerprintMeta, HashToken};
use hashbrown::{HashMap, HashSet as TokenSet};

use crate::IndexError;

/// One indexed image: its fingerprint plus the precomputed distinct token
/// set used for overlap scoring.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    image_id: String,
    fingerprint: Fingerprint,
    distinct: TokenSet<HashToken>,
}

impl IndexEntry {
    fn new(image_id: String, fingerprint: Fingerprint) -> Self {
        let distinct = fingerprint.tokens.iter().cloned().collect();
        Self {
            image_id,
            fingerprint,
            distinct,
        }
    }

    pub fn image_id(&self) -> &str {
        &self.image_id
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Tokens in generation order, duplicates included.
    pub fn tokens(&self) -> &[HashToken] {
        &self.fingerprint.tokens
    }

    /// Indexed but could not be characterized.
    pub fn is_empty(&self) -> bool {
        self.fingerprint.is_empty()
    }

    pub fn distinct_len(&self) -> usize {
        self.distinct.len()
    }

    pub fn contains_token(&self, token: &str) -> bool {
        self.distinct.contains(token)
    }

    /// Number of distinct query tokens also present in this entry.
    pub fn overlap(&self, query: &HashSet<&str>) -> usize {
        if query.len() <= self.distinct.len() {
            query.iter().filter(|t| self.distinct.contains(**t)).count()
        } else {
            self.distinct
                .iter()
                .filter(|t| query.contains(t.as_str()))
                .count()
        }
    }
}

/// Ordered mapping from image id to fingerprint.
///
/// Iteration order is insertion order; it is the corpus order used for
/// tie-breaking and it survives persistence. All entries share the same
/// token parameters, so overlaps between them are meaningful.
#[derive(Debug, Clone, Default)]
pub struct FingerprintIndex {
    entries: Vec<IndexEntry>,
    positions: HashMap<String, usize>,
}

impl FingerprintIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            positions: HashMap::with_capacity(capacity),
        }
    }

    /// Build an index from `(image_id, fingerprint)` pairs in corpus order.
    pub fn from_entries<I, S>(entries: I) -> Result<Self, IndexError>
    where
        I: IntoIterator<Item = (S, Fingerprint)>,
        S: Into<String>,
    {
        let iter = entries.into_iter();
        let mut index = Self::with_capacity(iter.size_hint().0);
        for (id, fp) in iter {
            index.insert(id, fp)?;
        }
        Ok(index)
    }

    /// Append an image. Rejects ids already present and fingerprints built
    /// with parameters different from the rest of the index.
    pub fn insert(
        &mut self,
        image_id: impl Into<String>,
        fingerprint: Fingerprint,
    ) -> Result<(), IndexError> {
        let image_id = image_id.into();
        if self.positions.contains_key(&image_id) {
            return Err(IndexError::DuplicateId { image_id });
        }
        if let Some(params) = self.params() {
            if !params.same_params(&fingerprint.meta) {
                return Err(IndexError::ParamsMismatch { image_id });
            }
        }
        self.positions.insert(image_id.clone(), self.entries.len());
        self.entries.push(IndexEntry::new(image_id, fingerprint));
        Ok(())
    }

    /// Entry for `image_id`. An absent id is an error, distinct from an
    /// indexed image whose fingerprint is empty.
    pub fn get(&self, image_id: &str) -> Result<&IndexEntry, IndexError> {
        self.positions
            .get(image_id)
            .map(|&pos| &self.entries[pos])
            .ok_or_else(|| IndexError::NotFound {
                image_id: image_id.to_string(),
            })
    }

    pub fn contains(&self, image_id: &str) -> bool {
        self.positions.contains_key(image_id)
    }

    /// Corpus position of `image_id`.
    pub fn position(&self, image_id: &str) -> Option<usize> {
        self.positions.get(image_id).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, IndexEntry> {
        self.entries.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(IndexEntry::image_id)
    }

    /// Token parameters shared by every entry, `None` while empty.
    pub fn params(&self) -> Option<&FingerprintMeta> {
        self.entries.first().map(|e| &e.fingerprint.meta)
    }

    /// Number of entries whose fingerprint is empty.
    pub fn empty_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_empty()).count()
    }
}

impl<'a> IntoIterator for &'a FingerprintIndex {
    type Item = &'a IndexEntry;
    type IntoIter = std::slice::Iter<'a, IndexEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use fingerprint::{meta_for, FingerprintConfig};

    pub(crate) fn fp(tokens: &[&str]) -> Fingerprint {
        Fingerprint {
            tokens: tokens.iter().map(|t| HashToken::from(*t)).collect(),
            meta: meta_for(&FingerprintConfig::default(), tokens.len()),
        }
    }

    #[test]
    fn preserves_insertion_order() {
        let index = FingerprintIndex::from_entries(vec![
            ("frame2-full.jpg", fp(&["a"])),
            ("frame1-full.jpg", fp(&["b"])),
            ("frame3-full.jpg", fp(&[])),
        ])
        .unwrap();
        let ids: Vec<&str> = index.ids().collect();
        assert_eq!(ids, vec!["frame2-full.jpg", "frame1-full.jpg", "frame3-full.jpg"]);
        assert_eq!(index.position("frame1-full.jpg"), Some(1));
    }

    #[test]
    fn get_distinguishes_missing_from_empty() {
        let index = FingerprintIndex::from_entries(vec![("frame1-full.jpg", fp(&[]))]).unwrap();
        assert!(index.get("frame1-full.jpg").unwrap().is_empty());
        assert_eq!(
            index.get("frame2-full.jpg").unwrap_err(),
            IndexError::NotFound {
                image_id: "frame2-full.jpg".to_string()
            }
        );
        assert_eq!(index.empty_count(), 1);
    }

    #[test]
    fn duplicate_id_rejected() {
        let mut index = FingerprintIndex::new();
        index.insert("frame1-full.jpg", fp(&["a"])).unwrap();
        assert!(matches!(
            index.insert("frame1-full.jpg", fp(&["b"])),
            Err(IndexError::DuplicateId { .. })
        ));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn mismatched_params_rejected() {
        let mut index = FingerprintIndex::new();
        index.insert("frame1-full.jpg", fp(&["a"])).unwrap();

        let mut other = fp(&["a"]);
        other.meta = meta_for(&FingerprintConfig::new().with_k(3), 1);
        assert!(matches!(
            index.insert("frame2-full.jpg", other),
            Err(IndexError::ParamsMismatch { .. })
        ));
    }

    #[test]
    fn overlap_counts_distinct_shared_tokens() {
        let index = FingerprintIndex::from_entries(vec![(
            "frame1-full.jpg",
            fp(&["a", "b", "b", "c"]),
        )])
        .unwrap();
        let entry = index.get("frame1-full.jpg").unwrap();
        assert_eq!(entry.distinct_len(), 3);
        assert_eq!(entry.tokens().len(), 4);

        let small: HashSet<&str> = ["b", "z"].into_iter().collect();
        assert_eq!(entry.overlap(&small), 1);

        let large: HashSet<&str> = ["a", "b", "c", "x", "y"].into_iter().collect();
        assert_eq!(entry.overlap(&large), 3);
        assert!(entry.contains_token("c"));
    }
}
