//! Corpus inventory: the ordered list of images making up a corpus.

use std::fs;
use std::path::Path;
use std::time::Instant;

use tracing::{debug, info};

use crate::config::IngestConfig;
use crate::error::IngestError;
use crate::types::{ImageId, ImageKind, InventoryEntry};

/// Ordered corpus listing.
///
/// Entries are sorted by frame number, full frame first, then hints in hint
/// order. Unclassified images follow in name order. This order is the
/// deterministic corpus order used for tie-breaking during matching.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    entries: Vec<InventoryEntry>,
}

impl Inventory {
    /// Build an inventory from entries in arbitrary order.
    pub fn from_entries(mut entries: Vec<InventoryEntry>) -> Self {
        entries.sort_by(|a, b| {
            a.kind()
                .sort_key()
                .cmp(&b.kind().sort_key())
                .then_with(|| a.id.cmp(&b.id))
        });
        entries.dedup_by(|a, b| a.id == b.id);
        Self { entries }
    }

    /// List the frame and hint images directly inside `dir` (no recursion).
    /// Files outside the `frame<N>-…` naming scheme are skipped.
    pub fn scan_dir(dir: &Path, cfg: &IngestConfig) -> Result<Self, IngestError> {
        cfg.validate()?;
        let start = Instant::now();

        if !dir.is_dir() {
            return Err(IngestError::NotADirectory(dir.display().to_string()));
        }

        let mut entries = Vec::new();
        for item in fs::read_dir(dir).map_err(|e| IngestError::io(dir, e))? {
            let item = item.map_err(|e| IngestError::io(dir, e))?;
            let path = item.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                debug!(path = %path.display(), "skipping non utf-8 file name");
                continue;
            };
            let accepted = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| cfg.accepts_extension(e));
            if !accepted {
                continue;
            }
            let id = ImageId::from(name);
            if id.kind() == ImageKind::Other {
                debug!(image_id = %id, "skipping image outside the frame naming scheme");
                continue;
            }
            entries.push(InventoryEntry::new(id, path.clone()));
        }

        let inventory = Self::from_entries(entries);
        info!(
            dir = %dir.display(),
            images = inventory.len(),
            full_frames = inventory.full_frames().count(),
            elapsed_micros = start.elapsed().as_micros(),
            "inventory_scanned"
        );
        Ok(inventory)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[InventoryEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &InventoryEntry> {
        self.entries.iter()
    }

    /// Full source frames in frame order.
    pub fn full_frames(&self) -> impl Iterator<Item = &InventoryEntry> {
        self.entries
            .iter()
            .filter(|e| matches!(e.kind(), ImageKind::Full { .. }))
    }

    /// Hint crops taken from `frame`, in hint order.
    pub fn hints_for(&self, frame: u32) -> impl Iterator<Item = &InventoryEntry> {
        self.entries
            .iter()
            .filter(move |e| matches!(e.kind(), ImageKind::Hint { frame: f, .. } if f == frame))
    }

    pub fn find(&self, id: &str) -> Option<&InventoryEntry> {
        self.entries.iter().find(|e| e.id.as_str() == id)
    }

    /// Full frame `frame` when `hint` is `None`, otherwise that hint of it.
    pub fn locate(&self, frame: u32, hint: Option<u32>) -> Option<&InventoryEntry> {
        let wanted = match hint {
            None => ImageKind::Full { frame },
            Some(hint) => ImageKind::Hint { frame, hint },
        };
        self.entries.iter().find(|e| e.kind() == wanted)
    }
}

impl<'a> IntoIterator for &'a Inventory {
    type Item = &'a InventoryEntry;
    type IntoIter = std::slice::Iter<'a, InventoryEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"x").unwrap();
    }

    #[test]
    fn scan_orders_frames_then_hints() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "frame10-full.jpg",
            "frame2-1.jpg",
            "frame2-full.jpg",
            "frame2-0.jpg",
            "frame10-3.png",
            "notes.txt",
            "sad_mac.jpg",
            "frame2-1-kps.png",
            "frame2-full.jpg.kps.json",
        ] {
            touch(dir.path(), name);
        }

        let inventory = Inventory::scan_dir(dir.path(), &IngestConfig::default()).unwrap();
        let ids: Vec<&str> = inventory.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "frame2-full.jpg",
                "frame2-0.jpg",
                "frame2-1.jpg",
                "frame10-full.jpg",
                "frame10-3.png",
            ]
        );
    }

    #[test]
    fn scan_ignores_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("nested.jpg")).unwrap();
        touch(dir.path(), "frame1-full.jpg");
        let inventory = Inventory::scan_dir(dir.path(), &IngestConfig::default()).unwrap();
        assert_eq!(inventory.len(), 1);
    }

    #[test]
    fn scan_rejects_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            Inventory::scan_dir(&missing, &IngestConfig::default()),
            Err(IngestError::NotADirectory(_))
        ));
    }

    #[test]
    fn full_frames_and_hints_filter() {
        let inventory = Inventory::from_entries(
            ["frame1-full.jpg", "frame1-0.jpg", "frame1-1.jpg", "frame2-full.jpg", "frame2-0.jpg", "misc.jpg"]
                .into_iter()
                .map(|n| InventoryEntry::new(ImageId::from(n), n.into()))
                .collect(),
        );

        let full: Vec<&str> = inventory.full_frames().map(|e| e.id.as_str()).collect();
        assert_eq!(full, vec!["frame1-full.jpg", "frame2-full.jpg"]);

        let hints: Vec<&str> = inventory.hints_for(1).map(|e| e.id.as_str()).collect();
        assert_eq!(hints, vec!["frame1-0.jpg", "frame1-1.jpg"]);

        assert!(inventory.find("misc.jpg").is_some());
        assert!(inventory.find("frame9-full.jpg").is_none());
        assert_eq!(inventory.entries().last().unwrap().id.as_str(), "misc.jpg");

        assert_eq!(inventory.locate(2, None).unwrap().id.as_str(), "frame2-full.jpg");
        assert_eq!(inventory.locate(1, Some(1)).unwrap().id.as_str(), "frame1-1.jpg");
        assert!(inventory.locate(2, Some(5)).is_none());
    }

    #[test]
    fn duplicate_entries_collapse() {
        let entry = InventoryEntry::new(ImageId::from("frame1-full.jpg"), "a".into());
        let inventory = Inventory::from_entries(vec![entry.clone(), entry]);
        assert_eq!(inventory.len(), 1);
    }
}
