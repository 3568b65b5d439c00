//! Corpus indexing.
//!
//! Images are fingerprinted in parallel on the rayon pool; results are then
//! inserted by a single writer in inventory order, so the index order does
//! not depend on scheduling.

use std::time::Instant;

use fingerprint::FingerprintConfig;
use index::FingerprintIndex;
use ingest::{ImageId, Inventory, InventoryEntry, KeypointSource};
use rayon::prelude::*;
use tracing::info;

use crate::{Degradation, PipelineError, fingerprint_image};

/// A freshly built index and the images that degraded while building it.
#[derive(Debug, Clone)]
pub struct CorpusBuild {
    pub index: FingerprintIndex,
    pub degraded: Vec<(ImageId, Degradation)>,
}

impl CorpusBuild {
    pub fn is_clean(&self) -> bool {
        self.degraded.is_empty()
    }
}

/// Fingerprint `entries` and index them in the given order.
pub fn build_index<S>(
    entries: &[InventoryEntry],
    source: &S,
    cfg: &FingerprintConfig,
) -> Result<CorpusBuild, PipelineError>
where
    S: KeypointSource + ?Sized,
{
    cfg.validate()?;
    let start = Instant::now();

    let reports = entries
        .par_iter()
        .map(|entry| fingerprint_image(source, entry, cfg))
        .collect::<Result<Vec<_>, _>>()?;

    let mut index = FingerprintIndex::with_capacity(reports.len());
    let mut degraded = Vec::new();
    let mut tokens = 0;
    for report in reports {
        tokens += report.fingerprint.len();
        if let Some(cause) = report.degradation {
            degraded.push((report.image_id.clone(), cause));
        }
        index.insert(report.image_id.to_string(), report.fingerprint)?;
    }

    info!(
        images = index.len(),
        degraded = degraded.len(),
        tokens,
        elapsed_micros = start.elapsed().as_micros(),
        "corpus_indexed"
    );
    Ok(CorpusBuild { index, degraded })
}

/// Index the full frames of `inventory`. Hint crops are queries, not
/// candidates, and stay out of the index.
pub fn build_corpus_index<S>(
    inventory: &Inventory,
    source: &S,
    cfg: &FingerprintConfig,
) -> Result<CorpusBuild, PipelineError>
where
    S: KeypointSource + ?Sized,
{
    let frames: Vec<InventoryEntry> = inventory.full_frames().cloned().collect();
    build_index(&frames, source, cfg)
}
