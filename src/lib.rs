//! Workspace umbrella crate for framefp.
//!
//! This crate stitches the stages together: corpus images come in through
//! `ingest`, become keypoint-pair fingerprints in `fingerprint`, are stored
//! in an `index::FingerprintIndex` and queried with `matcher::Matcher`.
//!
//! Per-image failures never abort a corpus build. An image that cannot be
//! read, decoded or detected, or that has fewer than two keypoints, gets an
//! empty fingerprint and a [`Degradation`] explaining why.

pub mod cache;
pub mod config;
pub mod corpus;

use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub use fingerprint::{
    Fingerprint, FingerprintConfig, FingerprintError, FingerprintMeta, HashToken, Keypoint,
    MIN_KEYPOINTS, fingerprint_keypoints, meta_for,
};
pub use index::{
    BackendConfig, CompressionCodec, CompressionConfig, FingerprintIndex, IndexConfig,
    IndexDocument, IndexError, IndexStore,
};
pub use ingest::{
    DecodingSource, DetectError, HarrisConfig, HarrisProvider, ImageId, ImageKind, IngestConfig,
    IngestError, Inventory, InventoryEntry, KeypointProvider, KeypointSource, SidecarSource,
    load_keypoints, load_keypoints_from_content, write_sidecar,
};
pub use matcher::{
    CandidateOverlap, MatchConfig, MatchError, MatchOutcome, MatchResult, Matcher,
};

pub use crate::cache::{CacheKey, FingerprintCache};
pub use crate::config::{ConfigLoadError, FramefpConfig, KeypointSourceKind};
pub use crate::corpus::{CorpusBuild, build_corpus_index, build_index};

/// Errors that can occur while running images through the pipeline.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PipelineError {
    #[error("fingerprint failure: {0}")]
    Fingerprint(#[from] FingerprintError),
    #[error("ingest failure: {0}")]
    Ingest(#[from] IngestError),
    #[error("index failure: {0}")]
    Index(#[from] IndexError),
    #[error("match failure: {0}")]
    Match(#[from] MatchError),
    #[error("image {0} is not in the corpus inventory")]
    UnknownImage(String),
}

/// Why an image ended up with an empty fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cause", rename_all = "snake_case")]
pub enum Degradation {
    /// Fewer than two keypoints, so no pair exists.
    InsufficientKeypoints { found: usize },
    /// The image file could not be read or decoded.
    Decode { message: String },
    /// The keypoint detector failed.
    Detection { message: String },
    /// Stored keypoints could not be read.
    Sidecar { message: String },
}

impl Degradation {
    fn from_ingest(err: &IngestError) -> Self {
        match err {
            IngestError::Detect(e) => Degradation::Detection {
                message: e.to_string(),
            },
            IngestError::Sidecar { .. } => Degradation::Sidecar {
                message: err.to_string(),
            },
            other => Degradation::Decode {
                message: other.to_string(),
            },
        }
    }
}

/// Fingerprint of one inventory image plus the reason it is empty, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FingerprintReport {
    pub image_id: ImageId,
    pub fingerprint: Fingerprint,
    pub degradation: Option<Degradation>,
}

impl FingerprintReport {
    pub fn is_degraded(&self) -> bool {
        self.degradation.is_some()
    }
}

/// Metrics observer for the fingerprint stage.
pub trait PipelineMetrics: Send + Sync {
    fn record_fingerprint(
        &self,
        latency: Duration,
        tokens: usize,
        degradation: Option<&Degradation>,
    );
}

/// Install or clear the global pipeline metrics recorder.
pub fn set_pipeline_metrics(recorder: Option<Arc<dyn PipelineMetrics>>) {
    let mut guard = metrics_lock()
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = recorder;
}

fn metrics_lock() -> &'static RwLock<Option<Arc<dyn PipelineMetrics>>> {
    static METRICS: OnceCell<RwLock<Option<Arc<dyn PipelineMetrics>>>> = OnceCell::new();
    METRICS.get_or_init(|| RwLock::new(None))
}

fn metrics_recorder() -> Option<Arc<dyn PipelineMetrics>> {
    let guard = metrics_lock()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    guard.clone()
}

struct MetricsSpan {
    recorder: Arc<dyn PipelineMetrics>,
    start: Instant,
}

impl MetricsSpan {
    fn start() -> Option<Self> {
        metrics_recorder().map(|recorder| Self {
            recorder,
            start: Instant::now(),
        })
    }

    fn record_fingerprint(self, report: &FingerprintReport) {
        self.recorder.record_fingerprint(
            self.start.elapsed(),
            report.fingerprint.len(),
            report.degradation.as_ref(),
        );
    }
}

/// Fingerprint one inventory image.
///
/// Failing to obtain keypoints degrades to an empty fingerprint; only an
/// invalid `cfg` is an error.
pub fn fingerprint_image<S>(
    source: &S,
    entry: &InventoryEntry,
    cfg: &FingerprintConfig,
) -> Result<FingerprintReport, PipelineError>
where
    S: KeypointSource + ?Sized,
{
    cfg.validate()?;
    let span = MetricsSpan::start();
    let keypoints = load_keypoints(source, entry);
    report(entry, keypoints, cfg, span)
}

/// [`fingerprint_image`] over content bytes already read from the source's
/// content path, so the fingerprint describes exactly those bytes.
pub(crate) fn fingerprint_content<S>(
    source: &S,
    entry: &InventoryEntry,
    content: &[u8],
    cfg: &FingerprintConfig,
) -> Result<FingerprintReport, PipelineError>
where
    S: KeypointSource + ?Sized,
{
    cfg.validate()?;
    let span = MetricsSpan::start();
    let keypoints = load_keypoints_from_content(source, entry, content);
    report(entry, keypoints, cfg, span)
}

fn report(
    entry: &InventoryEntry,
    keypoints: Result<Vec<Keypoint>, IngestError>,
    cfg: &FingerprintConfig,
    span: Option<MetricsSpan>,
) -> Result<FingerprintReport, PipelineError> {
    let report = match keypoints {
        Ok(keypoints) => {
            let fingerprint = fingerprint_keypoints(&keypoints, cfg)?;
            let degradation = (keypoints.len() < MIN_KEYPOINTS)
                .then_some(Degradation::InsufficientKeypoints {
                    found: keypoints.len(),
                });
            FingerprintReport {
                image_id: entry.id.clone(),
                fingerprint,
                degradation,
            }
        }
        Err(err) => FingerprintReport {
            image_id: entry.id.clone(),
            fingerprint: Fingerprint::empty(meta_for(cfg, 0)),
            degradation: Some(Degradation::from_ingest(&err)),
        },
    };

    match &report.degradation {
        Some(cause) => warn!(image_id = %entry.id, cause = ?cause, "fingerprint_degraded"),
        None => debug!(
            image_id = %entry.id,
            tokens = report.fingerprint.len(),
            "image_fingerprinted"
        ),
    }
    if let Some(span) = span {
        span.record_fingerprint(&report);
    }
    Ok(report)
}

/// Fingerprint an inventory image through `cache` and match it.
pub fn match_entry<S>(
    matcher: &Matcher,
    cache: &FingerprintCache,
    source: &S,
    entry: &InventoryEntry,
) -> Result<MatchResult, PipelineError>
where
    S: KeypointSource + ?Sized,
{
    let report = cache.get_or_compute(source, entry)?;
    Ok(matcher.match_fingerprint(&report.fingerprint)?)
}
