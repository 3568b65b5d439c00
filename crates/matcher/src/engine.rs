use std::sync::Arc;
use std::time::Instant;

use fingerprint::{fingerprint_keypoints, meta_for, Fingerprint, FingerprintConfig, Keypoint};
use index::FingerprintIndex;
use tracing::{debug, info};

use crate::metrics::metrics_recorder;
use crate::scorer::{score, score_candidates};
use crate::types::{MatchConfig, MatchError, MatchOutcome, MatchResult};


/// Answers "which indexed image shares the most geometry with this one?".
///
/// The index is immutable and shared through an `Arc`, so a `Matcher` can be
/// cloned into worker threads and queried without locks.
#[derive(Debug, Clone)]
pub struct Matcher {
    index: Arc<FingerprintIndex>,
    fingerprint_cfg: FingerprintConfig,
    cfg: MatchConfig,
}

impl Matcher {
    /// Construct a matcher that owns `index`.
    pub fn new(
        index: FingerprintIndex,
        fingerprint_cfg: FingerprintConfig,
        cfg: MatchConfig,
    ) -> Result<Self, MatchError> {
        Self::with_index_arc(Arc::new(index), fingerprint_cfg, cfg)
    }

    /// Construct a matcher from a shared index handle.
    ///
    /// `fingerprint_cfg` must describe the parameters the index was built
    /// with; it is used to fingerprint keypoint queries.
    pub fn with_index_arc(
        index: Arc<FingerprintIndex>,
        fingerprint_cfg: FingerprintConfig,
        cfg: MatchConfig,
    ) -> Result<Self, MatchError> {
        fingerprint_cfg.validate()?;
        cfg.validate()?;
        if let Some(params) = index.params() {
            if !params.same_params(&meta_for(&fingerprint_cfg, 0)) {
                return Err(MatchError::ParamsMismatch);
            }
        }
        Ok(Self {
            index,
            fingerprint_cfg,
            cfg,
        })
    }

    pub fn index(&self) -> &Arc<FingerprintIndex> {
        &self.index
    }

    pub fn config(&self) -> &MatchConfig {
        &self.cfg
    }

    pub fn fingerprint_config(&self) -> &FingerprintConfig {
        &self.fingerprint_cfg
    }

    /// Match an image that is itself indexed against the whole index.
    pub fn match_image_id(&self, image_id: &str) -> Result<MatchResult, MatchError> {
        let entry = self.index.get(image_id)?;
        let start = Instant::now();
        let result = score(entry.fingerprint(), &self.index, &self.cfg);
        Ok(self.finish(result, start))
    }

    /// Match a precomputed fingerprint against the whole index.
    pub fn match_fingerprint(&self, query: &Fingerprint) -> Result<MatchResult, MatchError> {
        self.check_params(query)?;
        let start = Instant::now();
        let result = score(query, &self.index, &self.cfg);
        Ok(self.finish(result, start))
    }

    /// Fingerprint `keypoints` with the index parameters and match them.
    pub fn match_keypoints(&self, keypoints: &[Keypoint]) -> Result<MatchResult, MatchError> {
        let query = fingerprint_keypoints(keypoints, &self.fingerprint_cfg)?;
        debug!(
            keypoints = keypoints.len(),
            tokens = query.len(),
            "query_fingerprinted"
        );
        self.match_fingerprint(&query)
    }

    /// Match against a caller-chosen subset of the index. Overlaps follow the
    /// order of `candidates`, which also decides ties.
    pub fn match_candidates<S: AsRef<str>>(
        &self,
        query: &Fingerprint,
        candidates: &[S],
    ) -> Result<MatchResult, MatchError> {
        self.check_params(query)?;
        let start = Instant::now();
        let result = score_candidates(query, &self.index, candidates, &self.cfg)?;
        Ok(self.finish(result, start))
    }

    fn check_params(&self, query: &Fingerprint) -> Result<(), MatchError> {
        match self.index.params() {
            Some(params) if !params.same_params(&query.meta) => Err(MatchError::ParamsMismatch),
            _ => Ok(()),
        }
    }

    fn finish(&self, result: MatchResult, start: Instant) -> MatchResult {
        let latency = start.elapsed();
        let best_overlap = result.overlaps.iter().map(|c| c.overlap).max().unwrap_or(0);

        match &result.outcome {
            MatchOutcome::Matched { image_id, overlap } => info!(
                image_id = %image_id,
                overlap,
                candidates = result.overlaps.len(),
                elapsed_micros = latency.as_micros(),
                "match_found"
            ),
            MatchOutcome::NoConfidentMatch => info!(
                best_overlap,
                min_overlap = self.cfg.min_overlap,
                candidates = result.overlaps.len(),
                elapsed_micros = latency.as_micros(),
                "match_not_confident"
            ),
        }

        if let Some(recorder) = metrics_recorder() {
            recorder.record_match(
                latency,
                result.overlaps.len(),
                best_overlap,
                result.is_match(),
            );
        }

        result
    }
}
