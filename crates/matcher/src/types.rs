use fingerprint::FingerprintError;
use index::IndexError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Matching policy.
///
/// `MatchConfig` is cheap to clone and serde-friendly so it can be embedded
/// in higher-level configs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchConfig {
    /// Configuration schema version for this match config.
    #[serde(default = "MatchConfig::default_version")]
    pub version: u32,
    /// Smallest overlap accepted as a match. A best candidate below this is
    /// reported as no confident match.
    #[serde(default = "MatchConfig::default_min_overlap")]
    pub min_overlap: usize,
    /// Number of candidates kept by [`MatchResult::top`].
    #[serde(default = "MatchConfig::default_max_ranked")]
    pub max_ranked: usize,
}

impl MatchConfig {
    pub(crate) fn default_version() -> u32 {
        1
    }

    pub(crate) fn default_min_overlap() -> usize {
        1
    }

    pub(crate) fn default_max_ranked() -> usize {
        10
    }

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_overlap(mut self, min_overlap: usize) -> Self {
        self.min_overlap = min_overlap;
        self
    }

    pub fn with_max_ranked(mut self, max_ranked: usize) -> Self {
        self.max_ranked = max_ranked;
        self
    }

    pub fn validate(&self) -> Result<(), MatchError> {
        if self.version == 0 {
            return Err(MatchError::InvalidConfig("version must be >= 1".into()));
        }
        // Zero overlap is never a match.
        if self.min_overlap == 0 {
            return Err(MatchError::InvalidConfig("min_overlap must be >= 1".into()));
        }
        if self.max_ranked == 0 {
            return Err(MatchError::InvalidConfig("max_ranked must be >= 1".into()));
        }
        Ok(())
    }
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            version: Self::default_version(),
            min_overlap: Self::default_min_overlap(),
            max_ranked: Self::default_max_ranked(),
        }
    }
}

/// Overlap of the query with one candidate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CandidateOverlap {
    pub image_id: String,
    pub overlap: usize,
}

/// Decision of a match.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MatchOutcome {
    Matched { image_id: String, overlap: usize },
    NoConfidentMatch,
}

/// Outcome plus the overlap of every candidate, in candidate order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchResult {
    pub outcome: MatchOutcome,
    pub overlaps: Vec<CandidateOverlap>,
}

impl MatchResult {
    pub fn best_image_id(&self) -> Option<&str> {
        match &self.outcome {
            MatchOutcome::Matched { image_id, .. } => Some(image_id),
            MatchOutcome::NoConfidentMatch => None,
        }
    }

    pub fn is_match(&self) -> bool {
        matches!(self.outcome, MatchOutcome::Matched { .. })
    }

    /// Overlap counts alone, aligned with the candidate order.
    pub fn overlap_counts(&self) -> Vec<usize> {
        self.overlaps.iter().map(|c| c.overlap).collect()
    }

    /// Candidates by overlap, highest first. Equal overlaps keep candidate
    /// order.
    pub fn ranked(&self) -> Vec<&CandidateOverlap> {
        let mut ranked: Vec<&CandidateOverlap> = self.overlaps.iter().collect();
        ranked.sort_by(|a, b| b.overlap.cmp(&a.overlap));
        ranked
    }

    /// First `n` of [`ranked`](Self::ranked).
    pub fn top(&self, n: usize) -> Vec<&CandidateOverlap> {
        let mut ranked = self.ranked();
        ranked.truncate(n);
        ranked
    }
}

/// Errors that can occur while matching.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MatchError {
    /// Invalid configuration.
    #[error("invalid match config: {0}")]
    InvalidConfig(String),
    /// A referenced image id is not in the index.
    #[error("image {image_id} is not in the index")]
    IndexLookupFailure { image_id: String },
    /// The query was fingerprinted with different parameters than the index.
    #[error("query fingerprint parameters differ from the index parameters")]
    ParamsMismatch,
    /// Fingerprinting the query failed.
    #[error("fingerprint error: {0}")]
    Fingerprint(#[from] FingerprintError),
    /// Index read failed.
    #[error("index error: {0}")]
    Index(IndexError),
}

impl From<IndexError> for MatchError {
    fn from(err: IndexError) -> Self {
        match err {
            IndexError::NotFound { image_id } => MatchError::IndexLookupFailure { image_id },
            other => MatchError::Index(other),
        }
    }
}
