//! # framefp Matcher (`matcher`)
//!
//! ## Purpose
//!
//! `matcher` sits on top of the fingerprint layer (`fingerprint`) and the
//! index layer (`index`). Given a query image, as keypoints or a precomputed
//! fingerprint, it counts how many distinct pair tokens the query shares
//! with every indexed image and picks the image sharing the most.
//!
//! ## Core Types
//!
//! - [`MatchConfig`]: the acceptance floor `min_overlap` and the length of
//!   the ranked list.
//! - [`MatchResult`]: a [`MatchOutcome`] plus the overlap of every candidate,
//!   aligned with the index order or a caller-supplied candidate order.
//! - [`Matcher`]: wraps a shared [`index::FingerprintIndex`].
//! - [`score`] / [`score_candidates`]: the scoring functions, usable without
//!   a `Matcher`.
//!
//! Ties resolve to the earliest candidate. A best overlap below
//! `min_overlap` (by default: zero overlap) yields
//! [`MatchOutcome::NoConfidentMatch`].
//!
//! ## Example Usage
//!
//! ```
//! use fingerprint::{fingerprint_keypoints, FingerprintConfig, Keypoint};
//! use index::FingerprintIndex;
//! use matcher::{MatchConfig, Matcher};
//!
//! let cfg = FingerprintConfig::default();
//! let frame: Vec<Keypoint> = (0..8)
//!     .map(|i| Keypoint::new(i as f64 * 7.0, (i * i) as f64, 3.0, i as f64 * 40.0))
//!     .collect();
//!
//! let mut index = FingerprintIndex::new();
//! index
//!     .insert("frame1-full.jpg", fingerprint_keypoints(&frame, &cfg).unwrap())
//!     .unwrap();
//!
//! let matcher = Matcher::new(index, cfg, MatchConfig::default()).unwrap();
//! let result = matcher.match_keypoints(&frame).unwrap();
//! assert_eq!(result.best_image_id(), Some("frame1-full.jpg"));
//! ```
//!
//! ## Observability
//!
//! Install a [`MatchMetrics`] implementation via [`set_match_metrics`] to record
//! per-query latency and overlap statistics. Every [`Matcher`] in the process
//! shares the installed recorder.

pub mod engine;
pub mod metrics;
pub mod scorer;
pub mod types;

pub use crate::engine::Matcher;
pub use crate::metrics::{set_match_metrics, MatchMetrics};
pub use crate::scorer::{score, score_candidates};
pub use crate::types::{CandidateOverlap, MatchConfig, MatchError, MatchOutcome, MatchResult};
