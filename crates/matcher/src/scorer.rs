//! Token-overlap scoring.
//!
//! The overlap between two fingerprints is the size of the intersection of
//! their distinct token sets. The best candidate is the first one reaching
//! the maximum overlap, so ties resolve to the earliest candidate in order.

use fingerprint::Fingerprint;
use index::{FingerprintIndex, IndexEntry};

use crate::types::{CandidateOverlap, MatchConfig, MatchError, MatchOutcome, MatchResult};

/// Score `query` against every entry of `index`, in index order.
pub fn score(query: &Fingerprint, index: &FingerprintIndex, cfg: &MatchConfig) -> MatchResult {
    score_entries(query, index.iter(), cfg)
}

/// Score `query` against `candidates`, in the order given.
///
/// Every candidate must be indexed; an unknown id fails the whole call with
/// [`MatchError::IndexLookupFailure`].
pub fn score_candidates<S: AsRef<str>>(
    query: &Fingerprint,
    index: &FingerprintIndex,
    candidates: &[S],
    cfg: &MatchConfig,
) -> Result<MatchResult, MatchError> {
    let entries = candidates
        .iter()
        .map(|id| index.get(id.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(score_entries(query, entries, cfg))
}

fn score_entries<'a, I>(query: &Fingerprint, entries: I, cfg: &MatchConfig) -> MatchResult
where
    I: IntoIterator<Item = &'a IndexEntry>,
{
    let distinct = query.distinct();
    let overlaps: Vec<CandidateOverlap> = entries
        .into_iter()
        .map(|entry| CandidateOverlap {
            image_id: entry.image_id().to_string(),
            overlap: entry.overlap(&distinct),
        })
        .collect();

    let outcome = match best_position(&overlaps) {
        Some(pos) if overlaps[pos].overlap >= cfg.min_overlap => MatchOutcome::Matched {
            image_id: overlaps[pos].image_id.clone(),
            overlap: overlaps[pos].overlap,
        },
        _ => MatchOutcome::NoConfidentMatch,
    };

    MatchResult { outcome, overlaps }
}

/// Position of the first maximum.
fn best_position(overlaps: &[CandidateOverlap]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (pos, candidate) in overlaps.iter().enumerate() {
        match best {
            Some(b) if overlaps[b].overlap >= candidate.overlap => {}
            _ => best = Some(pos),
        }
    }
    best
}
