//! # framefp Fingerprinting
//!
//! This crate turns the keypoints detected in one image into a bag of
//! quantized geometric hash tokens. Two images that share a region share the
//! tokens describing the keypoint pairs inside it, regardless of where that
//! region sits in each image.
//!
//! ## Contract
//!
//! - The layer **only** consumes [`Keypoint`] records from an external
//!   detector. It never decodes images or reads files.
//! - The API is a pure function of `(keypoints, config)` with no I/O and no
//!   reliance on clocks or global process state.
//! - The order of the incoming keypoints affects the order of the emitted
//!   tokens but not which tokens are emitted.
//!
//! Invariant: for the same keypoints and the same [`FingerprintConfig`], the
//! emitted token list is byte identical.
//!
//! ## Core Pipeline
//!
//! 1.  **Neighbor selection**: for every keypoint, the `k` nearest other
//!     keypoints by Euclidean distance, ties broken by keypoint index.
//! 2.  **Pair hashing**: every directed `(keypoint, neighbor)` relation is
//!     rendered as `a1|a2|a12|s1|s2` (orientations, reference-direction
//!     angle, scales), quantized and fixed-decimal formatted.
//! 3.  **Aggregation**: all tokens of the image form its [`Fingerprint`].
//!
//! ## Example Usage
//!
//! ```
//! use fingerprint::{fingerprint_keypoints, FingerprintConfig, Keypoint};
//!
//! let keypoints = vec![
//!     Keypoint::new(0.0, 0.0, 5.0, 0.0),
//!     Keypoint::new(0.0, 10.0, 5.0, 0.0),
//! ];
//! let cfg = FingerprintConfig::new().with_k(1);
//!
//! let fp = fingerprint_keypoints(&keypoints, &cfg).unwrap();
//!
//! assert_eq!(fp.tokens[0].as_str(), "0|0|0|5|5");
//! assert_eq!(fp.len(), 2);
//! ```

pub mod config;
pub mod fingerprint;
pub mod keypoint;
pub mod neighbors;
pub mod pair_hash;

pub use crate::config::{FingerprintConfig, FingerprintError, MAX_DECIMALS};
pub use crate::fingerprint::{Fingerprint, FingerprintMeta, HashToken};
pub use crate::keypoint::Keypoint;
pub use crate::neighbors::{select_neighbors, NeighborRelation};
pub use crate::pair_hash::{hash_pair, reference_angle_degrees, TOKEN_SEPARATOR};

/// Current token algorithm version for this crate.
pub const ALGORITHM_VERSION: u16 = 1;

/// Human readable algorithm identifier.
pub const ALGORITHM_NAME: &str = "knn_pair_acos_v1";

/// Minimum number of keypoints needed to form a single pair.
pub const MIN_KEYPOINTS: usize = 2;

/// Metadata describing a fingerprint built with `cfg` from `keypoint_count`
/// keypoints.
pub fn meta_for(cfg: &FingerprintConfig, keypoint_count: usize) -> FingerprintMeta {
    FingerprintMeta {
        algorithm_version: ALGORITHM_VERSION,
        algorithm_name: ALGORITHM_NAME.to_string(),
        k: cfg.k,
        quantization_factor: cfg.quantization_factor,
        decimals: cfg.decimals,
        keypoint_count,
        config_version: cfg.version,
    }
}

/// Compute the fingerprint of one image from its keypoints.
///
/// Fewer than [`MIN_KEYPOINTS`] keypoints yield an empty fingerprint, which
/// is a valid "cannot characterize" result rather than an error. Errors are
/// reserved for invalid configuration.
pub fn fingerprint_keypoints(
    keypoints: &[Keypoint],
    cfg: &FingerprintConfig,
) -> Result<Fingerprint, FingerprintError> {
    cfg.validate()?;

    let meta = meta_for(cfg, keypoints.len());
    if keypoints.len() < MIN_KEYPOINTS {
        return Ok(Fingerprint::empty(meta));
    }

    let neighbors = select_neighbors(keypoints, cfg.k);
    let capacity = neighbors.iter().map(Vec::len).sum();

    // One token per directed relation, in keypoint order then neighbor rank.
    let mut tokens = Vec::with_capacity(capacity);
    for relations in &neighbors {
        for rel in relations {
            tokens.push(hash_pair(
                &keypoints[rel.keypoint_index],
                &keypoints[rel.neighbor_index],
                cfg,
            ));
        }
    }

    Ok(Fingerprint { tokens, meta })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(offset: (f64, f64)) -> Vec<Keypoint> {
        let mut out = Vec::new();
        for row in 0..4 {
            for col in 0..5 {
                let i = row * 5 + col;
                out.push(Keypoint::new(
                    offset.0 + col as f64 * 13.0 + (i % 3) as f64,
                    offset.1 + row as f64 * 17.0 + (i % 2) as f64,
                    2.0 + (i % 4) as f64,
                    (i * 37 % 360) as f64,
                ));
            }
        }
        out
    }

    fn scattered(n: usize) -> Vec<Keypoint> {
        let mut state: u64 = 0x2545_F491_4F6C_DD1D;
        let mut next = move || {
            state = state
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            (state >> 11) as f64 / (1u64 << 53) as f64
        };
        (0..n)
            .map(|_| {
                Keypoint::new(
                    next() * 640.0,
                    next() * 480.0,
                    1.0 + next() * 12.0,
                    next() * 360.0,
                )
            })
            .collect()
    }

    fn overlap(a: &Fingerprint, b: &Fingerprint) -> usize {
        let b_set = b.distinct();
        a.distinct().intersection(&b_set).count()
    }

    #[test]
    fn concrete_two_keypoint_scenario() {
        let keypoints = vec![
            Keypoint::new(0.0, 0.0, 5.0, 0.0),
            Keypoint::new(0.0, 10.0, 5.0, 0.0),
        ];
        let cfg = FingerprintConfig::new().with_k(1);
        let fp = fingerprint_keypoints(&keypoints, &cfg).unwrap();

        let tokens: Vec<&str> = fp.tokens.iter().map(HashToken::as_str).collect();
        assert_eq!(tokens, vec!["0|0|0|5|5", "0|0|180|5|5"]);

        let same = fingerprint_keypoints(&keypoints, &cfg).unwrap();
        assert_eq!(overlap(&fp, &same), fp.distinct_len());
    }

    #[test]
    fn single_keypoint_gives_empty_fingerprint() {
        let fp = fingerprint_keypoints(
            &[Keypoint::new(1.0, 1.0, 1.0, 1.0)],
            &FingerprintConfig::default(),
        )
        .unwrap();
        assert!(fp.is_empty());
        assert_eq!(fp.meta.keypoint_count, 1);
    }

    #[test]
    fn no_keypoints_gives_empty_fingerprint() {
        let fp = fingerprint_keypoints(&[], &FingerprintConfig::default()).unwrap();
        assert!(fp.is_empty());
    }

    #[test]
    fn token_count_is_k_times_n_when_enough_keypoints() {
        let keypoints = grid((0.0, 0.0));
        let cfg = FingerprintConfig::default();
        let fp = fingerprint_keypoints(&keypoints, &cfg).unwrap();
        assert_eq!(fp.len(), keypoints.len() * cfg.k);
    }

    #[test]
    fn token_count_is_bounded_by_available_neighbors() {
        let keypoints = grid((0.0, 0.0))[..3].to_vec();
        let fp = fingerprint_keypoints(&keypoints, &FingerprintConfig::default()).unwrap();
        assert_eq!(fp.len(), 3 * 2);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let cfg = FingerprintConfig::new().with_k(0);
        assert!(matches!(
            fingerprint_keypoints(&grid((0.0, 0.0)), &cfg),
            Err(FingerprintError::InvalidConfigK { k: 0 })
        ));
    }

    #[test]
    fn fingerprint_is_deterministic() {
        let keypoints = grid((3.0, 5.0));
        let cfg = FingerprintConfig::default();
        let a = fingerprint_keypoints(&keypoints, &cfg).unwrap();
        let b = fingerprint_keypoints(&keypoints, &cfg).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn translation_preserves_tokens() {
        let cfg = FingerprintConfig::default();
        let a = fingerprint_keypoints(&grid((0.0, 0.0)), &cfg).unwrap();
        let b = fingerprint_keypoints(&grid((250.0, 90.0)), &cfg).unwrap();
        assert_eq!(a.distinct(), b.distinct());
    }

    #[test]
    fn input_order_does_not_change_token_set() {
        let cfg = FingerprintConfig::default();
        let keypoints = scattered(60);
        let mut reversed = keypoints.clone();
        reversed.reverse();

        let a = fingerprint_keypoints(&keypoints, &cfg).unwrap();
        let b = fingerprint_keypoints(&reversed, &cfg).unwrap();
        assert_eq!(a.distinct(), b.distinct());
    }

    #[test]
    fn coarser_nested_bins_only_merge_tokens() {
        // Tripling the divisor nests every fine bin inside one coarse bin, so
        // pairs that share a token at the fine level share it when coarser.
        let fine = FingerprintConfig::default();
        let coarse = FingerprintConfig::new().with_quantization_factor(3.0);

        let a = Keypoint::new(0.0, 0.0, 4.0, 40.2);
        let b = Keypoint::new(3.0, 9.0, 6.0, 121.0);
        let c = Keypoint::new(50.0, 50.0, 4.0, 39.8);
        let d = Keypoint::new(53.0, 59.0, 6.0, 120.9);

        assert_eq!(hash_pair(&a, &b, &fine), hash_pair(&c, &d, &fine));
        assert_eq!(hash_pair(&a, &b, &coarse), hash_pair(&c, &d, &coarse));
    }

    #[test]
    fn coarser_quantization_recovers_jittered_overlap() {
        let fine = FingerprintConfig::default();
        let coarse = FingerprintConfig::new().with_quantization_factor(9.0);

        let original = grid((0.0, 0.0));
        let jittered: Vec<Keypoint> = original
            .iter()
            .enumerate()
            .map(|(i, kp)| Keypoint {
                orientation: kp.orientation + if i % 2 == 0 { 1.2 } else { -1.3 },
                ..*kp
            })
            .collect();

        let fine_overlap = overlap(
            &fingerprint_keypoints(&original, &fine).unwrap(),
            &fingerprint_keypoints(&jittered, &fine).unwrap(),
        );
        let coarse_overlap = overlap(
            &fingerprint_keypoints(&original, &coarse).unwrap(),
            &fingerprint_keypoints(&jittered, &coarse).unwrap(),
        );
        assert!(coarse_overlap >= fine_overlap);
        assert!(coarse_overlap > 0);
    }
}
