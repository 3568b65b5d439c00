//! Pair hashing: quantized geometry of one directed keypoint relation.
//!
//! A token has five `|`-separated fields in a fixed order:
//!
//! ```text
//! a1 | a2 | a12 | s1 | s2
//! ```
//!
//! `a1`/`a2` are the orientations of the source and neighbor keypoints,
//! `a12` is the reference-direction angle from source to neighbor, and
//! `s1`/`s2` are their scales. The three angles are divided by the
//! quantization factor; every field is then rendered with a fixed number of
//! decimals. Rust's float formatting is locale independent and rounds the
//! exact binary value, so the same input always renders the same token.

use std::fmt::Write as _;

use crate::config::FingerprintConfig;
use crate::fingerprint::HashToken;
use crate::keypoint::Keypoint;

/// Fixed reference direction ("up" in image coordinates).
const REFERENCE_DIRECTION: (f64, f64) = (0.0, 1.0);

/// Field separator inside a token.
pub const TOKEN_SEPARATOR: char = '|';

/// Tolerances used to treat two positions as coincident.
const COINCIDENT_RTOL: f64 = 1e-5;
const COINCIDENT_ATOL: f64 = 1e-8;

#[inline]
fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= COINCIDENT_ATOL + COINCIDENT_RTOL * b.abs()
}

/// Angle in degrees between `to - from` and the fixed reference direction.
///
/// Computed through the arccosine of the normalized dot product, so the
/// result lies in `[0, 180]` and is unsigned: a vector and its mirror image
/// across the reference axis give the same angle. Coincident positions give
/// `0`.
pub fn reference_angle_degrees(from: (f64, f64), to: (f64, f64)) -> f64 {
    if close(from.0, to.0) && close(from.1, to.1) {
        return 0.0;
    }
    let dx = to.0 - from.0;
    let dy = to.1 - from.1;
    let norm = dx.hypot(dy);
    let dot = (REFERENCE_DIRECTION.0 * dx + REFERENCE_DIRECTION.1 * dy) / norm;
    dot.clamp(-1.0, 1.0).acos().to_degrees()
}

/// Hash the directed relation `a -> b` into one token.
///
/// The relation is not symmetric: `hash_pair(a, b)` and `hash_pair(b, a)`
/// swap the orientation and scale fields while `a12` is always measured from
/// `a` towards `b`.
pub fn hash_pair(a: &Keypoint, b: &Keypoint, cfg: &FingerprintConfig) -> HashToken {
    let q = cfg.quantization_factor;
    let a1 = a.orientation / q;
    let a2 = b.orientation / q;
    let a12 = reference_angle_degrees(a.position, b.position) / q;

    let mut token = String::with_capacity(24);
    for (i, value) in [a1, a2, a12, a.scale, b.scale].into_iter().enumerate() {
        if i > 0 {
            token.push(TOKEN_SEPARATOR);
        }
        // Writing into a String cannot fail.
        let _ = write!(token, "{:.*}", cfg.decimals, value);
    }
    HashToken::from(token)
}
