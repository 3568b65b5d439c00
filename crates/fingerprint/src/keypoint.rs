//! Keypoint records consumed from an external feature detector.

use serde::{Deserialize, Serialize};

/// A detected, localized visual feature.
///
/// Follows the usual detector conventions: `position` is `(x, y)` in pixel
/// coordinates with `+y` pointing down the image, `orientation` is in
/// degrees, and `scale` is the diameter of the meaningful neighborhood.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Keypoint {
    pub position: (f64, f64),
    pub scale: f64,
    /// Orientation angle in degrees.
    pub orientation: f64,
    /// Detector response strength.
    pub strength: f64,
}

impl Keypoint {
    pub fn new(x: f64, y: f64, scale: f64, orientation: f64) -> Self {
        Self {
            position: (x, y),
            scale,
            orientation,
            strength: 0.0,
        }
    }

    pub fn with_strength(mut self, strength: f64) -> Self {
        self.strength = strength;
        self
    }

    /// Euclidean distance between the two positions.
    #[inline]
    pub fn distance_to(&self, other: &Keypoint) -> f64 {
        let dx = other.position.0 - self.position.0;
        let dy = other.position.1 - self.position.1;
        dx.hypot(dy)
    }
}
