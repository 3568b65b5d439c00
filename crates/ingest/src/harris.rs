//! Built-in Harris corner detector.
//!
//! Detection is normally supplied by an external feature library through
//! [`KeypointProvider`]. [`HarrisProvider`] is a small self-contained
//! detector so a corpus can be indexed straight from image files. Each
//! corner becomes a keypoint whose scale is the window size and whose
//! orientation is the direction of the summed intensity gradient around it.

use image::{imageops, GrayImage};
use serde::{Deserialize, Serialize};

use crate::error::{DetectError, IngestError};
use crate::source::KeypointProvider;
use fingerprint::Keypoint;

const HARRIS_K: f32 = 0.04;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarrisConfig {
    /// Gaussian blur applied before differentiation, 0 disables it.
    pub sigma: f32,
    /// Odd side length of the structure-tensor and suppression window.
    pub window: u32,
    /// Strongest corners kept per image.
    pub max_corners: usize,
    /// Minimum corner response.
    pub threshold: f32,
}

impl Default for HarrisConfig {
    fn default() -> Self {
        Self {
            sigma: 1.0,
            window: 5,
            max_corners: 1000,
            threshold: 1_000_000.0,
        }
    }
}

impl HarrisConfig {
    pub fn validate(&self) -> Result<(), IngestError> {
        if !self.sigma.is_finite() || self.sigma < 0.0 {
            return Err(IngestError::InvalidConfig(format!(
                "harris sigma must be finite and >= 0, got {}",
                self.sigma
            )));
        }
        if self.window < 3 || self.window % 2 == 0 {
            return Err(IngestError::InvalidConfig(format!(
                "harris window must be odd and >= 3, got {}",
                self.window
            )));
        }
        if self.max_corners == 0 {
            return Err(IngestError::InvalidConfig(
                "harris max_corners must be >= 1".to_string(),
            ));
        }
        if !self.threshold.is_finite() {
            return Err(IngestError::InvalidConfig(
                "harris threshold must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

/// [`KeypointProvider`] backed by a Harris corner detector.
#[derive(Debug, Clone)]
pub struct HarrisProvider {
    cfg: HarrisConfig,
}

impl HarrisProvider {
    pub fn new(cfg: HarrisConfig) -> Result<Self, IngestError> {
        cfg.validate()?;
        Ok(Self { cfg })
    }

    pub fn config(&self) -> &HarrisConfig {
        &self.cfg
    }
}

impl Default for HarrisProvider {
    fn default() -> Self {
        Self {
            cfg: HarrisConfig::default(),
        }
    }
}

impl KeypointProvider for HarrisProvider {
    fn detect(&self, image: &GrayImage) -> Result<Vec<Keypoint>, DetectError> {
        Ok(detect_corners(image, &self.cfg))
    }
}

fn harris_score(xx: f32, xy: f32, yy: f32) -> f32 {
    let det = xx * yy - xy * xy;
    let trace = xx + yy;
    det - HARRIS_K * trace * trace
}

fn detect_corners(image: &GrayImage, cfg: &HarrisConfig) -> Vec<Keypoint> {
    let win = cfg.window as usize;
    let r = win / 2;
    let (w, h) = (image.width() as usize, image.height() as usize);
    if w < win + 2 || h < win + 2 {
        return Vec::new();
    }

    let blurred;
    let src = if cfg.sigma > 0.0 {
        blurred = imageops::blur(image, cfg.sigma);
        &blurred
    } else {
        image
    };
    let raw = src.as_raw();
    let px = |x: usize, y: usize| raw[y * w + x] as f32;

    // Sobel gradients on interior pixels.
    let mut gx = vec![0f32; w * h];
    let mut gy = vec![0f32; w * h];
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            gx[y * w + x] = (px(x + 1, y - 1) + 2.0 * px(x + 1, y) + px(x + 1, y + 1))
                - (px(x - 1, y - 1) + 2.0 * px(x - 1, y) + px(x - 1, y + 1));
            gy[y * w + x] = (px(x - 1, y + 1) + 2.0 * px(x, y + 1) + px(x + 1, y + 1))
                - (px(x - 1, y - 1) + 2.0 * px(x, y - 1) + px(x + 1, y - 1));
        }
    }

    // Window must stay inside the gradient region [1, w - 2].
    let (x0, x1) = (1 + r, w - 1 - r);
    let (y0, y1) = (1 + r, h - 1 - r);
    let area = (win * win) as f32;
    let mut response = vec![f32::NEG_INFINITY; w * h];
    for cy in y0..y1 {
        for cx in x0..x1 {
            let (mut sxx, mut sxy, mut syy) = (0f32, 0f32, 0f32);
            for y in cy - r..=cy + r {
                for x in cx - r..=cx + r {
                    let (dx, dy) = (gx[y * w + x], gy[y * w + x]);
                    sxx += dx * dx;
                    sxy += dx * dy;
                    syy += dy * dy;
                }
            }
            response[cy * w + cx] = harris_score(sxx / area, sxy / area, syy / area);
        }
    }

    // Non-maximum suppression; equal responses resolve to the lower index.
    let mut corners: Vec<(f32, usize)> = Vec::new();
    for cy in y0..y1 {
        for cx in x0..x1 {
            let c = cy * w + cx;
            let score = response[c];
            if score <= cfg.threshold {
                continue;
            }
            let mut is_max = true;
            'window: for y in cy.saturating_sub(r)..=(cy + r).min(h - 1) {
                for x in cx.saturating_sub(r)..=(cx + r).min(w - 1) {
                    let i = y * w + x;
                    if i != c && (response[i] > score || (response[i] == score && i < c)) {
                        is_max = false;
                        break 'window;
                    }
                }
            }
            if is_max {
                corners.push((score, c));
            }
        }
    }

    corners.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
    corners.truncate(cfg.max_corners);

    corners
        .into_iter()
        .map(|(score, c)| {
            let (cx, cy) = (c % w, c / w);
            let (mut sx, mut sy) = (0f32, 0f32);
            for y in cy - r..=cy + r {
                for x in cx - r..=cx + r {
                    sx += gx[y * w + x];
                    sy += gy[y * w + x];
                }
            }
            let mut orientation = (sy as f64).atan2(sx as f64).to_degrees();
            if orientation < 0.0 {
                orientation += 360.0;
            }
            Keypoint::new(cx as f64, cy as f64, win as f64, orientation).with_strength(score as f64)
        })
        .collect()
}
