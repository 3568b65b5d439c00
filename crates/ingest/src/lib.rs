//! framefp Ingest Layer
//!
//! This is where corpus images enter the pipeline. We list the images of a
//! corpus directory, name them, and obtain their keypoints, either by
//! decoding the image and running an external detector or by reading
//! detections stored next to the image.
//!
//! ## What we do here
//!
//! - **Name images** - [`ImageId`] is the file name; [`ImageKind`] tells a
//!   full frame (`frame<N>-full.<ext>`) from a hint crop (`frame<N>-<H>.<ext>`).
//! - **Build the inventory** - [`Inventory::scan_dir`] lists a directory in the
//!   deterministic corpus order: frame number, full frame, then hints.
//! - **Obtain keypoints** - through a [`KeypointSource`]. Decoding goes through
//!   the `image` crate and a pluggable [`KeypointProvider`]; [`HarrisProvider`]
//!   is the built-in corner detector.
//! - **Log everything** - structured events via tracing.
//!
//! ## Main entry point
//!
//! Call [`load_keypoints`] with a source and an [`InventoryEntry`]. Errors are
//! typed so the caller can record why an image degraded.
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//! use fingerprint::Keypoint;
//! use image::GrayImage;
//! use ingest::{load_keypoints, DecodingSource, DetectError, IngestConfig, Inventory};
//!
//! let cfg = IngestConfig::default();
//! let inventory = Inventory::scan_dir(Path::new("images"), &cfg).unwrap();
//!
//! let detector = |_img: &GrayImage| -> Result<Vec<Keypoint>, DetectError> {
//!     Ok(vec![Keypoint::new(0.0, 0.0, 2.0, 0.0)])
//! };
//! let source = DecodingSource::new(detector, cfg);
//!
//! for entry in inventory.full_frames() {
//!     let keypoints = load_keypoints(&source, entry).unwrap();
//!     println!("{}: {} keypoints", entry.id, keypoints.len());
//! }
//! ```

use std::time::Instant;

use fingerprint::Keypoint;
use tracing::{debug, warn, Level};

mod config;
mod error;
mod harris;
mod inventory;
mod source;
mod types;

pub use crate::config::IngestConfig;
pub use crate::error::{DetectError, IngestError};
pub use crate::harris::{HarrisConfig, HarrisProvider};
pub use crate::inventory::Inventory;
pub use crate::source::{
    decode_luma, write_sidecar, DecodingSource, KeypointProvider, KeypointSidecar,
    KeypointSource, SidecarSource, SIDECAR_VERSION,
};
pub use crate::types::{ImageId, ImageKind, InventoryEntry};

/// Obtain the keypoints of one inventory entry from `source`, with a span
/// and a success or failure event.
pub fn load_keypoints<S>(source: &S, entry: &InventoryEntry) -> Result<Vec<Keypoint>, IngestError>
where
    S: KeypointSource + ?Sized,
{
    traced(entry, || source.keypoints(entry))
}

/// Like [`load_keypoints`], but from content bytes the caller already read
/// from [`KeypointSource::content_path`].
pub fn load_keypoints_from_content<S>(
    source: &S,
    entry: &InventoryEntry,
    content: &[u8],
) -> Result<Vec<Keypoint>, IngestError>
where
    S: KeypointSource + ?Sized,
{
    traced(entry, || source.keypoints_from_content(entry, content))
}

fn traced<F>(entry: &InventoryEntry, load: F) -> Result<Vec<Keypoint>, IngestError>
where
    F: FnOnce() -> Result<Vec<Keypoint>, IngestError>,
{
    let start = Instant::now();
    let span = tracing::span!(Level::DEBUG, "ingest.load_keypoints", image_id = %entry.id);
    let _guard = span.enter();

    match load() {
        Ok(keypoints) => {
            debug!(
                keypoints = keypoints.len(),
                elapsed_micros = start.elapsed().as_micros(),
                "keypoints_loaded"
            );
            Ok(keypoints)
        }
        Err(err) => {
            warn!(
                error = %err,
                elapsed_micros = start.elapsed().as_micros(),
                "keypoints_failed"
            );
            Err(err)
        }
    }
}
