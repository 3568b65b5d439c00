//! Image identifiers and inventory entries.
//!
//! Corpus images follow a fixed naming scheme:
//!
//! ```text
//! frame<N>-full.<ext>   full source frame N
//! frame<N>-<H>.<ext>    hint crop H taken from frame N
//! ```
//!
//! Anything else is still a valid identifier but classifies as
//! [`ImageKind::Other`].

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Stable, application-defined image identifier (the file name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageId(String);

/// What an [`ImageId`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImageKind {
    Full { frame: u32 },
    Hint { frame: u32, hint: u32 },
    Other,
}

impl ImageKind {
    pub fn frame(&self) -> Option<u32> {
        match self {
            ImageKind::Full { frame } | ImageKind::Hint { frame, .. } => Some(*frame),
            ImageKind::Other => None,
        }
    }

    /// Sort key: frame number, then full frame before hints in hint order.
    /// Unclassified ids sort last.
    pub(crate) fn sort_key(&self) -> (u32, u32) {
        match self {
            ImageKind::Full { frame } => (*frame, 0),
            ImageKind::Hint { frame, hint } => (*frame, hint.saturating_add(1)),
            ImageKind::Other => (u32::MAX, u32::MAX),
        }
    }
}

impl ImageId {
    pub fn new<S: Into<String>>(id: S) -> Self {
        ImageId(id.into())
    }

    /// Identifier of the full frame `frame` with the given extension.
    pub fn full(frame: u32, ext: &str) -> Self {
        ImageId(format!("frame{frame}-full.{ext}"))
    }

    /// Identifier of hint `hint` of frame `frame` with the given extension.
    pub fn hint(frame: u32, hint: u32, ext: &str) -> Self {
        ImageId(format!("frame{frame}-{hint}.{ext}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Classify the identifier according to the corpus naming scheme.
    pub fn kind(&self) -> ImageKind {
        parse_kind(&self.0).unwrap_or(ImageKind::Other)
    }
}

fn parse_kind(name: &str) -> Option<ImageKind> {
    let (stem, ext) = name.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    let rest = stem.strip_prefix("frame")?;
    let (frame, suffix) = rest.split_once('-')?;
    if frame.is_empty() || !frame.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let frame: u32 = frame.parse().ok()?;

    if suffix == "full" {
        return Some(ImageKind::Full { frame });
    }
    if !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit()) {
        let hint: u32 = suffix.parse().ok()?;
        return Some(ImageKind::Hint { frame, hint });
    }
    None
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ImageId {
    fn from(value: &str) -> Self {
        ImageId(value.to_string())
    }
}

impl From<String> for ImageId {
    fn from(value: String) -> Self {
        ImageId(value)
    }
}

impl AsRef<str> for ImageId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// One image of the corpus on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryEntry {
    pub id: ImageId,
    pub path: PathBuf,
}

impl InventoryEntry {
    pub fn new(id: ImageId, path: PathBuf) -> Self {
        Self { id, path }
    }

    pub fn kind(&self) -> ImageKind {
        self.id.kind()
    }
}
