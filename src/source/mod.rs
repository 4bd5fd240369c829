//! Asset source boundary.
//!
//! The engine never talks to a photo library directly. Everything it needs
//! from the outside world goes through the [`AssetSource`] trait:
//!
//! - enumerating assets (optionally filtered to those changed since a watermark)
//! - rendering a small fixed-size thumbnail for fingerprinting
//! - reporting the on-disk size of an asset's primary resource
//!
//! # Implementations
//!
//! - [`fs`]: walks a directory tree and treats image/video files as assets
//! - [`memory`]: in-memory source with injectable failures, for tests and embedders

pub mod capture;
pub mod fs;
pub mod memory;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use fs::FsAssetSource;
pub use memory::MemoryAssetSource;

/// Kind of media an asset holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Still image (photo, screenshot)
    Image,
    /// Video clip
    Video,
    /// Anything else the library carries (audio, unknown)
    Other,
}

impl MediaKind {
    /// Whether this kind takes part in fingerprinting and duplicate detection.
    #[must_use]
    pub fn is_image(self) -> bool {
        self == Self::Image
    }
}

/// A single item in the asset library.
///
/// Identifiers are stable for the lifetime of the asset and unique within
/// a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// Stable identifier
    pub id: String,
    /// When the asset was captured or created
    pub creation_time: DateTime<Utc>,
    /// When the asset was last modified
    pub modification_time: DateTime<Utc>,
    /// Media kind
    pub media_kind: MediaKind,
    /// Whether the source flags this asset as a screenshot
    pub is_screenshot: bool,
}

impl Asset {
    /// Create an image asset whose modification time equals its creation time.
    #[must_use]
    pub fn image(id: impl Into<String>, creation_time: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            creation_time,
            modification_time: creation_time,
            media_kind: MediaKind::Image,
            is_screenshot: false,
        }
    }

    /// Create a video asset whose modification time equals its creation time.
    #[must_use]
    pub fn video(id: impl Into<String>, creation_time: DateTime<Utc>) -> Self {
        Self {
            media_kind: MediaKind::Video,
            ..Self::image(id, creation_time)
        }
    }

    /// Mark the asset as a screenshot.
    #[must_use]
    pub fn as_screenshot(mut self) -> Self {
        self.is_screenshot = true;
        self
    }

    /// Set the modification time.
    #[must_use]
    pub fn modified_at(mut self, modification_time: DateTime<Utc>) -> Self {
        self.modification_time = modification_time;
        self
    }

    /// Whether this asset was created or modified strictly after `watermark`.
    #[must_use]
    pub fn changed_since(&self, watermark: DateTime<Utc>) -> bool {
        self.creation_time > watermark || self.modification_time > watermark
    }
}

/// Filter applied during enumeration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssetFilter {
    /// Only assets created or modified strictly after this time.
    pub changed_since: Option<DateTime<Utc>>,
    /// Only assets of this media kind.
    pub media_kind: Option<MediaKind>,
}

impl AssetFilter {
    /// Filter to assets changed after `watermark`.
    #[must_use]
    pub fn changed_since(watermark: DateTime<Utc>) -> Self {
        Self {
            changed_since: Some(watermark),
            media_kind: None,
        }
    }

    /// Restrict the filter to one media kind.
    #[must_use]
    pub fn with_media_kind(mut self, kind: MediaKind) -> Self {
        self.media_kind = Some(kind);
        self
    }

    /// Check whether an asset passes this filter.
    #[must_use]
    pub fn matches(&self, asset: &Asset) -> bool {
        if let Some(watermark) = self.changed_since {
            if !asset.changed_since(watermark) {
                return false;
            }
        }
        self.media_kind.is_none_or(|kind| asset.media_kind == kind)
    }
}

/// A rendered thumbnail as tightly packed RGBA8 rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// RGBA8 pixel data, `width * height * 4` bytes
    pub rgba: Vec<u8>,
}

impl PixelBuffer {
    /// Create a buffer filled with a single RGBA colour.
    #[must_use]
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = (width as usize) * (height as usize);
        Self {
            width,
            height,
            rgba: rgba.iter().copied().cycle().take(pixels * 4).collect(),
        }
    }
}

/// Errors reported by an [`AssetSource`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// The source cannot be read at all (permission revoked, library missing).
    #[error("Asset source unavailable: {0}")]
    Unavailable(String),

    /// The asset no longer exists in the source.
    #[error("Asset not found: {0}")]
    NotFound(String),

    /// The asset exists but could not be rendered.
    #[error("Failed to render {id}: {reason}")]
    Render {
        /// Asset identifier
        id: String,
        /// Human-readable reason
        reason: String,
    },
}

impl SourceError {
    /// Whether this error must abort the whole sync pass.
    ///
    /// Only [`SourceError::Unavailable`] is fatal; per-asset failures are
    /// recovered locally.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Access to an asset library.
///
/// Implementations must be shareable across the fingerprint worker threads.
pub trait AssetSource: Send + Sync {
    /// Enumerate assets ordered by creation time, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Unavailable`] if the library cannot be read.
    fn enumerate(&self, filter: Option<&AssetFilter>) -> Result<Vec<Asset>, SourceError>;

    /// Render a `target_size` x `target_size` thumbnail of the asset.
    ///
    /// Must be idempotent for a given id and size.
    fn render_thumbnail(&self, id: &str, target_size: u32) -> Result<PixelBuffer, SourceError>;

    /// Size in bytes of the asset's primary resource.
    fn resource_size(&self, id: &str) -> Result<u64, SourceError>;
}

/// Sort assets newest first, breaking ties by id so ordering is total.
pub(crate) fn sort_newest_first(assets: &mut [Asset]) {
    assets.sort_by(|a, b| {
        b.creation_time
            .cmp(&a.creation_time)
            .then_with(|| a.id.cmp(&b.id))
    });
}
