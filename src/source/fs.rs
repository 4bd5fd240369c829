//! Directory-backed asset source.
//!
//! Treats every regular file below a root directory as an asset. Identifiers
//! are `/`-separated paths relative to the root, so they stay stable across
//! runs and platforms.
//!
//! An image's creation time is its EXIF capture date when it has one.
//! Otherwise it is the earlier of the file's birth and modification times,
//! since copying a file resets its birth time but usually keeps its mtime.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use walkdir::WalkDir;

use super::capture::capture_time;
use super::{sort_newest_first, Asset, AssetFilter, AssetSource, MediaKind, PixelBuffer, SourceError};

const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "tif", "tiff", "webp", "heic", "heif",
];
const VIDEO_EXTENSIONS: &[&str] = &["mov", "mp4", "m4v", "avi", "mkv", "webm", "3gp"];
const SCREENSHOT_MARKERS: &[&str] = &["screenshot", "screen shot", "screen_shot"];

/// Classify a path by its extension.
#[must_use]
pub fn media_kind_for(path: &Path) -> MediaKind {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some(e) if IMAGE_EXTENSIONS.contains(&e) => MediaKind::Image,
        Some(e) if VIDEO_EXTENSIONS.contains(&e) => MediaKind::Video,
        _ => MediaKind::Other,
    }
}

/// Whether the file name carries a screenshot marker.
#[must_use]
pub fn looks_like_screenshot(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_lowercase)
        .is_some_and(|name| SCREENSHOT_MARKERS.iter().any(|m| name.contains(m)))
}

/// An [`AssetSource`] that walks a directory tree.
#[derive(Debug, Clone)]
pub struct FsAssetSource {
    root: PathBuf,
    skip_hidden: bool,
}

impl FsAssetSource {
    /// Create a source rooted at `root`. Hidden files are skipped.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            skip_hidden: true,
        }
    }

    /// Include or skip files and directories whose names start with `.`.
    #[must_use]
    pub fn with_skip_hidden(mut self, skip_hidden: bool) -> Self {
        self.skip_hidden = skip_hidden;
        self
    }

    /// Root directory of this source.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn id_for(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<&str> = relative
            .components()
            .map(|c| c.as_os_str().to_str())
            .collect::<Option<_>>()?;
        Some(parts.join("/"))
    }

    fn path_for(&self, id: &str) -> PathBuf {
        id.split('/').fold(self.root.clone(), |p, part| p.join(part))
    }

    fn check_root(&self) -> Result<(), SourceError> {
        if !self.root.is_dir() {
            return Err(SourceError::Unavailable(format!(
                "{} is not a readable directory",
                self.root.display()
            )));
        }
        Ok(())
    }

    fn is_hidden(entry: &walkdir::DirEntry) -> bool {
        entry.depth() > 0
            && entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with('.'))
    }
}

fn to_utc(time: SystemTime) -> DateTime<Utc> {
    DateTime::<Utc>::from(time)
}

impl AssetSource for FsAssetSource {
    fn enumerate(&self, filter: Option<&AssetFilter>) -> Result<Vec<Asset>, SourceError> {
        self.check_root()?;

        let skip_hidden = self.skip_hidden;
        let mut assets = Vec::new();
        let walker = WalkDir::new(&self.root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| !(skip_hidden && Self::is_hidden(e)));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => {
                    return Err(SourceError::Unavailable(e.to_string()));
                }
                Err(e) => {
                    log::warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(e) => {
                    log::warn!("Failed to stat {}: {}", entry.path().display(), e);
                    continue;
                }
            };
            let Some(id) = self.id_for(entry.path()) else {
                log::debug!("Skipping non UTF-8 path: {}", entry.path().display());
                continue;
            };

            let modified = metadata.modified().map(to_utc).unwrap_or_default();
            let born = metadata
                .created()
                .map_or(modified, |t| to_utc(t).min(modified));
            let media_kind = media_kind_for(entry.path());
            let created = match media_kind {
                MediaKind::Image => capture_time(entry.path()).unwrap_or(born),
                _ => born,
            };

            let asset = Asset {
                id,
                creation_time: created,
                modification_time: modified,
                media_kind,
                is_screenshot: looks_like_screenshot(entry.path()),
            };
            if filter.is_none_or(|f| f.matches(&asset)) {
                assets.push(asset);
            }
        }

        sort_newest_first(&mut assets);
        log::debug!(
            "Enumerated {} assets under {}",
            assets.len(),
            self.root.display()
        );
        Ok(assets)
    }

    fn render_thumbnail(&self, id: &str, target_size: u32) -> Result<PixelBuffer, SourceError> {
        self.check_root()?;
        let path = self.path_for(id);
        if !path.is_file() {
            return Err(SourceError::NotFound(id.to_string()));
        }
        if media_kind_for(&path) != MediaKind::Image {
            return Err(SourceError::Render {
                id: id.to_string(),
                reason: "not an image".into(),
            });
        }

        let img = image::open(&path).map_err(|e| SourceError::Render {
            id: id.to_string(),
            reason: e.to_string(),
        })?;
        let thumb = img.thumbnail_exact(target_size, target_size).to_rgba8();
        let (width, height) = thumb.dimensions();
        Ok(PixelBuffer {
            width,
            height,
            rgba: thumb.into_raw(),
        })
    }

    fn resource_size(&self, id: &str) -> Result<u64, SourceError> {
        let path = self.path_for(id);
        std::fs::metadata(&path)
            .map(|m| m.len())
            .map_err(|e| stat_error(id, &e))
    }
}

/// Map a failed stat of one asset to a per-asset error.
///
/// Only the root being unreadable makes the whole source unavailable.
fn stat_error(id: &str, err: &std::io::Error) -> SourceError {
    match err.kind() {
        std::io::ErrorKind::NotFound => SourceError::NotFound(id.to_string()),
        _ => SourceError::Render {
            id: id.to_string(),
            reason: err.to_string(),
        },
    }
}
