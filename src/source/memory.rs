//! In-memory asset source.
//!
//! Holds assets, their sizes and their thumbnails in maps. Failures can be
//! injected per asset or for the whole source, which makes it the workhorse
//! for exercising the sync pass without a real library.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

use super::{sort_newest_first, Asset, AssetFilter, AssetSource, PixelBuffer, SourceError};

#[derive(Debug, Default)]
struct Library {
    assets: Vec<Asset>,
    sizes: HashMap<String, u64>,
    thumbnails: HashMap<String, PixelBuffer>,
    render_failures: HashSet<String>,
}

/// An [`AssetSource`] backed by plain maps.
///
/// Assets without an explicit thumbnail render as a solid colour derived
/// from their id, so distinct ids fingerprint differently unless a
/// thumbnail is shared on purpose.
#[derive(Debug, Default)]
pub struct MemoryAssetSource {
    library: RwLock<Library>,
    unavailable: AtomicBool,
    renders: AtomicUsize,
}

impl MemoryAssetSource {
    /// Create an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an asset with the given resource size.
    pub fn insert(&self, asset: Asset, size: u64) {
        let mut library = self.write();
        library.sizes.insert(asset.id.clone(), size);
        library.assets.retain(|a| a.id != asset.id);
        library.assets.push(asset);
    }

    /// Set the thumbnail an asset renders to.
    pub fn set_thumbnail(&self, id: &str, pixels: PixelBuffer) {
        self.write().thumbnails.insert(id.to_string(), pixels);
    }

    /// Make rendering fail for one asset.
    pub fn fail_render(&self, id: &str) {
        self.write().render_failures.insert(id.to_string());
    }

    /// Remove an asset from the library.
    pub fn remove(&self, id: &str) {
        let mut library = self.write();
        library.assets.retain(|a| a.id != id);
        library.sizes.remove(id);
        library.thumbnails.remove(id);
    }

    /// Simulate the whole library becoming unreadable (or readable again).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of thumbnail renders served so far.
    #[must_use]
    pub fn render_count(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), SourceError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(SourceError::Unavailable("library access revoked".into()));
        }
        Ok(())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Library> {
        self.library.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Library> {
        self.library.write().unwrap_or_else(|e| e.into_inner())
    }
}

/// Derive a stable colour from an id.
fn colour_for(id: &str) -> [u8; 4] {
    let digest = blake3::hash(id.as_bytes());
    let bytes = digest.as_bytes();
    [bytes[0], bytes[1], bytes[2], 255]
}

impl AssetSource for MemoryAssetSource {
    fn enumerate(&self, filter: Option<&AssetFilter>) -> Result<Vec<Asset>, SourceError> {
        self.check_available()?;
        let mut assets: Vec<Asset> = self
            .read()
            .assets
            .iter()
            .filter(|a| filter.is_none_or(|f| f.matches(a)))
            .cloned()
            .collect();
        sort_newest_first(&mut assets);
        Ok(assets)
    }

    fn render_thumbnail(&self, id: &str, target_size: u32) -> Result<PixelBuffer, SourceError> {
        self.check_available()?;
        self.renders.fetch_add(1, Ordering::SeqCst);

        let library = self.read();
        if library.render_failures.contains(id) {
            return Err(SourceError::Render {
                id: id.to_string(),
                reason: "injected failure".into(),
            });
        }
        if !library.assets.iter().any(|a| a.id == id) {
            return Err(SourceError::NotFound(id.to_string()));
        }
        Ok(library
            .thumbnails
            .get(id)
            .cloned()
            .unwrap_or_else(|| PixelBuffer::solid(target_size, target_size, colour_for(id))))
    }

    fn resource_size(&self, id: &str) -> Result<u64, SourceError> {
        self.check_available()?;
        self.read()
            .sizes
            .get(id)
            .copied()
            .ok_or_else(|| SourceError::NotFound(id.to_string()))
    }
}
