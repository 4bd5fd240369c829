//! Persistent caches for asset metadata and fingerprints.
//!
//! This module provides the only persisted state of the engine:
//!
//! * [`MetadataCache`]: asset id → size on disk and video flag
//! * [`FingerprintCache`]: asset id → content fingerprint
//! * the last-sync watermark
//!
//! # Architecture
//!
//! * [`entry`]: value types stored in the caches.
//! * [`store`]: the synchronized [`SyncStore`] and its checksummed JSON record format.
//! * [`watermark`]: the scalar watermark record.
//!
//! # Cache Invalidation
//!
//! Entries are keyed by asset id only. A sync pass refreshes every asset
//! created or modified after the watermark and overwrites its entries.
//! Entries are never deleted; ids that disappear from the library simply
//! stop being referenced.

pub mod entry;
pub mod store;
pub mod watermark;

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use directories::ProjectDirs;

pub use entry::{AssetMetadata, CacheValue, Fingerprint, FINGERPRINT_LEN};
pub use store::{load_from_disk, read_record, CacheError, CacheResult, SyncStore, CACHE_VERSION};
pub use watermark::{load_watermark, save_watermark};

use store::load_checked;

/// Asset id → metadata.
pub type MetadataCache = SyncStore<AssetMetadata>;

/// Asset id → fingerprint.
pub type FingerprintCache = SyncStore<Fingerprint>;

/// File name of the metadata record.
pub const METADATA_FILE: &str = "metadata-cache.json";
/// File name of the fingerprint record.
pub const FINGERPRINT_FILE: &str = "fingerprint-cache.json";
/// File name of the watermark record.
pub const WATERMARK_FILE: &str = "last-sync-watermark.json";
/// Prefix of the per-library subdirectories under a base cache directory.
pub const LIBRARY_DIR_PREFIX: &str = "library-";

/// Directory holding the three persisted records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheDir {
    root: PathBuf,
}

impl CacheDir {
    /// Use `root` as the cache directory.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The platform-specific default cache directory.
    ///
    /// # Errors
    ///
    /// Fails if no home directory can be determined.
    pub fn platform_default() -> anyhow::Result<Self> {
        let dirs = ProjectDirs::from("com", "snapsweep", "snapsweep")
            .ok_or_else(|| anyhow::anyhow!("Failed to determine project directories"))?;
        Ok(Self::new(dirs.cache_dir()))
    }

    /// The subdirectory holding the records of the library at `library_root`.
    ///
    /// Asset ids are relative to their library root, so each root needs its
    /// own records and watermark. The name is derived from a BLAKE3 digest of
    /// the canonical root path; a root that cannot be canonicalized (for
    /// example because it does not exist yet) is hashed as given.
    #[must_use]
    pub fn for_library(&self, library_root: &Path) -> Self {
        let canonical =
            std::fs::canonicalize(library_root).unwrap_or_else(|_| library_root.to_path_buf());
        let digest = blake3::hash(canonical.as_os_str().as_encoded_bytes());
        let name = format!("{LIBRARY_DIR_PREFIX}{}", &digest.to_hex().as_str()[..16]);
        Self::new(self.root.join(name))
    }

    /// Every per-library subdirectory currently present under this directory.
    pub fn libraries(&self) -> CacheResult<Vec<Self>> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(CacheError::Io {
                    path: self.root.clone(),
                    source,
                })
            }
        };
        let mut dirs: Vec<Self> = entries
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_ok_and(|t| t.is_dir()))
            .filter(|e| {
                e.file_name()
                    .to_str()
                    .is_some_and(|n| n.starts_with(LIBRARY_DIR_PREFIX))
            })
            .map(|e| Self::new(e.path()))
            .collect();
        dirs.sort_by(|a, b| a.root.cmp(&b.root));
        Ok(dirs)
    }

    /// The directory itself.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the metadata record.
    #[must_use]
    pub fn metadata_path(&self) -> PathBuf {
        self.root.join(METADATA_FILE)
    }

    /// Path of the fingerprint record.
    #[must_use]
    pub fn fingerprint_path(&self) -> PathBuf {
        self.root.join(FINGERPRINT_FILE)
    }

    /// Path of the watermark record.
    #[must_use]
    pub fn watermark_path(&self) -> PathBuf {
        self.root.join(WATERMARK_FILE)
    }

    /// Remove all records. Missing records are not an error.
    pub fn clear(&self) -> CacheResult<()> {
        for path in [
            self.metadata_path(),
            self.fingerprint_path(),
            self.watermark_path(),
        ] {
            match std::fs::remove_file(&path) {
                Ok(()) => log::debug!("Removed {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(source) => return Err(CacheError::Io { path, source }),
            }
        }
        Ok(())
    }
}

/// The in-memory working set: both caches plus the watermark.
///
/// Caches are shared behind `Arc` so fingerprint workers and readers can
/// hold them while a sync pass merges results.
#[derive(Debug, Default)]
pub struct CacheSet {
    /// Metadata for every media kind
    pub metadata: Arc<MetadataCache>,
    /// Fingerprints for images
    pub fingerprints: Arc<FingerprintCache>,
    watermark: RwLock<Option<DateTime<Utc>>>,
}

impl CacheSet {
    /// An empty working set with no watermark (cold start).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load all records from `dir`. Missing or corrupt records start empty.
    ///
    /// If either cache record could not be read, the watermark is dropped so
    /// the next sync treats every asset as new.
    #[must_use]
    pub fn load(dir: &CacheDir) -> Self {
        let (metadata, metadata_ok) = load_checked::<AssetMetadata>(&dir.metadata_path());
        let (fingerprints, fingerprints_ok) = load_checked::<Fingerprint>(&dir.fingerprint_path());
        let mut watermark = load_watermark(&dir.watermark_path());
        if watermark.is_some() && !(metadata_ok && fingerprints_ok) {
            log::warn!("Cache records missing or corrupt, next sync rescans everything");
            watermark = None;
        }

        let set = Self {
            metadata: Arc::new(SyncStore::from_map(metadata)),
            fingerprints: Arc::new(SyncStore::from_map(fingerprints)),
            watermark: RwLock::new(watermark),
        };
        log::info!(
            "Loaded caches: {} metadata, {} fingerprints, watermark {}",
            set.metadata.len(),
            set.fingerprints.len(),
            set.watermark()
                .map_or_else(|| "none".to_string(), |w| w.to_rfc3339())
        );
        set
    }

    /// The current watermark, if any pass has completed.
    #[must_use]
    pub fn watermark(&self) -> Option<DateTime<Utc>> {
        *self.watermark.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Replace the in-memory watermark.
    pub fn set_watermark(&self, watermark: DateTime<Utc>) {
        *self.watermark.write().unwrap_or_else(|e| e.into_inner()) = Some(watermark);
    }

    /// Write both caches, then the watermark, to `dir`.
    ///
    /// The watermark is only written once both caches are on disk, so a
    /// failed cache write never leaves an advanced watermark behind.
    pub fn persist(&self, dir: &CacheDir, watermark: DateTime<Utc>) -> CacheResult<()> {
        self.metadata.save_to_disk(&dir.metadata_path())?;
        self.fingerprints.save_to_disk(&dir.fingerprint_path())?;
        save_watermark(&dir.watermark_path(), watermark)
    }
}
