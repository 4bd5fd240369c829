//! Synchronized key-value store with checksummed JSON persistence.
//!
//! # Record format
//!
//! ```json
//! {
//!   "version": 1,
//!   "kind": "fingerprint-cache",
//!   "checksum": "<sha256 of the compact entries JSON>",
//!   "entries": { "<asset id>": <value>, ... }
//! }
//! ```
//!
//! Entries are written from a `BTreeMap`, so identical contents always
//! produce identical bytes.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::entry::CacheValue;

/// Current version of the cache record format.
pub const CACHE_VERSION: u32 = 1;

/// Errors raised while persisting or strictly reading a cache record.
#[derive(thiserror::Error, Debug)]
pub enum CacheError {
    /// Reading or writing the record failed.
    #[error("Cache I/O error for {path}: {source}")]
    Io {
        /// Path of the record
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Serializing the record failed.
    #[error("Failed to serialize cache: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The record exists but cannot be trusted.
    #[error("Corrupt cache record {path}: {reason}")]
    Corrupt {
        /// Path of the record
        path: PathBuf,
        /// What was wrong with it
        reason: String,
    },
}

/// Result alias for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

#[derive(Serialize, Deserialize)]
struct CacheRecord<V> {
    version: u32,
    kind: String,
    checksum: String,
    entries: BTreeMap<String, V>,
}

fn checksum<V: Serialize>(entries: &BTreeMap<String, V>) -> CacheResult<String> {
    let compact = serde_json::to_string(entries)?;
    let mut hasher = Sha256::new();
    hasher.update(compact.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

/// Write `bytes` to `path` via a sibling temp file and rename.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> CacheResult<()> {
    let io_err = |source| CacheError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    fs::write(&tmp, bytes).map_err(io_err)?;
    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        io_err(e)
    })
}

/// Read and verify a record, failing on anything unexpected.
///
/// A missing file is reported as [`CacheError::Io`] with
/// [`io::ErrorKind::NotFound`].
pub fn read_record<V: CacheValue>(path: &Path) -> CacheResult<HashMap<String, V>> {
    let content = fs::read_to_string(path).map_err(|source| CacheError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let corrupt = |reason: String| CacheError::Corrupt {
        path: path.to_path_buf(),
        reason,
    };

    let record: CacheRecord<V> =
        serde_json::from_str(&content).map_err(|e| corrupt(e.to_string()))?;
    if record.version != CACHE_VERSION {
        return Err(corrupt(format!(
            "unsupported version {} (expected {})",
            record.version, CACHE_VERSION
        )));
    }
    if record.kind != V::KIND {
        return Err(corrupt(format!(
            "record kind {:?} (expected {:?})",
            record.kind,
            V::KIND
        )));
    }
    if checksum(&record.entries)? != record.checksum {
        return Err(corrupt("checksum mismatch".into()));
    }
    Ok(record.entries.into_iter().collect())
}

/// Load a record, treating a missing or corrupt file as an empty cache.
pub fn load_from_disk<V: CacheValue>(path: &Path) -> HashMap<String, V> {
    load_checked(path).0
}

/// Like [`load_from_disk`], also reporting whether a valid record was read.
pub(crate) fn load_checked<V: CacheValue>(path: &Path) -> (HashMap<String, V>, bool) {
    match read_record(path) {
        Ok(entries) => {
            log::debug!(
                "Loaded {} entries from {} ({})",
                entries.len(),
                path.display(),
                V::KIND
            );
            (entries, true)
        }
        Err(CacheError::Io { ref source, .. }) if source.kind() == io::ErrorKind::NotFound => {
            log::debug!("No {} at {}, starting cold", V::KIND, path.display());
            (HashMap::new(), false)
        }
        Err(e) => {
            log::warn!("Ignoring unreadable {}: {}", V::KIND, e);
            (HashMap::new(), false)
        }
    }
}

/// Thread-safe map from asset id to a cache value.
///
/// Every operation takes the internal lock for its whole duration, so a
/// reader sees either the old or the new value for a key, never a partial
/// write. Cross-key atomicity is only provided by [`SyncStore::merge`].
#[derive(Debug)]
pub struct SyncStore<V> {
    entries: RwLock<HashMap<String, V>>,
}

impl<V: CacheValue> Default for SyncStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: CacheValue> SyncStore<V> {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Create a store holding `entries`.
    #[must_use]
    pub fn from_map(entries: HashMap<String, V>) -> Self {
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Open the record at `path`, starting empty if it is missing or corrupt.
    #[must_use]
    pub fn open(path: &Path) -> Self {
        Self::from_map(load_from_disk(path))
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, V>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, V>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Look up the value for `id`.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<V> {
        self.read().get(id).cloned()
    }

    /// Insert or overwrite the value for `id`.
    pub fn set(&self, id: impl Into<String>, value: V) {
        self.write().insert(id.into(), value);
    }

    /// Insert or overwrite a batch of values under a single lock.
    ///
    /// Returns the number of entries written. Existing keys absent from
    /// `values` are left untouched.
    pub fn merge<I>(&self, values: I) -> usize
    where
        I: IntoIterator<Item = (String, V)>,
    {
        let mut entries = self.write();
        let mut written = 0;
        for (id, value) in values {
            entries.insert(id, value);
            written += 1;
        }
        written
    }

    /// Whether an entry exists for `id`.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.read().contains_key(id)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Copy of the current contents.
    #[must_use]
    pub fn snapshot(&self) -> HashMap<String, V> {
        self.read().clone()
    }

    /// Persist the current contents to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if serialization or the write fails. The
    /// previous record on disk is left intact in that case.
    pub fn save_to_disk(&self, path: &Path) -> CacheResult<()> {
        let entries: BTreeMap<String, V> = self
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let record = CacheRecord {
            version: CACHE_VERSION,
            kind: V::KIND.to_string(),
            checksum: checksum(&entries)?,
            entries,
        };
        let json = serde_json::to_string_pretty(&record)?;
        write_atomic(path, json.as_bytes())?;
        log::debug!(
            "Saved {} entries to {} ({})",
            record.entries.len(),
            path.display(),
            V::KIND
        );
        Ok(())
    }
}
