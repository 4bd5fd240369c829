//! The last-sync watermark record.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::store::{write_atomic, CacheResult, CACHE_VERSION};

#[derive(Debug, Serialize, Deserialize)]
struct WatermarkRecord {
    version: u32,
    watermark: DateTime<Utc>,
}

/// Load the watermark, returning `None` for a missing or unreadable record.
pub fn load_watermark(path: &Path) -> Option<DateTime<Utc>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            log::warn!("Failed to read watermark {}: {}", path.display(), e);
            return None;
        }
    };
    match serde_json::from_str::<WatermarkRecord>(&content) {
        Ok(record) if record.version == CACHE_VERSION => Some(record.watermark),
        Ok(record) => {
            log::warn!(
                "Ignoring watermark with unsupported version {}",
                record.version
            );
            None
        }
        Err(e) => {
            log::warn!("Ignoring corrupt watermark {}: {}", path.display(), e);
            None
        }
    }
}

/// Persist the watermark.
pub fn save_watermark(path: &Path, watermark: DateTime<Utc>) -> CacheResult<()> {
    let record = WatermarkRecord {
        version: CACHE_VERSION,
        watermark,
    };
    let json = serde_json::to_string_pretty(&record)?;
    write_atomic(path, json.as_bytes())
}
