//! Cache value types.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Length of a fingerprint digest in bytes.
pub const FINGERPRINT_LEN: usize = 32;

/// A value that can live in a persisted cache record.
///
/// `KIND` names the record on disk and is checked on load so a metadata
/// file can never be read as a fingerprint file.
pub trait CacheValue: Clone + Serialize + for<'de> Deserialize<'de> + Send + Sync {
    /// Record name, e.g. `metadata-cache`.
    const KIND: &'static str;
}

/// Per-asset metadata tracked for every media kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AssetMetadata {
    /// Size of the primary resource in bytes
    pub size_on_disk: f64,
    /// Whether the asset is a video
    pub is_video: bool,
}

impl AssetMetadata {
    /// Create a metadata entry.
    #[must_use]
    pub fn new(size_on_disk: f64, is_video: bool) -> Self {
        Self {
            size_on_disk,
            is_video,
        }
    }
}

impl CacheValue for AssetMetadata {
    const KIND: &'static str = "metadata-cache";
}

/// Content fingerprint of an asset's downscaled rendering.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(pub [u8; FINGERPRINT_LEN]);

impl Fingerprint {
    /// Digest of arbitrary bytes.
    #[must_use]
    pub fn of_bytes(bytes: &[u8]) -> Self {
        Self(*blake3::hash(bytes).as_bytes())
    }

    /// Lowercase hex representation.
    #[must_use]
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Parse a 64-character hex string.
    ///
    /// Returns `None` if the string has the wrong length or contains
    /// non-hex characters.
    #[must_use]
    pub fn from_hex(hex: &str) -> Option<Self> {
        if hex.len() != FINGERPRINT_LEN * 2 || !hex.is_ascii() {
            return None;
        }
        let mut bytes = [0u8; FINGERPRINT_LEN];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).ok()?;
        }
        Some(Self(bytes))
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", &self.to_hex()[..12])
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Fingerprint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Fingerprint::from_hex(&hex)
            .ok_or_else(|| de::Error::custom(format!("invalid fingerprint: {hex:?}")))
    }
}

impl CacheValue for Fingerprint {
    const KIND: &'static str = "fingerprint-cache";
}
