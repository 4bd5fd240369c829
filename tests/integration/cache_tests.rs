use rayon::prelude::*;
use snapsweep::cache::{
    load_from_disk, read_record, AssetMetadata, CacheDir, CacheError, CacheSet, Fingerprint,
    FingerprintCache, MetadataCache,
};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

fn populated() -> CacheSet {
    let caches = CacheSet::new();
    // Sizes that do not survive a lossy float print
    caches.metadata.set("a.jpg", AssetMetadata::new(0.1 + 0.2, false));
    caches.metadata.set("b.mov", AssetMetadata::new(1.0e15 / 3.0, true));
    caches
        .fingerprints
        .set("a.jpg", Fingerprint::of_bytes(b"pixels of a"));
    caches
}

#[test]
fn test_values_round_trip_exactly() {
    let tmp = TempDir::new().unwrap();
    let dir = CacheDir::new(tmp.path());
    let caches = populated();
    caches
        .persist(&dir, chrono::Utc::now())
        .unwrap();

    let metadata = MetadataCache::open(&dir.metadata_path());
    assert_eq!(
        metadata.get("a.jpg").unwrap().size_on_disk.to_bits(),
        (0.1f64 + 0.2).to_bits()
    );
    assert_eq!(
        metadata.get("b.mov").unwrap().size_on_disk.to_bits(),
        (1.0e15f64 / 3.0).to_bits()
    );
    let fingerprints = FingerprintCache::open(&dir.fingerprint_path());
    assert_eq!(
        fingerprints.get("a.jpg"),
        Some(Fingerprint::of_bytes(b"pixels of a"))
    );
}

#[test]
fn test_tampered_entry_fails_checksum() {
    let tmp = TempDir::new().unwrap();
    let dir = CacheDir::new(tmp.path());
    populated().persist(&dir, chrono::Utc::now()).unwrap();

    let content = fs::read_to_string(dir.metadata_path()).unwrap();
    fs::write(dir.metadata_path(), content.replace("true", "false")).unwrap();

    let err = read_record::<AssetMetadata>(&dir.metadata_path()).unwrap_err();
    assert!(matches!(err, CacheError::Corrupt { .. }));
    assert!(load_from_disk::<AssetMetadata>(&dir.metadata_path()).is_empty());
}

#[test]
fn test_records_are_not_interchangeable() {
    let tmp = TempDir::new().unwrap();
    let dir = CacheDir::new(tmp.path());
    populated().persist(&dir, chrono::Utc::now()).unwrap();

    let err = read_record::<Fingerprint>(&dir.metadata_path()).unwrap_err();
    assert!(matches!(err, CacheError::Corrupt { .. }));
}

#[test]
fn test_garbage_and_empty_files_start_cold() {
    let tmp = TempDir::new().unwrap();
    let dir = CacheDir::new(tmp.path());
    fs::write(dir.metadata_path(), b"").unwrap();
    fs::write(dir.fingerprint_path(), b"\x00\xffgarbage").unwrap();
    fs::write(dir.watermark_path(), b"{\"version\": 1").unwrap();

    let caches = CacheSet::load(&dir);
    assert!(caches.metadata.is_empty());
    assert!(caches.fingerprints.is_empty());
    assert!(caches.watermark().is_none());
}

#[test]
fn test_failed_write_leaves_previous_record() {
    let tmp = TempDir::new().unwrap();
    let dir = CacheDir::new(tmp.path());
    let caches = populated();
    caches.persist(&dir, chrono::Utc::now()).unwrap();
    let before = fs::read(dir.metadata_path()).unwrap();

    // A directory squatting on the temp name makes the next write fail.
    fs::create_dir(tmp.path().join("metadata-cache.json.tmp")).unwrap();
    caches.metadata.set("c.jpg", AssetMetadata::new(1.0, false));
    assert!(caches.persist(&dir, chrono::Utc::now()).is_err());

    assert_eq!(fs::read(dir.metadata_path()).unwrap(), before);
}

#[test]
fn test_parallel_writers_and_readers() {
    let store = Arc::new(MetadataCache::new());
    (0..2000).into_par_iter().for_each(|i| {
        let id = format!("asset-{}", i % 100);
        store.set(id.clone(), AssetMetadata::new(i as f64, false));
        let seen = store.get(&id).unwrap();
        assert!(seen.size_on_disk >= 0.0);
    });
    assert_eq!(store.len(), 100);
}
