use chrono::Utc;
use filetime::{set_file_mtime, FileTime};
use image::{Rgba, RgbaImage};
use snapsweep::cache::{CacheDir, CacheSet};
use snapsweep::classify::{Category, Classifier};
use snapsweep::pipeline::PipelineConfig;
use snapsweep::source::{AssetSource, FsAssetSource};
use snapsweep::sync::{IncrementalSync, SyncConfig, SyncError};
use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

fn write_png(path: &Path, color: [u8; 4]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    RgbaImage::from_pixel(48, 48, Rgba(color)).save(path).unwrap();
}

/// Library with two identical photos, a unique photo, a screenshot and a video.
fn sample_library() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_png(&dir.path().join("a.png"), [200, 10, 10, 255]);
    write_png(&dir.path().join("trip/b.png"), [200, 10, 10, 255]);
    write_png(&dir.path().join("c.png"), [10, 200, 10, 255]);
    write_png(&dir.path().join("Screenshot 1.png"), [10, 10, 200, 255]);
    fs::write(dir.path().join("clip.mp4"), vec![0u8; 4096]).unwrap();
    dir
}

fn sync() -> IncrementalSync {
    IncrementalSync::new(
        SyncConfig::default().with_pipeline(PipelineConfig::default().with_io_threads(2)),
    )
}

fn push_mtime_forward(path: &Path, secs: u64) {
    let later = SystemTime::now() + Duration::from_secs(secs);
    set_file_mtime(path, FileTime::from_system_time(later)).unwrap();
}

#[test]
fn test_first_sync_processes_library() {
    let library = sample_library();
    let cache = TempDir::new().unwrap();
    let dir = CacheDir::new(cache.path());
    let source = FsAssetSource::new(library.path());
    let caches = CacheSet::load(&dir);

    let report = sync().run(&source, &caches, Some(&dir)).unwrap();

    assert_eq!(report.changed_assets, 5);
    assert_eq!(report.metadata_updated, 5);
    assert_eq!(report.pipeline.requested, 4);
    assert_eq!(report.pipeline.fingerprinted, 4);
    assert!(report.persisted);
    assert!(caches.metadata.get("clip.mp4").unwrap().is_video);
    assert_eq!(caches.metadata.get("clip.mp4").unwrap().size_on_disk, 4096.0);
    assert_eq!(
        caches.fingerprints.get("a.png"),
        caches.fingerprints.get("trip/b.png")
    );
    assert_ne!(
        caches.fingerprints.get("a.png"),
        caches.fingerprints.get("c.png")
    );
}

#[test]
fn test_second_sync_is_noop_and_leaves_records_untouched() {
    let library = sample_library();
    let cache = TempDir::new().unwrap();
    let dir = CacheDir::new(cache.path());
    let source = FsAssetSource::new(library.path());

    let first = sync().run(&source, &CacheSet::load(&dir), Some(&dir)).unwrap();
    let metadata_bytes = fs::read(dir.metadata_path()).unwrap();
    let fingerprint_bytes = fs::read(dir.fingerprint_path()).unwrap();
    let watermark_bytes = fs::read(dir.watermark_path()).unwrap();

    let reloaded = CacheSet::load(&dir);
    assert_eq!(reloaded.watermark(), Some(first.pass_start));
    let second = sync().run(&source, &reloaded, Some(&dir)).unwrap();

    assert!(second.is_noop());
    assert!(!second.persisted);
    assert_eq!(second.new_watermark, Some(first.pass_start));
    assert_eq!(fs::read(dir.metadata_path()).unwrap(), metadata_bytes);
    assert_eq!(fs::read(dir.fingerprint_path()).unwrap(), fingerprint_bytes);
    assert_eq!(fs::read(dir.watermark_path()).unwrap(), watermark_bytes);
}

#[test]
fn test_identical_content_serializes_identically() {
    let library = sample_library();
    let cache = TempDir::new().unwrap();
    let dir = CacheDir::new(cache.path());
    let source = FsAssetSource::new(library.path());
    let caches = CacheSet::new();
    let report = sync().run(&source, &caches, Some(&dir)).unwrap();

    let other = TempDir::new().unwrap();
    let other_dir = CacheDir::new(other.path());
    CacheSet::load(&dir)
        .persist(&other_dir, report.pass_start)
        .unwrap();

    assert_eq!(
        fs::read(dir.metadata_path()).unwrap(),
        fs::read(other_dir.metadata_path()).unwrap()
    );
    assert_eq!(
        fs::read(dir.fingerprint_path()).unwrap(),
        fs::read(other_dir.fingerprint_path()).unwrap()
    );
}

#[test]
fn test_modified_file_is_refingerprinted() {
    let library = sample_library();
    let cache = TempDir::new().unwrap();
    let dir = CacheDir::new(cache.path());
    let source = FsAssetSource::new(library.path());
    let caches = CacheSet::load(&dir);
    sync().run(&source, &caches, Some(&dir)).unwrap();
    let before = caches.fingerprints.get("c.png").unwrap();

    let path = library.path().join("c.png");
    write_png(&path, [200, 10, 10, 255]);
    push_mtime_forward(&path, 60);

    let report = sync().run(&source, &caches, Some(&dir)).unwrap();
    assert_eq!(report.changed_assets, 1);
    assert_eq!(report.pipeline.fingerprinted, 1);
    let after = caches.fingerprints.get("c.png").unwrap();
    assert_ne!(before, after);
    assert_eq!(Some(after), caches.fingerprints.get("a.png"));
}

#[test]
fn test_truncated_cache_triggers_full_resync() {
    let library = sample_library();
    let cache = TempDir::new().unwrap();
    let dir = CacheDir::new(cache.path());
    let source = FsAssetSource::new(library.path());
    sync().run(&source, &CacheSet::load(&dir), Some(&dir)).unwrap();

    let bytes = fs::read(dir.fingerprint_path()).unwrap();
    fs::write(dir.fingerprint_path(), &bytes[..bytes.len() / 3]).unwrap();

    let caches = CacheSet::load(&dir);
    assert!(caches.fingerprints.is_empty());
    assert!(caches.watermark().is_none());

    let report = sync().run(&source, &caches, Some(&dir)).unwrap();
    assert_eq!(report.changed_assets, 5);
    assert_eq!(caches.fingerprints.len(), 4);
    assert!(CacheSet::load(&dir).watermark().is_some());
}

#[test]
fn test_removed_file_keeps_cache_entry_but_leaves_views() {
    let library = sample_library();
    let cache = TempDir::new().unwrap();
    let dir = CacheDir::new(cache.path());
    let source = FsAssetSource::new(library.path());
    let caches = CacheSet::load(&dir);
    sync().run(&source, &caches, Some(&dir)).unwrap();

    fs::remove_file(library.path().join("trip/b.png")).unwrap();
    let report = sync().run(&source, &caches, Some(&dir)).unwrap();
    assert!(report.is_noop());
    assert!(caches.fingerprints.contains("trip/b.png"));

    let assets = source.enumerate(None).unwrap();
    let view = Classifier::default().classify_cached(Category::Duplicates, &assets, &caches);
    assert!(view.sections.is_empty());
}

#[test]
fn test_undecodable_image_is_retried_later() {
    let library = sample_library();
    fs::write(library.path().join("broken.jpg"), b"not really a jpeg").unwrap();
    let cache = TempDir::new().unwrap();
    let dir = CacheDir::new(cache.path());
    let source = FsAssetSource::new(library.path());
    let caches = CacheSet::load(&dir);

    let report = sync().run(&source, &caches, Some(&dir)).unwrap();
    assert!(report.has_failures());
    assert_eq!(report.pipeline.failed, 1);
    assert!(caches.metadata.contains("broken.jpg"));
    assert!(!caches.fingerprints.contains("broken.jpg"));
    assert!(report.new_watermark.is_some());

    // Once the file is fixed and touched, the next pass fingerprints it.
    let fixed = library.path().join("broken.jpg");
    image::RgbImage::from_pixel(48, 48, image::Rgb([7, 7, 7]))
        .save(&fixed)
        .unwrap();
    push_mtime_forward(&fixed, 5);

    let report = sync().run(&source, &caches, Some(&dir)).unwrap();
    assert_eq!(report.changed_assets, 1);
    assert!(!report.has_failures());
    assert!(caches.fingerprints.contains("broken.jpg"));
}

#[test]
fn test_missing_root_is_source_unavailable() {
    let cache = TempDir::new().unwrap();
    let dir = CacheDir::new(cache.path());
    let source = FsAssetSource::new(cache.path().join("does-not-exist"));
    let caches = CacheSet::load(&dir);

    let err = sync().run(&source, &caches, Some(&dir)).unwrap_err();
    assert!(matches!(err, SyncError::SourceUnavailable(_)));
    assert!(!dir.watermark_path().exists());
}

#[test]
fn test_file_created_after_pass_start_is_picked_up() {
    let library = sample_library();
    let cache = TempDir::new().unwrap();
    let dir = CacheDir::new(cache.path());
    let source = FsAssetSource::new(library.path());
    let caches = CacheSet::load(&dir);
    let first = sync().run(&source, &caches, Some(&dir)).unwrap();
    assert!(first.pass_start <= Utc::now());

    let late = library.path().join("late.png");
    write_png(&late, [1, 2, 3, 255]);
    push_mtime_forward(&late, 5);

    let report = sync().run(&source, &caches, Some(&dir)).unwrap();
    assert_eq!(report.changed_assets, 1);
    assert!(caches.fingerprints.contains("late.png"));
}
