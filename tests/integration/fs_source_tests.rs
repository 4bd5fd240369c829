use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use filetime::{set_file_mtime, FileTime};
use image::{Rgb, RgbImage};
use snapsweep::cache::{AssetMetadata, Fingerprint};
use snapsweep::classify::{Category, Classifier, ClassifierConfig};
use snapsweep::source::{AssetFilter, AssetSource, FsAssetSource, MediaKind};
use std::collections::HashMap;
use std::fs;
use tempfile::TempDir;

fn at(secs: i64) -> FileTime {
    FileTime::from_unix_time(secs, 0)
}

#[test]
fn test_changed_since_filter_uses_modification_time() {
    let dir = TempDir::new().unwrap();
    let old = dir.path().join("old.png");
    let new = dir.path().join("new.png");
    fs::write(&old, b"x").unwrap();
    fs::write(&new, b"y").unwrap();

    let future = Utc::now().timestamp() + 3600;
    set_file_mtime(&new, at(future)).unwrap();

    let source = FsAssetSource::new(dir.path());
    let watermark = DateTime::from_timestamp(future - 1, 0).unwrap();
    let changed = source
        .enumerate(Some(&AssetFilter::changed_since(watermark)))
        .unwrap();

    let ids: Vec<_> = changed.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, vec!["new.png"]);
}

#[test]
fn test_filter_boundary_is_strict() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("edge.jpg");
    fs::write(&path, b"x").unwrap();
    let future = Utc::now().timestamp() + 7200;
    set_file_mtime(&path, at(future)).unwrap();

    let source = FsAssetSource::new(dir.path());
    let exact = DateTime::from_timestamp(future, 0).unwrap();
    let changed = source
        .enumerate(Some(&AssetFilter::changed_since(exact)))
        .unwrap();
    assert!(changed.is_empty());
}

#[test]
fn test_media_kind_filter_and_classification() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.JPG"), b"x").unwrap();
    fs::write(dir.path().join("b.mov"), b"x").unwrap();
    fs::write(dir.path().join("notes.txt"), b"x").unwrap();
    fs::write(dir.path().join("Screen Shot 2024-03-03.png"), b"x").unwrap();

    let source = FsAssetSource::new(dir.path());
    let all = source.enumerate(None).unwrap();
    assert_eq!(all.len(), 4);

    let kinds = |id: &str| all.iter().find(|a| a.id == id).unwrap().media_kind;
    assert_eq!(kinds("a.JPG"), MediaKind::Image);
    assert_eq!(kinds("b.mov"), MediaKind::Video);
    assert_eq!(kinds("notes.txt"), MediaKind::Other);
    assert!(all
        .iter()
        .find(|a| a.id == "Screen Shot 2024-03-03.png")
        .unwrap()
        .is_screenshot);

    let videos = source
        .enumerate(Some(&AssetFilter::default().with_media_kind(MediaKind::Video)))
        .unwrap();
    assert_eq!(videos.len(), 1);
    assert_eq!(videos[0].id, "b.mov");
}

#[test]
fn test_enumeration_is_newest_first() {
    let dir = TempDir::new().unwrap();
    for name in ["one.png", "two.png", "three.png"] {
        fs::write(dir.path().join(name), b"x").unwrap();
    }
    let source = FsAssetSource::new(dir.path());
    let assets = source.enumerate(None).unwrap();
    assert!(assets
        .windows(2)
        .all(|w| w[0].creation_time >= w[1].creation_time));
}

#[test]
fn test_resource_size_and_missing_asset() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("sub")).unwrap();
    fs::write(dir.path().join("sub/v.mp4"), vec![0u8; 12345]).unwrap();

    let source = FsAssetSource::new(dir.path());
    assert_eq!(source.resource_size("sub/v.mp4").unwrap(), 12345);
    let err = source.resource_size("sub/missing.mp4").unwrap_err();
    assert!(!err.is_fatal());
}

#[test]
fn test_copied_library_keeps_capture_order_for_classification() {
    // 2024-03-01 12:00:00 UTC
    let noon = 1_709_294_400i64;
    let shots = [
        ("day1.png", noon, 0),
        ("day2.png", noon + 86_400, 0),
        ("day3-a.png", noon + 2 * 86_400, 0),
        ("day3-b.png", noon + 2 * 86_400, 400_000_000),
        ("day3-later.png", noon + 2 * 86_400 + 3600, 0),
    ];
    let dir = TempDir::new().unwrap();
    for (i, (name, secs, nanos)) in shots.iter().enumerate() {
        let path = dir.path().join(name);
        let shade = u8::try_from(i * 40).unwrap();
        RgbImage::from_pixel(8, 8, Rgb([shade, 0, 0])).save(&path).unwrap();
        set_file_mtime(&path, FileTime::from_unix_time(*secs, *nanos)).unwrap();
    }

    let assets = FsAssetSource::new(dir.path()).enumerate(None).unwrap();
    let metadata: HashMap<String, AssetMetadata> = assets
        .iter()
        .map(|a| (a.id.clone(), AssetMetadata::new(1024.0, false)))
        .collect();
    let fingerprints: HashMap<String, Fingerprint> = assets
        .iter()
        .map(|a| (a.id.clone(), Fingerprint::of_bytes(a.id.as_bytes())))
        .collect();
    let classifier = Classifier::new(ClassifierConfig::default().with_calendar(
        FixedOffset::east_opt(0).unwrap(),
        NaiveDate::from_ymd_opt(2024, 3, 3).unwrap(),
    ));

    let all = classifier.classify(Category::All, &assets, &metadata, &fingerprints);
    let titles: Vec<&str> = all.sections.iter().map(|s| s.title.as_str()).collect();
    assert_eq!(titles, vec!["Today", "Yesterday", "01 Mar 2024"]);

    let similar = classifier.classify(Category::Similar, &assets, &metadata, &fingerprints);
    assert_eq!(similar.sections.len(), 1);
    assert_eq!(similar.sections[0].assets, vec!["day3-b.png", "day3-a.png"]);
}
