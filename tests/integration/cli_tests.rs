use clap::Parser;
use image::{Rgba, RgbaImage};
use snapsweep::cache::{CacheDir, CacheSet};
use snapsweep::cli::Cli;
use snapsweep::error::ExitCode;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

struct Workspace {
    library: TempDir,
    cache: TempDir,
}

fn write_library(files: &[(&str, [u8; 4])]) -> TempDir {
    let library = TempDir::new().unwrap();
    for (name, color) in files {
        RgbaImage::from_pixel(16, 16, Rgba(*color))
            .save(library.path().join(name))
            .unwrap();
    }
    library
}

fn run_in(library: &Path, cache: &Path, command: &str, extra: &[&str]) -> anyhow::Result<ExitCode> {
    let config = cache.join("no-config.toml");
    let mut args = vec![
        "snapsweep".to_string(),
        "-q".to_string(),
        "--config".to_string(),
        config.to_string_lossy().into_owned(),
        command.to_string(),
        library.to_string_lossy().into_owned(),
        "--cache-dir".to_string(),
        cache.to_string_lossy().into_owned(),
        "--no-progress".to_string(),
    ];
    args.extend(extra.iter().map(|s| s.to_string()));
    snapsweep::run_app(Cli::try_parse_from(args).unwrap())
}

impl Workspace {
    fn new() -> Self {
        Self {
            library: write_library(&[
                ("x.png", [9, 9, 9, 255]),
                ("y.png", [9, 9, 9, 255]),
                ("screenshot-1.png", [1, 1, 1, 255]),
            ]),
            cache: TempDir::new().unwrap(),
        }
    }

    fn run(&self, command: &str, extra: &[&str]) -> anyhow::Result<ExitCode> {
        run_in(self.library.path(), self.cache.path(), command, extra)
    }

    fn cache_dir(&self) -> CacheDir {
        CacheDir::new(self.cache.path()).for_library(self.library.path())
    }
}

#[test]
fn test_sync_command_persists_caches() {
    let ws = Workspace::new();
    assert_eq!(ws.run("sync", &[]).unwrap(), ExitCode::Success);

    let caches = CacheSet::load(&ws.cache_dir());
    assert_eq!(caches.metadata.len(), 3);
    assert_eq!(caches.fingerprints.len(), 3);
    assert!(caches.watermark().is_some());
}

#[test]
fn test_report_and_scan_commands() {
    let ws = Workspace::new();
    assert_eq!(
        ws.run("report", &["--output", "json", "--category", "duplicates"])
            .unwrap(),
        ExitCode::Success
    );
    assert_eq!(
        ws.run("scan", &["--large-threshold", "1KB"]).unwrap(),
        ExitCode::Success
    );
    assert_eq!(
        ws.run("report", &["--no-sync"]).unwrap(),
        ExitCode::Success
    );
}

#[test]
fn test_partial_success_when_an_image_fails() {
    let ws = Workspace::new();
    fs::write(ws.library.path().join("corrupt.png"), b"nope").unwrap();
    assert_eq!(ws.run("sync", &[]).unwrap(), ExitCode::PartialSuccess);
}

#[test]
fn test_missing_root_maps_to_source_unavailable() {
    let ws = Workspace::new();
    let missing = ws.library.path().join("gone");
    let cache = ws.cache.path().to_string_lossy().into_owned();
    let cli = Cli::try_parse_from([
        "snapsweep",
        "-q",
        "sync",
        missing.to_str().unwrap(),
        "--cache-dir",
        cache.as_str(),
        "--config",
        Path::new(&cache).join("none.toml").to_str().unwrap(),
    ])
    .unwrap();

    let err = snapsweep::run_app(cli).unwrap_err();
    assert_eq!(ExitCode::for_error(&err), ExitCode::SourceUnavailable);
}

#[test]
fn test_libraries_sharing_a_cache_dir_are_synced_independently() {
    let cache = TempDir::new().unwrap();
    let first = write_library(&[("IMG_1.png", [50, 60, 70, 255])]);
    let second = write_library(&[
        ("IMG_1.png", [5, 5, 5, 255]),
        ("IMG_2.png", [5, 5, 5, 255]),
    ]);

    assert_eq!(
        run_in(first.path(), cache.path(), "sync", &[]).unwrap(),
        ExitCode::Success
    );
    assert_eq!(
        run_in(second.path(), cache.path(), "sync", &[]).unwrap(),
        ExitCode::Success
    );

    let base = CacheDir::new(cache.path());
    let first_caches = CacheSet::load(&base.for_library(first.path()));
    let second_caches = CacheSet::load(&base.for_library(second.path()));
    assert_eq!(first_caches.fingerprints.len(), 1);
    assert_eq!(second_caches.fingerprints.len(), 2);
    assert_eq!(
        second_caches.fingerprints.get("IMG_1.png"),
        second_caches.fingerprints.get("IMG_2.png")
    );
    assert_ne!(
        first_caches.fingerprints.get("IMG_1.png"),
        second_caches.fingerprints.get("IMG_1.png")
    );

    // Clearing one library leaves the other alone.
    let cache_arg = cache.path().to_string_lossy().into_owned();
    let cli = Cli::try_parse_from([
        "snapsweep",
        "clear-cache",
        first.path().to_str().unwrap(),
        "--cache-dir",
        cache_arg.as_str(),
    ])
    .unwrap();
    assert_eq!(snapsweep::run_app(cli).unwrap(), ExitCode::Success);
    assert!(!base.for_library(first.path()).watermark_path().exists());
    assert!(base.for_library(second.path()).watermark_path().exists());
}

#[test]
fn test_clear_cache_command() {
    let ws = Workspace::new();
    ws.run("sync", &[]).unwrap();
    assert!(ws.cache_dir().watermark_path().exists());

    let cache = ws.cache.path().to_string_lossy().into_owned();
    let cli = Cli::try_parse_from(["snapsweep", "clear-cache", "--cache-dir", cache.as_str()])
        .unwrap();
    assert_eq!(snapsweep::run_app(cli).unwrap(), ExitCode::Success);
    assert!(!ws.cache_dir().watermark_path().exists());
    assert!(!ws.cache_dir().metadata_path().exists());
}

#[test]
fn test_invalid_config_file_is_an_error() {
    let ws = Workspace::new();
    let config = ws.cache.path().join("bad.toml");
    fs::write(&config, "thumbnail_size = [1, 2]").unwrap();
    let cli = Cli::try_parse_from([
        "snapsweep",
        "--config",
        config.to_str().unwrap(),
        "sync",
        ws.library.path().to_str().unwrap(),
    ])
    .unwrap();
    let err = snapsweep::run_app(cli).unwrap_err();
    assert_eq!(ExitCode::for_error(&err), ExitCode::GeneralError);
}
