//! SnapSweep - incremental photo library cleanup.
//!
//! Keeps a persistent cache of asset sizes and thumbnail fingerprints keyed
//! by a last-sync watermark, refreshes only what changed since, and derives
//! cleanup categories (large files, screenshots, duplicates, bursts) from
//! the cache.

pub mod cache;
pub mod classify;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod signal;
pub mod source;
pub mod sync;

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::cache::{CacheDir, CacheSet};
use crate::classify::{CategoryView, Classifier};
use crate::cli::{Cli, ClearCacheArgs, Commands, LibraryArgs, OutputFormat};
use crate::config::Config;
use crate::error::ExitCode;
use crate::output::{text, JsonOutput};
use crate::progress::Progress;
use crate::source::{AssetSource, FsAssetSource};
use crate::sync::{IncrementalSync, SyncConfig, SyncReport};

/// Run the application for parsed command-line arguments.
///
/// # Errors
///
/// Returns an error when configuration is invalid, the library cannot be
/// read, a sync pass fails or is interrupted, or output cannot be written.
/// [`ExitCode::for_error`] maps these to process exit codes.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);

    let mut config = match cli.config {
        Some(ref path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Sync(args) => {
            config.merge_library_args(&args.library);
            let library = Library::open(&config, &args.library)?;
            let report = library.sync(&config, &args.library, cli.quiet)?;
            let code = exit_code_for(Some(&report));

            let mut out = io::stdout().lock();
            match args.output {
                OutputFormat::Text => text::write_sync_report(&mut out, &report)?,
                OutputFormat::Json => JsonOutput::for_sync(&report, code).write_to(&mut out)?,
            }
            Ok(code)
        }
        Commands::Report(args) => {
            config.merge_library_args(&args.library);
            config.merge_classify_args(&args.classify);
            let library = Library::open(&config, &args.library)?;
            let report = if args.no_sync {
                None
            } else {
                Some(library.sync(&config, &args.library, cli.quiet)?)
            };

            let classifier = Classifier::new(config.classifier_config());
            let views = match args.category {
                Some(category) => vec![library.classify_one(&classifier, category.into())?],
                None => library.classify_all(&classifier)?,
            };
            let code = exit_code_for(report.as_ref());

            let mut out = io::stdout().lock();
            match args.output {
                OutputFormat::Text => {
                    if let Some(ref report) = report {
                        if !cli.quiet {
                            text::write_sync_report(&mut out, report)?;
                            writeln!(out)?;
                        }
                    }
                    text::write_views(&mut out, &views)?;
                }
                OutputFormat::Json => {
                    JsonOutput::for_report(report.as_ref(), &views, code).write_to(&mut out)?;
                }
            }
            Ok(code)
        }
        Commands::Scan(args) => {
            config.merge_library_args(&args.library);
            config.merge_classify_args(&args.classify);
            let library = Library::open(&config, &args.library)?;
            let report = library.sync(&config, &args.library, cli.quiet)?;

            let views = library.classify_all(&Classifier::new(config.classifier_config()))?;
            let code = exit_code_for(Some(&report));

            let mut out = io::stdout().lock();
            match args.output {
                OutputFormat::Text => text::write_summary(&mut out, &views)?,
                OutputFormat::Json => {
                    JsonOutput::for_summary(Some(&report), &views, code).write_to(&mut out)?;
                }
            }
            Ok(code)
        }
        Commands::ClearCache(args) => clear_cache(&mut config, &args),
    }
}

/// A filesystem library together with its loaded caches.
struct Library {
    source: FsAssetSource,
    cache_dir: CacheDir,
    caches: CacheSet,
}

impl Library {
    fn open(config: &Config, args: &LibraryArgs) -> Result<Self> {
        let cache_dir = config.cache_dir()?.for_library(&args.root);
        log::debug!("Using cache directory {}", cache_dir.root().display());
        let caches = CacheSet::load(&cache_dir);
        let source = FsAssetSource::new(&args.root).with_skip_hidden(args.skip_hidden);
        Ok(Self {
            source,
            cache_dir,
            caches,
        })
    }

    fn sync(&self, config: &Config, args: &LibraryArgs, quiet: bool) -> Result<SyncReport> {
        let shutdown = signal::install_handler()?;
        let progress = Arc::new(Progress::new(quiet || args.no_progress));
        let pipeline = config
            .pipeline_config()
            .with_shutdown_flag(shutdown.get_flag())
            .with_progress_callback(progress);

        let report = IncrementalSync::new(SyncConfig::default().with_pipeline(pipeline))
            .run(&self.source, &self.caches, Some(&self.cache_dir))
            .with_context(|| format!("Sync of {} failed", self.source.root().display()))?;
        Ok(report)
    }

    fn classify_one(
        &self,
        classifier: &Classifier,
        category: classify::Category,
    ) -> Result<CategoryView> {
        let assets = self.source.enumerate(None)?;
        Ok(classifier.classify_cached(category, &assets, &self.caches))
    }

    fn classify_all(&self, classifier: &Classifier) -> Result<Vec<CategoryView>> {
        let assets = self.source.enumerate(None)?;
        Ok(classifier.classify_all(
            &assets,
            &self.caches.metadata.snapshot(),
            &self.caches.fingerprints.snapshot(),
        ))
    }
}

fn clear_cache(config: &mut Config, args: &ClearCacheArgs) -> Result<ExitCode> {
    if let Some(ref dir) = args.cache_dir {
        config.cache_dir = Some(dir.clone());
    }
    let base = config.cache_dir()?;
    let targets = match args.root {
        Some(ref root) => vec![base.for_library(root)],
        None => {
            let mut all = base
                .libraries()
                .with_context(|| format!("Failed to list {}", base.root().display()))?;
            all.push(base.clone());
            all
        }
    };
    for dir in &targets {
        dir.clear()
            .with_context(|| format!("Failed to clear {}", dir.root().display()))?;
        log::info!("Cleared cache in {}", dir.root().display());
    }
    Ok(ExitCode::Success)
}

fn exit_code_for(report: Option<&SyncReport>) -> ExitCode {
    match report {
        Some(r) if r.has_failures() => ExitCode::PartialSuccess,
        _ => ExitCode::Success,
    }
}
