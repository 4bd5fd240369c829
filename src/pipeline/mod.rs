//! Bounded-concurrency fingerprint pipeline.
//!
//! # Overview
//!
//! Given the ids of assets that need a fingerprint, the pipeline renders a
//! small thumbnail per asset and reduces it to a [`Fingerprint`]. Work runs
//! on a dedicated rayon pool limited to `io_threads` workers, so a large
//! library never fans out into thousands of concurrent renders.
//!
//! # Failure handling
//!
//! - A per-asset failure (missing asset, undecodable image) is logged and
//!   counted; the asset is simply absent from the output and retried on a
//!   later pass.
//! - A fatal [`SourceError::Unavailable`] stops new work from starting and is
//!   reported through [`PipelineOutput::source_error`].
//! - Setting the shutdown flag stops new work from starting. Everything
//!   already computed is still returned.
//!
//! # Example
//!
//! ```
//! use snapsweep::pipeline::{FingerprintPipeline, PipelineConfig};
//! use snapsweep::source::{Asset, MemoryAssetSource};
//! use chrono::Utc;
//!
//! let source = MemoryAssetSource::new();
//! source.insert(Asset::image("a", Utc::now()), 1024);
//!
//! let pipeline = FingerprintPipeline::new(PipelineConfig::default().with_io_threads(2));
//! let output = pipeline.run(&source, &["a".to_string()]);
//! assert_eq!(output.stats.fingerprinted, 1);
//! ```

pub mod fingerprint;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use rayon::prelude::*;

use crate::cache::Fingerprint;
use crate::progress::{ProgressCallback, PHASE_FINGERPRINT};
use crate::source::{AssetSource, SourceError};

pub use fingerprint::{
    encode_png, fingerprint_asset, fingerprint_pixels, FingerprintError, DEFAULT_THUMBNAIL_SIZE,
};

/// Default number of fingerprint workers.
pub const DEFAULT_IO_THREADS: usize = 4;

/// Configuration for the fingerprint pipeline.
#[derive(Clone)]
pub struct PipelineConfig {
    /// Number of worker threads rendering thumbnails.
    /// Default is 4 to keep I/O pressure on the library reasonable.
    pub io_threads: usize,
    /// Edge length of the rendered thumbnail.
    pub thumbnail_size: u32,
    /// Optional shutdown flag for cancellation.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("io_threads", &self.io_threads)
            .field("thumbnail_size", &self.thumbnail_size)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            io_threads: DEFAULT_IO_THREADS,
            thumbnail_size: DEFAULT_THUMBNAIL_SIZE,
            shutdown_flag: None,
            progress_callback: None,
        }
    }
}

impl PipelineConfig {
    /// Set the worker count (at least 1).
    #[must_use]
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads.max(1);
        self
    }

    /// Set the thumbnail edge length (at least 1).
    #[must_use]
    pub fn with_thumbnail_size(mut self, size: u32) -> Self {
        self.thumbnail_size = size.max(1);
        self
    }

    /// Set the shutdown flag for cancellation.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Check if shutdown has been requested.
    #[must_use]
    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// Statistics from one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Ids handed to the pipeline
    pub requested: usize,
    /// Ids that produced a fingerprint
    pub fingerprinted: usize,
    /// Ids whose render or encode failed
    pub failed: usize,
    /// Ids never started because of cancellation or a fatal source error
    pub skipped: usize,
    /// Whether the run was cut short by the shutdown flag
    pub interrupted: bool,
}

/// Result of a pipeline run.
#[derive(Debug, Default)]
pub struct PipelineOutput {
    /// Fingerprints for every id that succeeded
    pub fingerprints: HashMap<String, Fingerprint>,
    /// Run statistics
    pub stats: PipelineStats,
    /// The fatal source error that stopped the run, if any
    pub source_error: Option<SourceError>,
}

enum Outcome {
    Done(String, Fingerprint),
    Failed,
    Skipped,
    Fatal(SourceError),
}

/// Renders and fingerprints assets on a bounded worker pool.
#[derive(Debug, Clone, Default)]
pub struct FingerprintPipeline {
    config: PipelineConfig,
}

impl FingerprintPipeline {
    /// Create a pipeline with the given configuration.
    #[must_use]
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// The pipeline configuration.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Fingerprint every id in `ids`.
    ///
    /// Completion order across workers is unspecified; the output map is the
    /// same whatever order workers finish in.
    #[must_use]
    pub fn run<S: AssetSource + ?Sized>(&self, source: &S, ids: &[String]) -> PipelineOutput {
        let mut output = PipelineOutput {
            stats: PipelineStats {
                requested: ids.len(),
                ..Default::default()
            },
            ..Default::default()
        };
        if ids.is_empty() {
            log::debug!("Fingerprint: nothing to do");
            return output;
        }

        let config = &self.config;
        if let Some(ref callback) = config.progress_callback {
            callback.on_phase_start(PHASE_FINGERPRINT, ids.len());
        }
        log::info!(
            "Fingerprinting {} assets on {} workers",
            ids.len(),
            config.io_threads
        );

        let aborted = AtomicBool::new(false);
        let completed = AtomicUsize::new(0);

        let work = || -> Vec<Outcome> {
            ids.par_iter()
                .map(|id| {
                    if config.is_shutdown_requested() || aborted.load(Ordering::SeqCst) {
                        return Outcome::Skipped;
                    }

                    let outcome = match fingerprint_asset(source, id, config.thumbnail_size) {
                        Ok(fp) => {
                            log::trace!("Fingerprinted {}", id);
                            Outcome::Done(id.clone(), fp)
                        }
                        Err(FingerprintError::Source(e)) if e.is_fatal() => {
                            log::error!("Stopping fingerprinting: {}", e);
                            aborted.store(true, Ordering::SeqCst);
                            Outcome::Fatal(e)
                        }
                        Err(e) => {
                            log::warn!("Failed to fingerprint {}: {}", id, e);
                            Outcome::Failed
                        }
                    };

                    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    if let Some(ref callback) = config.progress_callback {
                        callback.on_progress(done, id);
                    }
                    outcome
                })
                .collect()
        };

        let outcomes = match rayon::ThreadPoolBuilder::new()
            .num_threads(config.io_threads)
            .thread_name(|i| format!("fingerprint-{i}"))
            .build()
        {
            Ok(pool) => pool.install(work),
            Err(e) => {
                log::warn!(
                    "Failed to create fingerprint pool ({}), using global pool with {} threads",
                    e,
                    rayon::current_num_threads()
                );
                work()
            }
        };

        for outcome in outcomes {
            match outcome {
                Outcome::Done(id, fp) => {
                    output.stats.fingerprinted += 1;
                    output.fingerprints.insert(id, fp);
                }
                Outcome::Failed => output.stats.failed += 1,
                Outcome::Skipped => output.stats.skipped += 1,
                Outcome::Fatal(e) => {
                    output.stats.failed += 1;
                    output.source_error.get_or_insert(e);
                }
            }
        }

        if config.is_shutdown_requested() {
            output.stats.interrupted = true;
            log::info!(
                "Fingerprint: interrupted, {} of {} assets done",
                output.stats.fingerprinted,
                ids.len()
            );
        }

        if let Some(ref callback) = config.progress_callback {
            callback.on_phase_end(PHASE_FINGERPRINT);
        }
        log::info!(
            "Fingerprint: {} done, {} failed, {} skipped",
            output.stats.fingerprinted,
            output.stats.failed,
            output.stats.skipped
        );
        output
    }
}
