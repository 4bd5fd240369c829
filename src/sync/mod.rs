//! Incremental sync pass.
//!
//! # Overview
//!
//! A pass brings the caches up to date with the asset source:
//!
//! 1. Capture the pass start time before touching the source
//! 2. Enumerate assets created or modified after the watermark
//! 3. Refresh metadata for every changed asset (videos included)
//! 4. Fingerprint the changed images
//! 5. Merge both result sets into the caches (overwrite, never delete)
//! 6. Persist metadata, fingerprints, then the watermark
//! 7. Advance the watermark to the pass start time
//!
//! Using the start time rather than the end time means an asset created
//! while the pass runs is picked up again by the next pass.
//!
//! A pass that finds nothing changed writes nothing and leaves the
//! watermark untouched.
//!
//! # Example
//!
//! ```no_run
//! use snapsweep::cache::{CacheDir, CacheSet};
//! use snapsweep::source::FsAssetSource;
//! use snapsweep::sync::{IncrementalSync, SyncConfig};
//!
//! let dir = CacheDir::new("/tmp/snapsweep-cache");
//! let caches = CacheSet::load(&dir);
//! let source = FsAssetSource::new("/home/me/Pictures");
//!
//! let report = IncrementalSync::new(SyncConfig::default())
//!     .run(&source, &caches, Some(&dir))
//!     .unwrap();
//! println!("{} assets changed", report.changed_assets);
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::cache::{AssetMetadata, CacheDir, CacheError, CacheSet};
use crate::pipeline::{FingerprintPipeline, PipelineConfig, PipelineStats};
use crate::progress::PHASE_METADATA;
use crate::source::{Asset, AssetFilter, AssetSource, MediaKind, SourceError};

/// Errors that abort a sync pass.
///
/// In every case the watermark is left where it was, so the next pass
/// retries the same window.
#[derive(thiserror::Error, Debug)]
pub enum SyncError {
    /// The source could not be enumerated or rendered.
    #[error("Sync aborted: {0}")]
    SourceUnavailable(#[source] SourceError),

    /// The pass was cancelled.
    #[error("Sync interrupted by user")]
    Interrupted,

    /// A cache record could not be written.
    #[error("Failed to persist caches: {0}")]
    Persistence(#[from] CacheError),
}

/// Configuration for a sync pass.
#[derive(Debug, Clone, Default)]
pub struct SyncConfig {
    /// Fingerprint pipeline settings, including the shutdown flag.
    pub pipeline: PipelineConfig,
}

impl SyncConfig {
    /// Use the given pipeline configuration.
    #[must_use]
    pub fn with_pipeline(mut self, pipeline: PipelineConfig) -> Self {
        self.pipeline = pipeline;
        self
    }
}

/// What a completed pass did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// When the pass started
    pub pass_start: DateTime<Utc>,
    /// Watermark before the pass
    pub previous_watermark: Option<DateTime<Utc>>,
    /// Watermark after the pass
    pub new_watermark: Option<DateTime<Utc>>,
    /// Assets created or modified since the previous watermark
    pub changed_assets: usize,
    /// Metadata entries written
    pub metadata_updated: usize,
    /// Assets whose metadata could not be read
    pub metadata_failed: usize,
    /// Fingerprint pipeline statistics
    pub pipeline: PipelineStats,
    /// Whether anything was written to disk
    pub persisted: bool,
}

impl SyncReport {
    /// Whether the pass found nothing to do.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.changed_assets == 0
    }

    /// Whether some assets failed and will be retried later.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.metadata_failed > 0 || self.pipeline.failed > 0
    }
}

/// Orchestrates sync passes.
#[derive(Debug, Clone, Default)]
pub struct IncrementalSync {
    config: SyncConfig,
}

impl IncrementalSync {
    /// Create a sync driver.
    #[must_use]
    pub fn new(config: SyncConfig) -> Self {
        Self { config }
    }

    /// Run one pass.
    ///
    /// With `cache_dir = None` the pass only updates the in-memory caches;
    /// the watermark still advances.
    ///
    /// # Errors
    ///
    /// - [`SyncError::SourceUnavailable`] if the source cannot be enumerated, or
    ///   becomes unavailable while reading metadata or rendering.
    /// - [`SyncError::Interrupted`] if the shutdown flag is set. Results computed
    ///   so far are merged in memory but nothing is persisted.
    /// - [`SyncError::Persistence`] if a record cannot be written. In-memory
    ///   caches keep the merged results.
    pub fn run<S: AssetSource + ?Sized>(
        &self,
        source: &S,
        caches: &CacheSet,
        cache_dir: Option<&CacheDir>,
    ) -> Result<SyncReport, SyncError> {
        let pass_start = Utc::now();
        let previous_watermark = caches.watermark();

        if self.config.pipeline.is_shutdown_requested() {
            return Err(SyncError::Interrupted);
        }

        let filter = AssetFilter {
            changed_since: previous_watermark,
            media_kind: None,
        };
        let changed = source
            .enumerate(Some(&filter))
            .map_err(SyncError::SourceUnavailable)?;

        let mut report = SyncReport {
            pass_start,
            previous_watermark,
            new_watermark: previous_watermark,
            changed_assets: changed.len(),
            metadata_updated: 0,
            metadata_failed: 0,
            pipeline: PipelineStats::default(),
            persisted: false,
        };

        if changed.is_empty() {
            log::info!("Sync: no assets changed since last pass");
            return Ok(report);
        }
        log::info!(
            "Sync: {} assets changed since {}",
            changed.len(),
            previous_watermark.map_or_else(|| "the beginning".to_string(), |w| w.to_rfc3339())
        );

        // Metadata for every media kind
        let (metadata, failed) = self.refresh_metadata(source, &changed)?;
        report.metadata_failed = failed;
        report.metadata_updated = caches.metadata.merge(metadata);

        if self.config.pipeline.is_shutdown_requested() {
            log::info!("Sync: interrupted after metadata refresh");
            return Err(SyncError::Interrupted);
        }

        // Fingerprints for images only
        let image_ids: Vec<String> = changed
            .iter()
            .filter(|a| a.media_kind == MediaKind::Image)
            .map(|a| a.id.clone())
            .collect();
        let output = FingerprintPipeline::new(self.config.pipeline.clone()).run(source, &image_ids);
        caches.fingerprints.merge(output.fingerprints);
        report.pipeline = output.stats;

        if let Some(e) = output.source_error {
            return Err(SyncError::SourceUnavailable(e));
        }
        if report.pipeline.interrupted || self.config.pipeline.is_shutdown_requested() {
            return Err(SyncError::Interrupted);
        }

        if let Some(dir) = cache_dir {
            caches.persist(dir, pass_start)?;
            report.persisted = true;
        }
        caches.set_watermark(pass_start);
        report.new_watermark = Some(pass_start);

        log::info!(
            "Sync complete: {} metadata, {} fingerprints, {} failures, watermark {}",
            report.metadata_updated,
            report.pipeline.fingerprinted,
            report.metadata_failed + report.pipeline.failed,
            pass_start.to_rfc3339()
        );
        Ok(report)
    }

    fn refresh_metadata<S: AssetSource + ?Sized>(
        &self,
        source: &S,
        changed: &[Asset],
    ) -> Result<(HashMap<String, AssetMetadata>, usize), SyncError> {
        let callback = self.config.pipeline.progress_callback.as_ref().map(Arc::clone);
        if let Some(ref cb) = callback {
            cb.on_phase_start(PHASE_METADATA, changed.len());
        }

        let mut entries = HashMap::with_capacity(changed.len());
        let mut failed = 0;
        for (idx, asset) in changed.iter().enumerate() {
            match source.resource_size(&asset.id) {
                Ok(size) => {
                    entries.insert(
                        asset.id.clone(),
                        AssetMetadata::new(size as f64, asset.media_kind == MediaKind::Video),
                    );
                }
                Err(e) if e.is_fatal() => return Err(SyncError::SourceUnavailable(e)),
                Err(e) => {
                    log::warn!("Failed to read metadata for {}: {}", asset.id, e);
                    failed += 1;
                }
            }
            if let Some(ref cb) = callback {
                cb.on_progress(idx + 1, &asset.id);
            }
        }

        if let Some(ref cb) = callback {
            cb.on_phase_end(PHASE_METADATA);
        }
        Ok((entries, failed))
    }
}
