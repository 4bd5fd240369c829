//! JSON output for sync reports and category views.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "sync": {
//!     "pass_start": "2024-03-03T12:00:00Z",
//!     "previous_watermark": null,
//!     "new_watermark": "2024-03-03T12:00:00Z",
//!     "changed_assets": 3,
//!     "metadata_updated": 3,
//!     "metadata_failed": 0,
//!     "fingerprinted": 2,
//!     "fingerprint_failed": 0,
//!     "persisted": true
//!   },
//!   "categories": [
//!     {
//!       "category": "duplicates",
//!       "title": "Duplicates",
//!       "total_items": 2,
//!       "total_size": 4096.0,
//!       "total_size_display": "4.00 KB",
//!       "sections": [
//!         { "title": "2 duplicates", "layout": "horizontalStrip", "assets": ["a.jpg", "b.jpg"] }
//!       ]
//!     }
//!   ],
//!   "exit_code": 0,
//!   "exit_code_name": "SS000"
//! }
//! ```
//!
//! `report` fills `sections`; `scan` omits them.

use std::io::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::classify::{format_size, AssetSection, Category, CategoryView};
use crate::error::ExitCode;
use crate::sync::SyncReport;

/// Sync pass statistics in JSON form.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSyncReport {
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
    /// Assets whose size could not be read
    pub metadata_failed: usize,
    /// Fingerprints computed
    pub fingerprinted: usize,
    /// Images that failed to fingerprint
    pub fingerprint_failed: usize,
    /// Whether the caches were written to disk
    pub persisted: bool,
}

impl From<&SyncReport> for JsonSyncReport {
    fn from(report: &SyncReport) -> Self {
        Self {
            pass_start: report.pass_start,
            previous_watermark: report.previous_watermark,
            new_watermark: report.new_watermark,
            changed_assets: report.changed_assets,
            metadata_updated: report.metadata_updated,
            metadata_failed: report.metadata_failed,
            fingerprinted: report.pipeline.fingerprinted,
            fingerprint_failed: report.pipeline.failed,
            persisted: report.persisted,
        }
    }
}

/// One category in JSON form.
#[derive(Debug, Clone, Serialize)]
pub struct JsonCategory {
    /// Category key
    pub category: Category,
    /// Display title
    pub title: &'static str,
    /// Distinct assets
    pub total_items: usize,
    /// Total bytes
    pub total_size: f64,
    /// Human-readable total
    pub total_size_display: String,
    /// Sections, omitted for summaries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sections: Option<Vec<AssetSection>>,
}

impl JsonCategory {
    /// Full view including sections.
    #[must_use]
    pub fn from_view(view: &CategoryView) -> Self {
        Self {
            sections: Some(view.sections.clone()),
            ..Self::summary_of(view)
        }
    }

    /// Counts only.
    #[must_use]
    pub fn summary_of(view: &CategoryView) -> Self {
        Self {
            category: view.category,
            title: view.category.title(),
            total_items: view.total_items,
            total_size: view.total_size,
            total_size_display: format_size(view.total_size),
            sections: None,
        }
    }
}

/// Complete JSON document.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    /// The sync pass, when one ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync: Option<JsonSyncReport>,
    /// Category views or summaries
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<JsonCategory>,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "SS000")
    pub exit_code_name: String,
}

impl JsonOutput {
    /// Document for a bare sync pass.
    #[must_use]
    pub fn for_sync(report: &SyncReport, exit_code: ExitCode) -> Self {
        Self::build(Some(report), Vec::new(), exit_code)
    }

    /// Document with full category views.
    #[must_use]
    pub fn for_report(
        report: Option<&SyncReport>,
        views: &[CategoryView],
        exit_code: ExitCode,
    ) -> Self {
        let categories = views.iter().map(JsonCategory::from_view).collect();
        Self::build(report, categories, exit_code)
    }

    /// Document with per-category counts only.
    #[must_use]
    pub fn for_summary(report: Option<&SyncReport>, views: &[CategoryView], exit_code: ExitCode) -> Self {
        let categories = views.iter().map(JsonCategory::summary_of).collect();
        Self::build(report, categories, exit_code)
    }

    fn build(report: Option<&SyncReport>, categories: Vec<JsonCategory>, exit_code: ExitCode) -> Self {
        Self {
            sync: report.map(JsonSyncReport::from),
            categories,
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix().to_string(),
        }
    }

    /// Serialize to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write pretty JSON followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        serde_json::to_writer_pretty(&mut *writer, self)?;
        writeln!(writer)
    }
}
