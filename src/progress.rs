//! Progress reporting utilities using indicatif.
//!
//! This module provides the [`Progress`] struct which implements [`ProgressCallback`]
//! to display progress bars in the terminal while a sync pass runs.

use std::sync::Mutex;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Phase name for the metadata refresh.
pub const PHASE_METADATA: &str = "metadata";
/// Phase name for thumbnail fingerprinting.
pub const PHASE_FINGERPRINT: &str = "fingerprint";

/// Progress callback for sync phases.
///
/// Implement this trait to receive progress updates during a sync pass.
/// Fingerprint workers call it concurrently, so implementations must be
/// thread-safe.
pub trait ProgressCallback: Send + Sync {
    /// Called when a phase starts.
    ///
    /// # Arguments
    ///
    /// * `phase` - Name of the phase ([`PHASE_METADATA`] or [`PHASE_FINGERPRINT`])
    /// * `total` - Total number of items to process
    fn on_phase_start(&self, phase: &str, total: usize);

    /// Called after each item is processed.
    ///
    /// # Arguments
    ///
    /// * `completed` - Number of items completed so far in this phase
    /// * `id` - Asset identifier just processed
    fn on_progress(&self, completed: usize, id: &str);

    /// Called when a phase completes.
    fn on_phase_end(&self, phase: &str);
}

/// Progress reporter using indicatif.
pub struct Progress {
    multi: MultiProgress,
    metadata: Mutex<Option<ProgressBar>>,
    fingerprint: Mutex<Option<ProgressBar>>,
    quiet: bool,
}

impl Progress {
    /// Create a new progress reporter.
    ///
    /// # Arguments
    ///
    /// * `quiet` - If true, no progress bars will be displayed.
    ///
    /// # Examples
    ///
    /// ```
    /// use snapsweep::progress::Progress;
    ///
    /// let progress = Progress::new(false);
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            multi: MultiProgress::new(),
            metadata: Mutex::new(None),
            fingerprint: Mutex::new(None),
            quiet,
        }
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg} (ETA: {eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█>-")
    }

    fn slot(&self, phase: &str) -> Option<&Mutex<Option<ProgressBar>>> {
        match phase {
            PHASE_METADATA => Some(&self.metadata),
            PHASE_FINGERPRINT => Some(&self.fingerprint),
            _ => None,
        }
    }

    fn active(&self) -> Option<ProgressBar> {
        [&self.fingerprint, &self.metadata]
            .into_iter()
            .find_map(|slot| slot.lock().ok().and_then(|guard| guard.clone()))
    }
}

impl ProgressCallback for Progress {
    fn on_phase_start(&self, phase: &str, total: usize) {
        if self.quiet {
            return;
        }
        let Some(slot) = self.slot(phase) else {
            return;
        };

        let pb = self.multi.add(ProgressBar::new(total as u64));
        pb.set_style(Self::bar_style());
        pb.set_message(match phase {
            PHASE_METADATA => "Reading metadata",
            _ => "Fingerprinting",
        });
        if let Ok(mut guard) = slot.lock() {
            *guard = Some(pb);
        }
    }

    fn on_progress(&self, completed: usize, id: &str) {
        if self.quiet {
            return;
        }
        if let Some(pb) = self.active() {
            pb.set_position(completed as u64);
            pb.set_message(truncate_id(id, 30));
        }
    }

    fn on_phase_end(&self, phase: &str) {
        if self.quiet {
            return;
        }
        let Some(slot) = self.slot(phase) else {
            return;
        };
        if let Some(pb) = slot.lock().ok().and_then(|mut guard| guard.take()) {
            pb.finish_with_message(match phase {
                PHASE_METADATA => "Metadata complete",
                _ => "Fingerprinting complete",
            });
        }
    }
}

/// Shorten an asset id for display, keeping its last path segment.
fn truncate_id(id: &str, max_len: usize) -> String {
    if id.chars().count() <= max_len {
        return id.to_string();
    }
    let name = id.rsplit('/').next().unwrap_or(id);
    let name_len = name.chars().count();
    if name_len + 4 > max_len {
        let tail: String = name.chars().skip(name_len + 3 - max_len).collect();
        return format!("...{}", tail);
    }
    format!(".../{}", name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_id_short() {
        assert_eq!(truncate_id("a/b.jpg", 30), "a/b.jpg");
    }

    #[test]
    fn test_truncate_id_keeps_file_name() {
        let id = "2024/vacation/with/a/very/long/path/IMG_0001.JPG";
        assert_eq!(truncate_id(id, 30), ".../IMG_0001.JPG");
    }

    #[test]
    fn test_truncate_id_long_file_name() {
        let id = format!("dir/{}", "x".repeat(40));
        let out = truncate_id(&id, 30);
        assert_eq!(out.chars().count(), 30);
        assert!(out.starts_with("..."));
    }

    #[test]
    fn test_quiet_progress_is_noop() {
        let progress = Progress::new(true);
        progress.on_phase_start(PHASE_FINGERPRINT, 10);
        progress.on_progress(1, "a.jpg");
        progress.on_phase_end(PHASE_FINGERPRINT);
        assert!(progress.fingerprint.lock().unwrap().is_none());
    }

    #[test]
    fn test_phase_lifecycle() {
        let progress = Progress::new(false);
        progress.on_phase_start(PHASE_METADATA, 3);
        assert!(progress.metadata.lock().unwrap().is_some());
        progress.on_progress(2, "b.png");
        progress.on_phase_end(PHASE_METADATA);
        assert!(progress.metadata.lock().unwrap().is_none());
    }
}
