//! Category views derived from the asset list and the caches.
//!
//! # Overview
//!
//! Classification is pure: given the live enumeration plus snapshots of both
//! caches it builds five category views and never mutates its inputs.
//!
//! | Category    | Sections                                   | Layout            |
//! |-------------|--------------------------------------------|-------------------|
//! | All         | one per creation day, newest day first     | grid              |
//! | Large       | day sections filtered to size > threshold  | focus grid        |
//! | Screenshots | fingerprint groups of 2+, then "Other"     | strip / grid      |
//! | Duplicates  | fingerprint groups of 2+ over all images   | strip             |
//! | Similar     | bursts of images under the time window     | strip             |
//!
//! Ordering is fully determined by the enumeration order and the cache
//! contents. Groups appear in the order of their first member.
//!
//! # Example
//!
//! ```
//! use std::collections::HashMap;
//! use chrono::{TimeZone, Utc};
//! use snapsweep::cache::Fingerprint;
//! use snapsweep::classify::{Category, Classifier};
//! use snapsweep::source::Asset;
//!
//! let assets = vec![
//!     Asset::image("a", Utc.timestamp_opt(300, 0).unwrap()),
//!     Asset::image("b", Utc.timestamp_opt(200, 0).unwrap()),
//! ];
//! let fp = Fingerprint::of_bytes(b"same");
//! let fingerprints = HashMap::from([("a".to_string(), fp), ("b".to_string(), fp)]);
//!
//! let view = Classifier::default().classify(
//!     Category::Duplicates,
//!     &assets,
//!     &HashMap::new(),
//!     &fingerprints,
//! );
//! assert_eq!(view.sections.len(), 1);
//! assert_eq!(view.sections[0].assets, vec!["a", "b"]);
//! ```

pub mod format;

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{Duration, FixedOffset, Local, NaiveDate};
use serde::Serialize;

use crate::cache::{AssetMetadata, CacheSet, Fingerprint};
use crate::source::{Asset, MediaKind};

pub use format::{day_title, format_size};

/// Default size above which an asset counts as large (5 MiB).
pub const DEFAULT_LARGE_THRESHOLD: f64 = 5.0 * 1024.0 * 1024.0;

/// Default burst window in milliseconds.
pub const DEFAULT_BURST_WINDOW_MS: i64 = 1000;

/// Title of the screenshot singleton section.
pub const OTHER_SECTION_TITLE: &str = "Other";

/// How the UI should lay out a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LayoutStyle {
    /// Regular thumbnail grid
    Grid,
    /// Grid emphasising the first (largest) item
    FocusGrid,
    /// Single horizontal row
    HorizontalStrip,
}

/// A titled, ordered group of assets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetSection {
    /// Section title
    pub title: String,
    /// Asset ids in display order
    pub assets: Vec<String>,
    /// Layout hint
    pub layout: LayoutStyle,
}

impl AssetSection {
    fn new(title: impl Into<String>, assets: Vec<String>, layout: LayoutStyle) -> Self {
        Self {
            title: title.into(),
            assets,
            layout,
        }
    }

    /// Number of assets in the section.
    #[must_use]
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Whether the section is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

/// Top-level cleanup classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Every asset, by day
    All,
    /// Assets above the size threshold
    Large,
    /// Screenshots, grouped by fingerprint
    Screenshots,
    /// Images sharing a fingerprint
    Duplicates,
    /// Burst shots
    Similar,
}

impl Category {
    /// All categories in display order.
    pub const ALL: [Category; 5] = [
        Category::All,
        Category::Large,
        Category::Screenshots,
        Category::Duplicates,
        Category::Similar,
    ];

    /// Human-readable title.
    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::All => "All files",
            Self::Large => "Large files",
            Self::Screenshots => "Screenshots",
            Self::Duplicates => "Duplicates",
            Self::Similar => "Similars",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.title())
    }
}

/// Sections of one category plus its aggregate size.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryView {
    /// The category
    pub category: Category,
    /// Sections in display order
    pub sections: Vec<AssetSection>,
    /// Distinct assets across all sections
    pub total_items: usize,
    /// Sum of cached sizes over distinct assets
    pub total_size: f64,
}

impl CategoryView {
    /// Human-readable total size.
    #[must_use]
    pub fn total_size_display(&self) -> String {
        format_size(self.total_size)
    }
}

/// Item count and byte total for one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySummary {
    /// The category
    pub category: Category,
    /// Distinct assets
    pub total_items: usize,
    /// Total bytes
    pub total_size: f64,
}

/// Reduce full views to their counts.
#[must_use]
pub fn summarize(views: &[CategoryView]) -> Vec<CategorySummary> {
    views
        .iter()
        .map(|v| CategorySummary {
            category: v.category,
            total_items: v.total_items,
            total_size: v.total_size,
        })
        .collect()
}

/// Classification settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierConfig {
    /// Assets strictly larger than this many bytes are large.
    pub large_threshold: f64,
    /// Consecutive images closer than this belong to one burst.
    pub burst_window: Duration,
    /// Offset used to find an asset's calendar day.
    pub utc_offset: FixedOffset,
    /// Reference day for the "Today"/"Yesterday" titles.
    pub today: NaiveDate,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        let now = Local::now();
        Self {
            large_threshold: DEFAULT_LARGE_THRESHOLD,
            burst_window: Duration::milliseconds(DEFAULT_BURST_WINDOW_MS),
            utc_offset: *now.offset(),
            today: now.date_naive(),
        }
    }
}

impl ClassifierConfig {
    /// Set the large-file threshold in bytes. Non-finite values are ignored.
    #[must_use]
    pub fn with_large_threshold(mut self, bytes: f64) -> Self {
        if bytes.is_finite() {
            self.large_threshold = bytes;
        }
        self
    }

    /// Set the burst window.
    #[must_use]
    pub fn with_burst_window(mut self, window: Duration) -> Self {
        self.burst_window = window;
        self
    }

    /// Set the day offset and reference day.
    #[must_use]
    pub fn with_calendar(mut self, utc_offset: FixedOffset, today: NaiveDate) -> Self {
        self.utc_offset = utc_offset;
        self.today = today;
        self
    }
}

/// Builds category views.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    config: ClassifierConfig,
}

impl Classifier {
    /// Create a classifier.
    #[must_use]
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    /// The classifier configuration.
    #[must_use]
    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Build the view for one category.
    ///
    /// `assets` must be in source order (creation time, newest first).
    #[must_use]
    pub fn classify(
        &self,
        category: Category,
        assets: &[Asset],
        metadata: &HashMap<String, AssetMetadata>,
        fingerprints: &HashMap<String, Fingerprint>,
    ) -> CategoryView {
        let sections = match category {
            Category::All => self.by_day(assets),
            Category::Large => self.large(assets, metadata),
            Category::Screenshots => self.screenshots(assets, fingerprints),
            Category::Duplicates => self.duplicates(assets, fingerprints),
            Category::Similar => self.similar(assets),
        };
        let (total_items, total_size) = totals(&sections, metadata);
        log::debug!(
            "{}: {} sections, {} assets, {}",
            category,
            sections.len(),
            total_items,
            format_size(total_size)
        );
        CategoryView {
            category,
            sections,
            total_items,
            total_size,
        }
    }

    /// Build every category view, in [`Category::ALL`] order.
    #[must_use]
    pub fn classify_all(
        &self,
        assets: &[Asset],
        metadata: &HashMap<String, AssetMetadata>,
        fingerprints: &HashMap<String, Fingerprint>,
    ) -> Vec<CategoryView> {
        Category::ALL
            .iter()
            .map(|&c| self.classify(c, assets, metadata, fingerprints))
            .collect()
    }

    /// Build one category view from a snapshot of the working set.
    #[must_use]
    pub fn classify_cached(
        &self,
        category: Category,
        assets: &[Asset],
        caches: &CacheSet,
    ) -> CategoryView {
        self.classify(
            category,
            assets,
            &caches.metadata.snapshot(),
            &caches.fingerprints.snapshot(),
        )
    }

    fn day_of(&self, asset: &Asset) -> NaiveDate {
        asset
            .creation_time
            .with_timezone(&self.config.utc_offset)
            .date_naive()
    }

    fn day_buckets<'a>(&self, assets: &'a [Asset]) -> Vec<(NaiveDate, Vec<&'a Asset>)> {
        let mut days: BTreeMap<NaiveDate, Vec<&Asset>> = BTreeMap::new();
        for asset in assets {
            days.entry(self.day_of(asset)).or_default().push(asset);
        }
        days.into_iter().rev().collect()
    }

    fn by_day(&self, assets: &[Asset]) -> Vec<AssetSection> {
        self.day_buckets(assets)
            .into_iter()
            .map(|(day, members)| {
                AssetSection::new(
                    day_title(day, self.config.today),
                    members.into_iter().map(|a| a.id.clone()).collect(),
                    LayoutStyle::Grid,
                )
            })
            .collect()
    }

    fn large(
        &self,
        assets: &[Asset],
        metadata: &HashMap<String, AssetMetadata>,
    ) -> Vec<AssetSection> {
        let threshold = self.config.large_threshold;
        self.day_buckets(assets)
            .into_iter()
            .filter_map(|(day, members)| {
                let mut sized: Vec<(&str, f64)> = members
                    .into_iter()
                    .filter_map(|a| {
                        metadata
                            .get(&a.id)
                            .map(|m| (a.id.as_str(), m.size_on_disk))
                            .filter(|&(_, size)| size > threshold)
                    })
                    .collect();
                if sized.is_empty() {
                    return None;
                }
                sized.sort_by(|a, b| b.1.total_cmp(&a.1));
                Some(AssetSection::new(
                    day_title(day, self.config.today),
                    sized.into_iter().map(|(id, _)| id.to_string()).collect(),
                    LayoutStyle::FocusGrid,
                ))
            })
            .collect()
    }

    fn screenshots(
        &self,
        assets: &[Asset],
        fingerprints: &HashMap<String, Fingerprint>,
    ) -> Vec<AssetSection> {
        let groups = group_by_fingerprint(assets.iter().filter(|a| a.is_screenshot), fingerprints);

        let mut sections = Vec::new();
        let mut others = Vec::new();
        for group in groups {
            if group.len() >= 2 {
                sections.push(AssetSection::new(
                    format!("{} duplicates", group.len()),
                    group,
                    LayoutStyle::HorizontalStrip,
                ));
            } else {
                others.extend(group);
            }
        }
        // Singletons were collected in group order, which is first-appearance
        // order, i.e. enumeration order.
        if !others.is_empty() {
            sections.push(AssetSection::new(
                OTHER_SECTION_TITLE,
                others,
                LayoutStyle::Grid,
            ));
        }
        sections
    }

    fn duplicates(
        &self,
        assets: &[Asset],
        fingerprints: &HashMap<String, Fingerprint>,
    ) -> Vec<AssetSection> {
        group_by_fingerprint(
            assets.iter().filter(|a| a.media_kind == MediaKind::Image),
            fingerprints,
        )
        .into_iter()
        .filter(|g| g.len() >= 2)
        .map(|g| {
            AssetSection::new(
                format!("{} duplicates", g.len()),
                g,
                LayoutStyle::HorizontalStrip,
            )
        })
        .collect()
    }

    fn similar(&self, assets: &[Asset]) -> Vec<AssetSection> {
        let mut images: Vec<&Asset> = assets
            .iter()
            .filter(|a| a.media_kind == MediaKind::Image)
            .collect();
        images.sort_by(|a, b| b.creation_time.cmp(&a.creation_time));

        let mut sections = Vec::new();
        let mut run: Vec<&Asset> = Vec::new();
        for asset in images {
            let splits = run
                .last()
                .is_some_and(|prev| prev.creation_time - asset.creation_time >= self.config.burst_window);
            if splits {
                push_burst(&mut sections, &run);
                run.clear();
            }
            run.push(asset);
        }
        push_burst(&mut sections, &run);
        sections
    }
}

fn push_burst(sections: &mut Vec<AssetSection>, run: &[&Asset]) {
    if run.len() >= 2 {
        sections.push(AssetSection::new(
            format!("{} similar", run.len()),
            run.iter().map(|a| a.id.clone()).collect(),
            LayoutStyle::HorizontalStrip,
        ));
    }
}

/// Group assets by fingerprint, keeping first-appearance order for groups
/// and source order within a group. Assets without a fingerprint are skipped.
fn group_by_fingerprint<'a>(
    assets: impl Iterator<Item = &'a Asset>,
    fingerprints: &HashMap<String, Fingerprint>,
) -> Vec<Vec<String>> {
    let mut index: HashMap<Fingerprint, usize> = HashMap::new();
    let mut groups: Vec<Vec<String>> = Vec::new();
    for asset in assets {
        let Some(fp) = fingerprints.get(&asset.id) else {
            continue;
        };
        let slot = *index.entry(*fp).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(asset.id.clone());
    }
    groups
}

/// Distinct asset count and size total over all sections.
///
/// Sizes are summed in display order so the total is reproducible bit for bit.
fn totals(sections: &[AssetSection], metadata: &HashMap<String, AssetMetadata>) -> (usize, f64) {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut size = 0.0;
    for id in sections.iter().flat_map(|s| s.assets.iter()) {
        if seen.insert(id.as_str()) {
            size += metadata.get(id).map_or(0.0, |m| m.size_on_disk);
        }
    }
    (seen.len(), size)
}
