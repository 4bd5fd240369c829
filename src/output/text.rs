//! Plain-text rendering for the terminal.

use std::io::{self, Write};

use crate::classify::{format_size, summarize, CategoryView};
use crate::sync::SyncReport;

/// Write a one-paragraph summary of a sync pass.
pub fn write_sync_report<W: Write>(w: &mut W, report: &SyncReport) -> io::Result<()> {
    if report.is_noop() {
        writeln!(w, "Up to date: no assets changed since the last sync.")?;
        return Ok(());
    }
    writeln!(
        w,
        "Synced {} changed assets: {} sizes, {} fingerprints.",
        report.changed_assets, report.metadata_updated, report.pipeline.fingerprinted
    )?;
    if report.has_failures() {
        writeln!(
            w,
            "{} assets failed and will be retried on the next sync.",
            report.metadata_failed + report.pipeline.failed
        )?;
    }
    if let Some(watermark) = report.new_watermark {
        writeln!(w, "Watermark: {}", watermark.to_rfc3339())?;
    }
    Ok(())
}

/// Write every section of each view.
pub fn write_views<W: Write>(w: &mut W, views: &[CategoryView]) -> io::Result<()> {
    for (i, view) in views.iter().enumerate() {
        if i > 0 {
            writeln!(w)?;
        }
        writeln!(
            w,
            "== {} ({} items, {}) ==",
            view.category.title(),
            view.total_items,
            format_size(view.total_size)
        )?;
        if view.sections.is_empty() {
            writeln!(w, "  (empty)")?;
        }
        for section in &view.sections {
            writeln!(w, "-- {} --", section.title)?;
            for id in &section.assets {
                writeln!(w, "  {id}")?;
            }
        }
    }
    Ok(())
}

/// Write an aligned items/size table, one row per view.
pub fn write_summary<W: Write>(w: &mut W, views: &[CategoryView]) -> io::Result<()> {
    let rows = summarize(views);
    let width = rows
        .iter()
        .map(|r| r.category.title().len())
        .max()
        .unwrap_or(0);
    for row in rows {
        writeln!(
            w,
            "{:<width$}  {:>7} items  {:>12}",
            row.category.title(),
            row.total_items,
            format_size(row.total_size),
        )?;
    }
    Ok(())
}
