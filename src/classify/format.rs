//! Display helpers for section titles and byte totals.

use chrono::NaiveDate;

const KB: f64 = 1024.0;
const MB: f64 = KB * 1024.0;
const GB: f64 = MB * 1024.0;

/// Format a byte count as `x.xx GB`, `x.xx MB` or `x.xx KB`.
///
/// Sizes below one megabyte are always shown in kilobytes, even when
/// smaller than one kilobyte.
#[must_use]
pub fn format_size(bytes: f64) -> String {
    if bytes >= GB {
        format!("{:.2} GB", bytes / GB)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes / MB)
    } else {
        format!("{:.2} KB", bytes / KB)
    }
}

/// Title for a day section: `Today`, `Yesterday`, or `dd Mon yyyy`.
#[must_use]
pub fn day_title(day: NaiveDate, today: NaiveDate) -> String {
    if day == today {
        "Today".to_string()
    } else if today.pred_opt() == Some(day) {
        "Yesterday".to_string()
    } else {
        day.format("%d %b %Y").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size_units() {
        assert_eq!(format_size(512.0), "0.50 KB");
        assert_eq!(format_size(1536.0), "1.50 KB");
        assert_eq!(format_size(5.0 * MB), "5.00 MB");
        assert_eq!(format_size(2.25 * GB), "2.25 GB");
    }

    #[test]
    fn test_day_title() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 3).unwrap();
        assert_eq!(day_title(today, today), "Today");
        assert_eq!(
            day_title(NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(), today),
            "Yesterday"
        );
        assert_eq!(
            day_title(NaiveDate::from_ymd_opt(2024, 2, 28).unwrap(), today),
            "28 Feb 2024"
        );
    }
}
