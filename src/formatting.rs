//! Formatting utilities for displaying comparison results
//!
//! Sizes are rendered as magnitudes only; the sign of a delta is produced
//! separately by [`sign`] so callers can place it wherever the report layout
//! wants it.

/// Format the magnitude of a byte count into B, KB, MB or GB
///
/// The sign of `bytes` is ignored. Values under one kilobyte keep a single
/// trailing decimal, everything larger is shown with two decimals.
///
/// # Examples
/// ```
/// use apk_compare::formatting::human_readable_size;
///
/// assert_eq!(human_readable_size(512), "512.0 B");
/// assert_eq!(human_readable_size(1536), "1.50 KB");
/// assert_eq!(human_readable_size(-1048576), "1.00 MB");
/// ```
pub fn human_readable_size(bytes: i64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * KB;
    const GB: f64 = KB * KB * KB;

    let bytes = bytes.unsigned_abs() as f64;

    if bytes < KB {
        format!("{bytes:.1} B")
    } else if bytes < MB {
        format!("{:.2} KB", bytes / KB)
    } else if bytes < GB {
        format!("{:.2} MB", bytes / MB)
    } else {
        format!("{:.2} GB", bytes / GB)
    }
}

/// The sign glyph of a delta: nothing for zero, otherwise `-` or `+`
///
/// # Examples
/// ```
/// use apk_compare::formatting::sign;
///
/// assert_eq!(sign(0), "");
/// assert_eq!(sign(-5), "-");
/// assert_eq!(sign(5), "+");
/// ```
pub fn sign(value: i64) -> &'static str {
    match value {
        0 => "",
        v if v < 0 => "-",
        _ => "+",
    }
}

/// Format a byte delta with its sign glyph in front, e.g. `+2.05 KB`
///
/// # Examples
/// ```
/// use apk_compare::formatting::format_size_diff;
///
/// assert_eq!(format_size_diff(2100), "+2.05 KB");
/// assert_eq!(format_size_diff(-2048), "-2.00 KB");
/// assert_eq!(format_size_diff(0), "0.0 B");
/// ```
pub fn format_size_diff(diff: i64) -> String {
    format!("{}{}", sign(diff), human_readable_size(diff))
}

/// Format a size difference with appropriate styling for terminal output
///
/// This function is only available with the "cli" feature enabled.
#[cfg(feature = "cli")]
pub fn format_size_diff_styled(diff: i64) -> String {
    use owo_colors::OwoColorize;

    let base = format_size_diff(diff);
    if diff > 0 {
        base.red().to_string()
    } else if diff < 0 {
        base.green().to_string()
    } else {
        base.bright_black().to_string()
    }
}
