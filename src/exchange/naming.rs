//! Filename validation and archive naming

use chrono::NaiveDateTime;

/// Timestamp inserted between base name and extension of an archived version
const ARCHIVE_STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// A managed filename must be non-empty and contain neither `/` nor `..`
pub fn is_safe_filename(name: &str) -> bool {
    !name.is_empty() && !name.contains('/') && !name.contains("..")
}

/// Split a filename into base and extension (extension keeps its dot).
///
/// Leading dots belong to the base, so `.hidden` has no extension.
pub fn split_extension(name: &str) -> (&str, &str) {
    let leading = name.len() - name.trim_start_matches('.').len();
    match name[leading..].rfind('.') {
        Some(idx) => name.split_at(leading + idx),
        None => (name, ""),
    }
}

/// Build `{base}_{YYYYMMDD_HHMMSS}{ext}` for a history entry
pub fn archive_name(name: &str, at: NaiveDateTime) -> String {
    let (base, ext) = split_extension(name);
    format!("{base}_{}{ext}", at.format(ARCHIVE_STAMP_FORMAT))
}

/// Same as [`archive_name`] with a counter, used when two versions land in the same second
pub fn archive_name_with_counter(name: &str, at: NaiveDateTime, counter: u32) -> String {
    let (base, ext) = split_extension(name);
    format!("{base}_{}_{counter}{ext}", at.format(ARCHIVE_STAMP_FORMAT))
}
