//! Content-Type selection for served files
//!
//! The controller only distinguishes CSV from everything else.

/// Get Content-Type from a file name: `text/csv` for a `.csv` suffix
/// (case-insensitive), `text/plain` otherwise
///
/// # Examples
/// ```
/// use kwal_csv_server::http::mime::get_content_type;
/// assert_eq!(get_content_type("light_colors.csv"), "text/csv");
/// assert_eq!(get_content_type("LEDMAP.CSV"), "text/csv");
/// assert_eq!(get_content_type("ledmap.bin"), "text/plain");
/// ```
pub fn get_content_type(file_name: &str) -> &'static str {
    if file_name.to_ascii_lowercase().ends_with(".csv") {
        "text/csv"
    } else {
        "text/plain"
    }
}
