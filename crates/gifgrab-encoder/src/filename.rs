//! Output file naming.

use std::path::PathBuf;

/// Name used when the user leaves the file name empty.
pub const DEFAULT_FILENAME: &str = "output.gif";

/// Turn raw user input into an output file name.
///
/// Empty input yields `default`; a missing `.gif` extension (checked
/// case-insensitively) is appended.
pub fn normalize_filename(input: &str, default: &str) -> PathBuf {
    let name = input.trim();
    if name.is_empty() {
        return PathBuf::from(default);
    }

    if name.to_ascii_lowercase().ends_with(".gif") {
        PathBuf::from(name)
    } else {
        PathBuf::from(format!("{name}.gif"))
    }
}
