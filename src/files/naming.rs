//! Output file and run directory naming.
//!
//! Batch outputs are named after the dataset's short name with a zero-padded
//! file index, and optionally grouped in a timestamped run directory:
//!
//! ```text
//! DYJetsToLL_18Oct26_1430_002_v2/
//!     DYJetsToLL_007.json
//! ```

use chrono::{DateTime, TimeZone};
use deunicode::deunicode;

/// Characters that are invalid in filenames on common filesystems.
const INVALID_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Used when sanitization leaves nothing.
const FALLBACK_NAME: &str = "dataset";

/// Longest short name kept in generated names.
const MAX_SHORT_NAME_LENGTH: usize = 100;

/// strftime layout of the run directory timestamp, e.g. `18Oct26_1430`.
pub const RUN_TIMESTAMP_FORMAT: &str = "%d%b%y_%H%M";

/// Extension of skim outputs.
pub const OUTPUT_EXTENSION: &str = "json";

/// Make `input` safe to use as a file or directory name component.
///
/// Unicode is transliterated to ASCII, whitespace runs become one hyphen,
/// filesystem-invalid characters are dropped, and leading or trailing dots
/// and hyphens are trimmed. The result is at most 100 characters long.
pub fn sanitize(input: &str) -> String {
    let ascii = deunicode(input);

    let mut result = String::with_capacity(ascii.len());
    let mut last_was_hyphen = false;

    for c in ascii.chars() {
        if c.is_whitespace() || c == '-' {
            if !last_was_hyphen {
                result.push('-');
                last_was_hyphen = true;
            }
        } else if INVALID_CHARS.contains(&c) {
            continue;
        } else if c.is_ascii_alphanumeric() || c == '_' || c == '.' {
            result.push(c);
            last_was_hyphen = false;
        }
    }

    let trimmed = result.trim_matches(|c| c == '.' || c == '-');
    let truncated: String = trimmed.chars().take(MAX_SHORT_NAME_LENGTH).collect();
    if truncated.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        truncated
    }
}

/// Decimal digits needed to print `n`; zero needs one.
pub fn digit_count(n: usize) -> usize {
    n.checked_ilog10().map_or(1, |log| log as usize + 1)
}

/// `{short_name}_{index}.json` with the index padded to the width of `total`.
pub fn output_file_name(short_name: &str, index: usize, total: usize) -> String {
    format!(
        "{}_{:0width$}.{}",
        sanitize(short_name),
        index,
        OUTPUT_EXTENSION,
        width = digit_count(total)
    )
}

/// `{short_name}_{timestamp}_{key_index:03}[_{suffix}]`.
///
/// `key_index` is the dataset's position in the dataset document.
pub fn run_directory_name<Tz>(
    short_name: &str,
    key_index: usize,
    suffix: Option<&str>,
    at: &DateTime<Tz>,
) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let mut name = format!(
        "{}_{}_{:03}",
        sanitize(short_name),
        at.format(RUN_TIMESTAMP_FORMAT),
        key_index
    );
    if let Some(suffix) = suffix.filter(|s| !s.is_empty()) {
        name.push('_');
        name.push_str(&sanitize(suffix));
    }
    name
}
