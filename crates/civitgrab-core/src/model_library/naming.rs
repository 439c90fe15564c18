//! Filesystem-safe name normalization.
//!
//! Model and version names come from users and from the remote service and
//! end up as path segments, so they are bounded and reduced to a small
//! character set before use.

use crate::config::LayoutConfig;
use regex::Regex;
use std::sync::LazyLock;

/// Runs of whitespace.
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Anything but ASCII letters, digits, space, hyphen and underscore.
static DISALLOWED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^0-9A-Za-z \-_]").unwrap());

/// Trim and collapse internal whitespace runs to single spaces.
///
/// # Examples
///
/// ```
/// use civitgrab_core::model_library::shrink_whitespace;
///
/// assert_eq!(shrink_whitespace("  Juggernaut \t XL  "), "Juggernaut XL");
/// ```
pub fn shrink_whitespace(input: &str) -> String {
    WHITESPACE.replace_all(input.trim(), " ").into_owned()
}

/// Trim and cut to at most `max_length` characters.
pub fn trim_length(input: &str, max_length: usize) -> String {
    input.trim().chars().take(max_length).collect()
}

/// Normalize a name for use as a path segment.
///
/// # Rules Applied
/// 1. Trim and cut to `max_length` characters
/// 2. Replace `.` with `_`
/// 3. Drop everything but ASCII letters, digits, space, `-` and `_`
/// 4. Collapse whitespace runs and trim
///
/// The cut happens before stripping, so the result may be shorter than
/// `max_length` but never longer.
///
/// # Examples
///
/// ```
/// use civitgrab_core::model_library::clean_string;
///
/// assert_eq!(clean_string("SDXL 1.0 (Base)!", 30), "SDXL 1_0 Base");
/// assert_eq!(clean_string("abcdefghij", 4), "abcd");
/// ```
pub fn clean_string(input: &str, max_length: usize) -> String {
    let short = trim_length(input, max_length).replace('.', "_");
    let stripped = DISALLOWED.replace_all(&short, "");
    shrink_whitespace(&stripped)
}

/// [`clean_string`] with the default length bound.
pub fn clean_name(input: &str) -> String {
    clean_string(input, LayoutConfig::NAME_MAX_LENGTH)
}

/// First letter upper case, the rest lower case.
pub fn capitalize(input: &str) -> String {
    let mut chars = input.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}
