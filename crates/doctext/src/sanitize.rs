//! Helpers for keeping sensitive data out of log records.
//!
//! Extracted text and object keys can carry personal data, so logs only
//! ever see a bounded preview or a redacted form.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Default number of characters kept by [`preview`] in log records.
pub const PREVIEW_CHARS: usize = 500;

/// Returns the final path component of an object key.
///
/// - `uploads/2024/alice-cv.pdf` → `alice-cv.pdf`
/// - `` → `<unknown>`
pub fn redact_key(key: &str) -> String {
    match key.rsplit('/').next() {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => "<unknown>".to_string(),
    }
}

/// Truncates `text` to at most `max_chars` characters, marking the cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}… ({} chars total)", &text[..cut], text.chars().count()),
        None => text.to_string(),
    }
}

/// Short deterministic fingerprint of a value, for correlating log lines
/// without printing the value itself.
pub fn fingerprint(value: &str) -> String {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}
