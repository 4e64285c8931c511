//! Shared utility functions for CLI commands

/// Shorten a hex digest for display
///
/// Returns the entire string if it's shorter than `max_len`.
#[must_use]
pub fn short_digest(digest: &str, max_len: usize) -> &str {
    digest.get(..max_len).unwrap_or(digest)
}

/// `1 version`, `2 versions`
#[must_use]
pub fn count(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("{} {}", n, noun)
    } else {
        format!("{} {}s", n, noun)
    }
}
