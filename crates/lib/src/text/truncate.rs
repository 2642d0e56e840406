//! Character-based truncation that never splits a UTF-8 code point.

/// Appended to replies that were cut at the ceiling.
pub const TRUNCATION_MARKER: &str = " [...]";

/// The first `max` characters of `s`.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// `s` unchanged when it fits in `ceiling` characters, otherwise the first `ceiling`
/// characters followed by [`TRUNCATION_MARKER`].
pub fn truncate(s: &str, ceiling: usize) -> String {
    let cut = truncate_chars(s, ceiling);
    if cut.len() == s.len() {
        return s.to_string();
    }
    let mut out = String::with_capacity(cut.len() + TRUNCATION_MARKER.len());
    out.push_str(cut);
    out.push_str(TRUNCATION_MARKER);
    out
}
