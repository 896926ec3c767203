//! Rough token accounting and truncation for tool output.

/// Characters per token used by the estimator.
const CHARS_PER_TOKEN: usize = 4;

pub const TRUNCATION_MARKER: &str = "... (truncated)";

/// Estimate the token count of `text` (one token per four characters).
pub fn count_tokens(text: &str) -> usize {
    text.chars().count() / CHARS_PER_TOKEN
}

/// Keep at most `max_tokens * 4` characters of `text`, appending
/// [`TRUNCATION_MARKER`] when anything was cut.
///
/// Returns the (possibly shortened) text and whether it was truncated.
pub fn truncate_text(text: &str, max_tokens: usize) -> (String, bool) {
    let max_chars = max_tokens.saturating_mul(CHARS_PER_TOKEN);
    match text.char_indices().nth(max_chars) {
        None => (text.to_string(), false),
        Some((cutoff, _)) => {
            let mut out = String::with_capacity(cutoff + TRUNCATION_MARKER.len());
            out.push_str(&text[..cutoff]);
            out.push_str(TRUNCATION_MARKER);
            (out, true)
        }
    }
}

/// Cut `s` to at most `max_bytes`, backing off to a char boundary.
pub fn truncate_utf8(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }

    let mut cutoff = max_bytes;
    while cutoff > 0 && !s.is_char_boundary(cutoff) {
        cutoff -= 1;
    }
    &s[..cutoff]
}
