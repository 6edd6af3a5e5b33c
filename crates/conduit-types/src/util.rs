//! Utility functions for safe string handling.

/// Find the largest byte index <= `i` that is on a UTF-8 char boundary.
fn floor_char_boundary(s: &str, i: usize) -> usize {
    if i >= s.len() {
        return s.len();
    }
    let mut pos = i;
    while pos > 0 && !s.is_char_boundary(pos) {
        pos -= 1;
    }
    pos
}

/// Truncate `&str` to at most `max_bytes`, never splitting a UTF-8 codepoint.
pub fn truncate_str(s: &str, max_bytes: usize) -> &str {
    &s[..floor_char_boundary(s, max_bytes)]
}

/// Single-line preview of `s` for terminal output: newlines collapsed to
/// spaces, cut at `max_bytes` with a trailing `...` when anything was dropped.
pub fn preview(s: &str, max_bytes: usize) -> String {
    let flat = s.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.len() <= max_bytes {
        return flat;
    }
    format!("{}...", truncate_str(&flat, max_bytes.saturating_sub(3)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_str_short() {
        assert_eq!(truncate_str("hello", 10), "hello");
    }

    #[test]
    fn truncate_str_emoji() {
        let s = "\u{1F600}\u{1F601}\u{1F602}"; // 12 bytes
        assert_eq!(truncate_str(s, 5), "\u{1F600}");
        assert_eq!(truncate_str(s, 8), "\u{1F600}\u{1F601}");
    }

    #[test]
    fn preview_keeps_short_text() {
        assert_eq!(preview("7", 40), "7");
    }

    #[test]
    fn preview_flattens_lines() {
        assert_eq!(preview("a\nb\n  c", 40), "a b c");
    }

    #[test]
    fn preview_cuts_long_text() {
        let p = preview(&"x".repeat(100), 20);
        assert_eq!(p.len(), 20);
        assert!(p.ends_with("..."));
    }

    #[test]
    fn preview_is_unicode_safe() {
        let p = preview(&"\u{4e16}".repeat(30), 10);
        assert!(p.ends_with("..."));
    }
}
