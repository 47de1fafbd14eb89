//! Quoting of text values for the dump format

/// Escape `text` so it can be embedded between single quotes in a dump.
///
/// Backslash, single quote, double quote, newline and carriage return are
/// backslash-escaped. NUL bytes are dropped: the literal syntax cannot carry
/// them. Apply exactly once per value; escaping is not idempotent.
///
/// # Examples
///
/// ```rust
/// use tidalcore_backup::escape::escape;
///
/// assert_eq!(escape("O'Brien"), "O\\'Brien");
/// assert_eq!(escape("a\nb"), "a\\nb");
/// ```
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + text.len() / 8);

    for c in text.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\'' => escaped.push_str("\\'"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\0' => {}
            other => escaped.push(other),
        }
    }

    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_untouched() {
        assert_eq!(escape("alice_01"), "alice_01");
        assert_eq!(escape("潮汐 🌊"), "潮汐 🌊");
        assert_eq!(escape(""), "");
    }

    #[test]
    fn test_each_special_character() {
        assert_eq!(escape("a\\b"), "a\\\\b");
        assert_eq!(escape("it's"), "it\\'s");
        assert_eq!(escape("say \"hi\""), "say \\\"hi\\\"");
        assert_eq!(escape("l1\r\nl2"), "l1\\r\\nl2");
    }

    #[test]
    fn test_nul_is_dropped_not_escaped() {
        assert_eq!(escape("ab\0cd"), "abcd");
        assert_eq!(escape("\0\0"), "");
    }

    #[test]
    fn test_backslash_escaped_before_quote() {
        // A quote's escaping backslash must not itself be doubled.
        assert_eq!(escape("\\'"), "\\\\\\'");
    }

    #[test]
    fn test_semicolon_passes_through() {
        assert_eq!(escape("a;b"), "a;b");
    }
}
