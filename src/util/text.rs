use std::borrow::Cow;

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Appended to text cut short by [`truncate_to_width`].
const ELLIPSIS: char = '…';

/// Display width of `s` in terminal columns, with wide CJK and emoji
/// counting as two.
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Shortens `s` to at most `max_width` columns, ending in `…` when cut.
///
/// Cuts happen on character boundaries. A trailing space left by the cut is
/// dropped before the ellipsis. Text that already fits is borrowed.
///
/// # Examples
///
/// ```
/// use feedmill::util::truncate_to_width;
///
/// assert_eq!(truncate_to_width("Short", 10), "Short");
/// assert_eq!(truncate_to_width("Hello World", 8), "Hello W…");
/// assert_eq!(truncate_to_width("Hello", 0), "");
/// ```
pub fn truncate_to_width(s: &str, max_width: usize) -> Cow<'_, str> {
    if display_width(s) <= max_width {
        return Cow::Borrowed(s);
    }
    if max_width == 0 {
        return Cow::Borrowed("");
    }

    let budget = max_width - 1;
    let mut used = 0;
    let mut end = 0;
    for (idx, c) in s.char_indices() {
        let w = c.width().unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        end = idx + c.len_utf8();
    }

    let mut out = s[..end].trim_end().to_owned();
    out.push(ELLIPSIS);
    Cow::Owned(out)
}

/// Removes control characters other than tab, newline and carriage return.
///
/// Escape sequences lose their `ESC` byte but keep their printable tail,
/// which is harmless once the text is no longer sent to a terminal.
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    let is_unwanted = |c: char| c.is_control() && !matches!(c, '\t' | '\n' | '\r');
    if !s.chars().any(is_unwanted) {
        return Cow::Borrowed(s);
    }
    Cow::Owned(s.chars().filter(|&c| !is_unwanted(c)).collect())
}

/// Joins runs of whitespace into single spaces and trims both ends.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_fits() {
        assert!(matches!(truncate_to_width("fits", 4), Cow::Borrowed("fits")));
    }

    #[test]
    fn test_truncate_adds_ellipsis() {
        assert_eq!(truncate_to_width("The quick brown fox", 10), "The quick…");
        assert_eq!(display_width(&truncate_to_width("The quick brown fox", 10)), 10);
    }

    #[test]
    fn test_truncate_drops_trailing_space() {
        assert_eq!(truncate_to_width("ab cd", 4), "ab…");
    }

    #[test]
    fn test_truncate_wide_chars() {
        let out = truncate_to_width("日本語のテキスト", 7);
        assert_eq!(out, "日本語…");
        assert!(display_width(&out) <= 7);
    }

    #[test]
    fn test_truncate_width_one() {
        assert_eq!(truncate_to_width("abc", 1), "…");
    }

    #[test]
    fn test_strip_control_chars() {
        assert!(matches!(strip_control_chars("plain\ttext\n"), Cow::Borrowed(_)));
        assert_eq!(strip_control_chars("a\u{0}b\u{1b}[31mc\u{7f}"), "ab[31mc");
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  a \n\t b  c "), "a b c");
        assert_eq!(collapse_whitespace(" \n "), "");
    }
}
