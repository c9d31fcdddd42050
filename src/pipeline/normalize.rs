//! Deterministic cleanup of extracted text.
//!
//! Both engines emit layout noise: Tesseract pads lines with spaces and
//! leaves runs of blank lines between blocks, and PDF text layers carry
//! CRLF endings, form feeds and zero-width characters. None of that is
//! content, and all of it would inflate the character count used by the
//! minimum-content check.
//!
//! ## Rule Order
//!
//! Line endings are normalised before anything that splits on `\n`, and
//! invisible characters are removed before blank-line collapsing so a line
//! holding only a BOM counts as blank.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules in order:
/// 1. CRLF / CR / form feed → LF
/// 2. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 3. Trim trailing whitespace per line
/// 4. Collapse 3+ consecutive newlines down to a single blank line
/// 5. Trim the whole string
pub fn normalize_text(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = remove_invisible_chars(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    s.trim().to_string()
}

// ── Rule 1 ───────────────────────────────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input
        .replace("\r\n", "\n")
        .replace(['\r', '\u{000C}'], "\n")
}

// ── Rule 2 ───────────────────────────────────────────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 3 ───────────────────────────────────────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 4 ───────────────────────────────────────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_endings() {
        assert_eq!(normalise_line_endings("a\r\nb\rc\u{000C}d"), "a\nb\nc\nd");
    }

    #[test]
    fn test_trailing_whitespace() {
        assert_eq!(trim_trailing_whitespace("a   \nb\t\n c "), "a\nb\n c");
    }

    #[test]
    fn test_collapse_blank_lines() {
        assert_eq!(collapse_blank_lines("a\n\n\n\n\nb"), "a\n\nb");
        assert_eq!(collapse_blank_lines("a\n\nb"), "a\n\nb");
    }

    #[test]
    fn test_invisible() {
        assert_eq!(remove_invisible_chars("Jo\u{200B}hn\u{FEFF}"), "John");
    }

    #[test]
    fn test_full_normalisation() {
        let raw = "\u{FEFF}  John Doe   \r\n\r\n\r\n\u{200B}\r\nSenior Engineer\t\r\n\n";
        assert_eq!(normalize_text(raw), "John Doe\n\nSenior Engineer");
    }

    #[test]
    fn test_idempotent() {
        let raw = "A  \n\n\n\nB\r\nC";
        let once = normalize_text(raw);
        assert_eq!(normalize_text(&once), once);
    }

    #[test]
    fn test_whitespace_only_becomes_empty() {
        assert_eq!(normalize_text(" \n\t\r\n \u{200B} "), "");
    }
}
