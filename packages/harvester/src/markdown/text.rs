//! Text wrapping and escaping utilities for Markdown output.

use std::sync::LazyLock;

use regex::Regex;
use textwrap::{wrap, Options};

/// Placeholder for a hard line break inside collected inline text.
pub const HARD_BREAK: char = '\u{E000}';

/// A number followed by a dot at the start of a line starts an ordered list.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static LIST_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\.").expect("valid regex"));

/// Escape characters that Markdown would read as emphasis.
///
/// # Examples
/// ```
/// use gesetze_harvester::markdown::escape_emphasis;
///
/// assert_eq!(escape_emphasis("a_b *c*"), r"a\_b \*c\*");
/// ```
pub fn escape_emphasis(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c == '*' || c == '_' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Collapse whitespace runs to single spaces and trim, keeping hard breaks.
pub fn collapse_whitespace(text: &str) -> String {
    let separator = HARD_BREAK.to_string();
    text.split(HARD_BREAK)
        .map(|segment| segment.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join(separator.as_str())
        .trim_matches(|c: char| c.is_whitespace() || c == HARD_BREAK)
        .to_string()
}

/// Escape a leading `N.` so a wrapped line does not become a list item.
///
/// # Examples
/// ```
/// use gesetze_harvester::markdown::escape_list_start;
///
/// assert_eq!(escape_list_start("2020. Jahr"), r"2020\. Jahr");
/// assert_eq!(escape_list_start("Jahr 2020."), "Jahr 2020.");
/// ```
pub fn escape_list_start(line: &str) -> String {
    LIST_START.replace(line, "$1\\.").into_owned()
}

/// Wrap a paragraph at `width` columns with the given indentation.
///
/// Hard breaks split the paragraph into segments; every segment but the last
/// ends with a Markdown hard break (`\`).
pub fn wrap_paragraph(text: &str, width: usize, indent: &str) -> Vec<String> {
    let text = collapse_whitespace(text);
    if text.is_empty() {
        return Vec::new();
    }

    let segments: Vec<&str> = text
        .split(HARD_BREAK)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    let options = Options::new(width.saturating_sub(indent.len()).max(20))
        .break_words(false);

    let mut lines = Vec::new();
    for (i, segment) in segments.iter().enumerate() {
        let mut wrapped: Vec<String> = wrap(segment, &options)
            .iter()
            .map(|line| format!("{indent}{}", escape_list_start(line)))
            .collect();
        if i + 1 < segments.len() {
            if let Some(last) = wrapped.last_mut() {
                last.push('\\');
            }
        }
        lines.extend(wrapped);
    }
    lines
}

/// Replace the indentation of the first non-empty line with a list marker.
///
/// `lines` are rendered at `content_indent`; the marker goes at `indent` and
/// is padded so the item text lines up with the following lines where
/// possible. At least one space always follows the marker.
pub fn attach_marker(lines: &mut Vec<String>, marker: &str, indent: &str, content_indent: &str) {
    let width = content_indent.len().saturating_sub(indent.len());
    let pad = width.saturating_sub(marker.chars().count()).max(1);
    let prefix = format!("{indent}{marker}{}", " ".repeat(pad));

    match lines.iter_mut().find(|line| !line.trim().is_empty()) {
        Some(first) => {
            let rest = first
                .strip_prefix(content_indent)
                .unwrap_or_else(|| first.trim_start())
                .to_string();
            *first = format!("{prefix}{rest}");
        }
        None => lines.insert(0, format!("{indent}{marker}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  a \n\t b  "), "a b");
        let with_break = format!("a {HARD_BREAK}  b {HARD_BREAK}");
        assert_eq!(collapse_whitespace(&with_break), format!("a{HARD_BREAK}b"));
    }

    #[test]
    fn test_wrap_paragraph_width() {
        let text = "Die Rechtsfähigkeit des Menschen beginnt mit der Vollendung der Geburt und endet mit dem Tod.";
        let lines = wrap_paragraph(text, 70, "");
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| l.chars().count() <= 70));
    }

    #[test]
    fn test_wrap_paragraph_hard_breaks() {
        let text = format!("Erste Zeile{HARD_BREAK}Zweite Zeile");
        assert_eq!(
            wrap_paragraph(&text, 70, "    "),
            vec!["    Erste Zeile\\", "    Zweite Zeile"]
        );
    }

    #[test]
    fn test_wrap_paragraph_escapes_list_start() {
        let lines = wrap_paragraph("1. Januar", 70, "");
        assert_eq!(lines, vec![r"1\. Januar"]);
    }

    #[test]
    fn test_attach_marker() {
        let mut lines = vec!["        text".to_string(), "        more".to_string()];
        attach_marker(&mut lines, "1.", "    ", "        ");
        assert_eq!(lines, vec!["    1.  text", "        more"]);
    }

    #[test]
    fn test_attach_marker_long_marker() {
        let mut lines = vec!["    text".to_string()];
        attach_marker(&mut lines, "(10)", "", "    ");
        assert_eq!(lines, vec!["(10) text"]);
    }

    #[test]
    fn test_attach_marker_empty_item() {
        let mut lines = Vec::new();
        attach_marker(&mut lines, "a)", "", "    ");
        assert_eq!(lines, vec!["a)"]);
    }
}
