//! Low-level HTML scanning helpers.
//!
//! The gazette sites serve small, regular table markup. Elements are located
//! by tag name on an ASCII-lowercased copy of the document, which keeps byte
//! offsets aligned with the original text.

use std::sync::LazyLock;

use regex::{Captures, Regex};

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([a-zA-Z_:][-a-zA-Z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .expect("valid regex")
});

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|[a-zA-Z][a-zA-Z0-9]*);").expect("valid regex")
});

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static LINE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").expect("valid regex"));

/// Elements whose closing tag is optional in HTML: a sibling start tag ends them.
const IMPLICITLY_CLOSED: [&str; 6] = ["li", "option", "p", "td", "th", "tr"];

/// Elements that never have content.
const VOID: [&str; 6] = ["br", "hr", "img", "input", "link", "meta"];

/// An element found in a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Element<'a> {
    /// The start tag including `<` and `>`.
    pub open_tag: &'a str,

    /// Everything between start and end tag.
    pub inner: &'a str,
}

impl<'a> Element<'a> {
    /// Value of an attribute, entities decoded.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<String> {
        ATTRIBUTE
            .captures_iter(self.open_tag)
            .find(|caps| caps[1].eq_ignore_ascii_case(name))
            .map(|caps| {
                let value = caps
                    .get(2)
                    .or_else(|| caps.get(3))
                    .or_else(|| caps.get(4))
                    .map_or("", |m| m.as_str());
                decode_entities(value)
            })
    }

    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }

    /// Descendant elements with the given tag name (outermost only).
    #[must_use]
    pub fn find_all(&self, tag: &str) -> Vec<Element<'a>> {
        elements(self.inner, tag)
    }

    #[must_use]
    pub fn find(&self, tag: &str) -> Option<Element<'a>> {
        self.find_all(tag).into_iter().next()
    }

    /// Text content with tags removed, entities decoded and whitespace kept.
    #[must_use]
    pub fn raw_text(&self) -> String {
        decode_entities(&strip_tags(self.inner))
    }

    /// Text content with whitespace collapsed.
    #[must_use]
    pub fn text(&self) -> String {
        normalize_ws(&self.raw_text())
    }

    /// Text content split at `<br>` and line breaks; lines are trimmed and
    /// empty ones dropped.
    #[must_use]
    pub fn text_lines(&self) -> Vec<String> {
        let broken = LINE_BREAK.replace_all(self.inner, "\n");
        decode_entities(&strip_tags(&broken))
            .lines()
            .map(normalize_ws)
            .filter(|line| !line.is_empty())
            .collect()
    }
}

/// All outermost elements with the given tag name, in document order.
///
/// Unclosed elements extend to the end of `html`, or, for elements with an
/// optional end tag, to the next start tag of the same name.
pub fn elements<'a>(html: &'a str, tag: &str) -> Vec<Element<'a>> {
    let lc = to_lowercase_fast(html);
    let tag = to_lowercase_fast(tag);
    let open_pat = format!("<{tag}");
    let close_pat = format!("</{tag}");
    let implicit = IMPLICITLY_CLOSED.contains(&tag.as_str());
    let void = VOID.contains(&tag.as_str());

    let mut found = Vec::new();
    let mut pos = 0;
    while let Some(start) = find_start_tag(&lc, &open_pat, pos) {
        let Some(open_len) = html[start..].find('>') else {
            break;
        };
        let open_end = start + open_len + 1;
        let open_tag = &html[start..open_end];
        if void || open_tag.ends_with("/>") {
            found.push(Element {
                open_tag,
                inner: "",
            });
            pos = open_end;
            continue;
        }

        let (inner_end, end) = find_end(&lc, &open_pat, &close_pat, open_end, implicit);
        found.push(Element {
            open_tag,
            inner: &html[open_end..inner_end],
        });
        pos = end;
    }
    found
}

/// First element with the given tag name carrying an attribute value.
pub fn find_with_attr<'a>(html: &'a str, tag: &str, name: &str, value: &str) -> Option<Element<'a>> {
    elements(html, tag)
        .into_iter()
        .find(|element| element.attr(name).as_deref() == Some(value))
}

/// The element carrying the given `id`, whatever its tag name.
pub fn find_by_id<'a>(html: &'a str, id: &str) -> Option<Element<'a>> {
    let pattern = format!(
        r#"<([a-zA-Z][a-zA-Z0-9]*)[^>]*\bid\s*=\s*["']?{}["'\s>/]"#,
        regex::escape(id)
    );
    let re = Regex::new(&pattern).ok()?;
    let caps = re.captures(html)?;
    let start = caps.get(0)?.start();
    elements(&html[start..], &caps[1]).into_iter().next()
}

/// All elements with the given tag name and class, at any depth.
pub fn descendants_with_class<'a>(html: &'a str, tag: &str, class: &str) -> Vec<Element<'a>> {
    let mut found = Vec::new();
    for element in elements(html, tag) {
        if element.has_class(class) {
            found.push(element);
        } else {
            found.extend(descendants_with_class(element.inner, tag, class));
        }
    }
    found
}

/// Byte offset of the next `<tag` followed by a tag-name boundary.
fn find_start_tag(lc: &str, open_pat: &str, from: usize) -> Option<usize> {
    let mut pos = from;
    loop {
        let start = lc.get(pos..)?.find(open_pat)? + pos;
        let after = start + open_pat.len();
        match lc[after..].chars().next() {
            Some(c) if c.is_ascii_whitespace() || c == '>' || c == '/' => return Some(start),
            None => return None,
            Some(_) => pos = after,
        }
    }
}

/// Returns (end of inner content, end of element) for an element whose start
/// tag ends at `from`.
fn find_end(lc: &str, open_pat: &str, close_pat: &str, from: usize, implicit: bool) -> (usize, usize) {
    let mut depth = 1usize;
    let mut cursor = from;
    loop {
        let next_open = find_start_tag(lc, open_pat, cursor);
        let Some(close) = lc[cursor..].find(close_pat).map(|rel| rel + cursor) else {
            let end = next_open.filter(|_| implicit).unwrap_or(lc.len());
            return (end, end);
        };

        match next_open {
            Some(open) if open < close && implicit && depth == 1 => return (open, open),
            Some(open) if open < close => {
                depth += 1;
                cursor = open + open_pat.len();
            }
            _ => {
                depth -= 1;
                let close_end = lc[close..].find('>').map_or(lc.len(), |rel| close + rel + 1);
                if depth == 0 {
                    return (close, close_end);
                }
                cursor = close_end;
            }
        }
    }
}

/// Remove all tags, keeping whitespace as is.
pub fn strip_tags(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;
    for ch in s.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out
}

/// Decode numeric and common named character references.
///
/// # Examples
/// ```
/// use gesetze_gazette::html::decode_entities;
///
/// assert_eq!(decode_entities("Stra&szlig;e &amp; Br&#252;cke"), "Straße & Brücke");
/// assert_eq!(decode_entities("&unknown;"), "&unknown;");
/// ```
pub fn decode_entities(s: &str) -> String {
    ENTITY
        .replace_all(s, |caps: &Captures<'_>| {
            let entity = &caps[1];
            let decoded = if let Some(hex) = entity.strip_prefix("#x").or_else(|| entity.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = entity.strip_prefix('#') {
                dec.parse().ok().and_then(char::from_u32)
            } else {
                named_entity(entity)
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}

fn named_entity(name: &str) -> Option<char> {
    let c = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        "auml" => 'ä',
        "ouml" => 'ö',
        "uuml" => 'ü',
        "Auml" => 'Ä',
        "Ouml" => 'Ö',
        "Uuml" => 'Ü',
        "szlig" => 'ß',
        "sect" => '§',
        "euro" => '€',
        "ndash" => '–',
        "mdash" => '—',
        "bdquo" => '„',
        "ldquo" => '“',
        "rdquo" => '”',
        _ => return None,
    };
    Some(c)
}

/// Collapse runs of whitespace into a single space and trim.
pub fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// ASCII-only lowercasing; byte offsets stay valid for the original string.
pub fn to_lowercase_fast(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii() { c.to_ascii_lowercase() } else { c })
        .collect()
}
