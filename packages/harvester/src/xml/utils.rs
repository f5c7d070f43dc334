//! XML utility functions for navigating and extracting data from DOM trees.

use roxmltree::{Document, Node, ParsingOptions};

use crate::error::{HarvesterError, Result};

/// Parse a law document.
///
/// The published XML carries a `DOCTYPE` referencing an external DTD, so DTDs
/// are allowed (but never fetched).
///
/// # Examples
/// ```
/// use gesetze_harvester::xml::parse_document;
///
/// let xml = r#"<!DOCTYPE dokumente SYSTEM "gii-norm.dtd"><dokumente/>"#;
/// let doc = parse_document(xml, "bgb").unwrap();
/// assert_eq!(doc.root_element().tag_name().name(), "dokumente");
///
/// assert!(parse_document("<dokumente>", "bgb").is_err());
/// ```
pub fn parse_document<'input>(xml: &'input str, document: &str) -> Result<Document<'input>> {
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    Document::parse_with_options(xml, options).map_err(|e| HarvesterError::MalformedInput {
        document: document.to_string(),
        message: e.to_string(),
    })
}

/// Get the tag name without namespace prefix.
///
/// # Examples
/// ```
/// use roxmltree::Document;
/// use gesetze_harvester::xml::get_tag_name;
///
/// let xml = r#"<norm><metadaten/></norm>"#;
/// let doc = Document::parse(xml).unwrap();
/// let metadaten = doc.root_element().first_element_child().unwrap();
/// assert_eq!(get_tag_name(metadaten), "metadaten");
/// ```
pub fn get_tag_name<'a>(node: Node<'a, '_>) -> &'a str {
    node.tag_name().name()
}

/// Check if a node is an element with the given tag name.
///
/// Tag names in law XML are mixed case (`P`, `DL`, `FnR`, `table`), so the
/// comparison ignores case.
pub fn has_tag(node: Node<'_, '_>, tag: &str) -> bool {
    node.is_element() && get_tag_name(node).eq_ignore_ascii_case(tag)
}

/// Find the first child element with the given tag name.
///
/// # Examples
/// ```
/// use roxmltree::Document;
/// use gesetze_harvester::xml::find_child;
///
/// let xml = r#"<norm><metadaten/><textdaten/></norm>"#;
/// let doc = Document::parse(xml).unwrap();
/// let root = doc.root_element();
///
/// assert!(find_child(root, "textdaten").is_some());
/// assert!(find_child(root, "fussnoten").is_none());
/// ```
pub fn find_child<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|child| has_tag(*child, tag))
}

/// Find all child elements with the given tag name.
pub fn find_children<'a, 'input>(
    node: Node<'a, 'input>,
    tag: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(move |child| has_tag(*child, tag))
}

/// Find the first descendant element (excluding `node` itself) with the given tag name.
pub fn find_descendant<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.descendants()
        .skip(1)
        .find(|child| has_tag(*child, tag))
}

/// Find a descendant element matching a path of tag names.
///
/// # Examples
/// ```
/// use roxmltree::Document;
/// use gesetze_harvester::xml::find_by_path;
///
/// let xml = r#"<norm><textdaten><text><Content>x</Content></text></textdaten></norm>"#;
/// let doc = Document::parse(xml).unwrap();
///
/// let content = find_by_path(doc.root_element(), "textdaten/text/Content");
/// assert_eq!(content.and_then(|n| n.text()), Some("x"));
/// ```
pub fn find_by_path<'a, 'input>(node: Node<'a, 'input>, path: &str) -> Option<Node<'a, 'input>> {
    path.split('/')
        .try_fold(node, |current, part| find_child(current, part))
}

/// Get the direct text of a node, trimmed.
pub fn get_text(node: Node<'_, '_>) -> String {
    node.text()
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

/// Get all text below a node with whitespace runs collapsed.
///
/// # Examples
/// ```
/// use roxmltree::Document;
/// use gesetze_harvester::xml::text_content;
///
/// let xml = "<langue>Gesetz über\n  die <B>Mitwirkung</B></langue>";
/// let doc = Document::parse(xml).unwrap();
/// assert_eq!(text_content(doc.root_element()), "Gesetz über die Mitwirkung");
/// ```
pub fn text_content(node: Node<'_, '_>) -> String {
    let raw: String = node
        .descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect();
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}
