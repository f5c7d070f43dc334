//! Rendering of gesetze-im-internet.de law XML as Markdown.
//!
//! A law document is a sequence of `norm` elements. The first norm carries
//! the law's metadata and becomes the document header; every following norm
//! is either a structure unit (book, part, chapter) or a single provision
//! (`§ 1`, `Art 2`) and becomes a heading followed by its text.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use roxmltree::Node;
use unicode_normalization::UnicodeNormalization;

use super::front_matter::{FrontMatter, DEFAULT_LAYOUT};
use super::text::{
    attach_marker, collapse_whitespace, escape_emphasis, wrap_paragraph, HARD_BREAK,
};
use crate::config::TEXT_WRAP_WIDTH;
use crate::error::{HarvesterError, Result};
use crate::types::ConvertedLaw;
use crate::xml::{
    find_by_path, find_child, find_children, find_descendant, get_tag_name, has_tag,
    parse_document, text_content,
};

/// Indentation per list level.
const INDENT: &str = "    ";

/// Deepest Markdown heading.
const MAX_HEADING_LEVEL: usize = 6;

/// Norms with this designation only repeat the table of contents.
const TABLE_OF_CONTENTS: &str = "Inhaltsübersicht";

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w-]").expect("valid regex"));

/// Elements rendered as blocks; everything else is inline.
const BLOCK_ELEMENTS: &[&str] = &[
    "content",
    "dd",
    "dl",
    "footnote",
    "footnotes",
    "la",
    "p",
    "pre",
    "revision",
    "subtitle",
    "table",
    "text",
    "title",
    "toc",
];

fn is_block(node: Node<'_, '_>) -> bool {
    node.is_element()
        && BLOCK_ELEMENTS
            .iter()
            .any(|tag| get_tag_name(node).eq_ignore_ascii_case(tag))
}

/// Derive the output slug from a law's abbreviation.
///
/// # Examples
/// ```
/// use gesetze_harvester::markdown::slugify;
///
/// assert_eq!(slugify("BGB"), "bgb");
/// assert_eq!(slugify("KAEAnO"), "kaeano");
/// assert_eq!(slugify("GüKG 1998"), "guekg_1998");
/// assert_eq!(slugify("SGB 5"), "sgb_5");
/// ```
pub fn slugify(jurabk: &str) -> String {
    let lowered = jurabk.nfc().collect::<String>().trim().to_lowercase();
    let transliterated = lowered
        .replace('ä', "ae")
        .replace('ö', "oe")
        .replace('ü', "ue")
        .replace('ß', "ss");
    NON_WORD.replace_all(&transliterated, "_").into_owned()
}

/// Convert a law document to Markdown.
///
/// `orig_slug` is the name of the directory the XML was read from; it is
/// recorded in the front matter and names the document in errors.
pub fn law_to_markdown(xml: &str, orig_slug: &str) -> Result<ConvertedLaw> {
    let doc = parse_document(xml, orig_slug)?;
    let mut norms = find_children(doc.root_element(), "norm");

    let first = norms.next().ok_or_else(|| HarvesterError::MalformedInput {
        document: orig_slug.to_string(),
        message: "document contains no norm".to_string(),
    })?;
    let meta = find_child(first, "metadaten").ok_or_else(|| HarvesterError::MissingElement {
        element: "metadaten".to_string(),
        context: orig_slug.to_string(),
    })?;

    let jurabk = meta_field(meta, "jurabk").ok_or_else(|| HarvesterError::MissingElement {
        element: "jurabk".to_string(),
        context: orig_slug.to_string(),
    })?;
    let title = ["langue", "kurzue"]
        .iter()
        .find_map(|field| meta_field(meta, field))
        .map(|t| clean_title(&t))
        .unwrap_or_else(|| jurabk.clone());
    let slug = slugify(&jurabk);

    let front_matter = FrontMatter {
        title: title.clone(),
        jurabk: jurabk.clone(),
        layout: DEFAULT_LAYOUT.to_string(),
        origslug: orig_slug.to_string(),
        slug: slug.clone(),
    };

    let mut renderer = Renderer::new(TEXT_WRAP_WIDTH);
    let mut lines = vec![format!("# {title} ({jurabk})")];
    push_block(&mut lines, header_definitions(meta));
    push_block(&mut lines, renderer.norm_text(first));

    for norm in norms {
        renderer.render_norm(norm, &mut lines);
    }

    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }

    let mut markdown = front_matter.render()?;
    markdown.push_str(&lines.join("\n"));
    markdown.push('\n');

    Ok(ConvertedLaw { slug, markdown })
}

/// First non-empty value of a metadata field, whitespace collapsed.
fn meta_field(meta: Node<'_, '_>, field: &str) -> Option<String> {
    find_descendant(meta, field)
        .map(text_content)
        .filter(|t| !t.is_empty())
}

/// Strip footnote markers (`*)`) from a title.
fn clean_title(title: &str) -> String {
    title.replace(" *)", "").replace("*)", "").trim().to_string()
}

/// Upper-case the first character, lower-case the rest.
fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Definition lines below the document title.
fn header_definitions(meta: Node<'_, '_>) -> Vec<String> {
    let mut lines = Vec::new();

    if let Some(date) = meta_field(meta, "ausfertigung-datum") {
        push_block(&mut lines, vec!["Ausfertigungsdatum".to_string(), format!(":   {date}")]);
    }

    if let (Some(periodikum), Some(zitstelle)) =
        (meta_field(meta, "periodikum"), meta_field(meta, "zitstelle"))
    {
        push_block(
            &mut lines,
            vec!["Fundstelle".to_string(), format!(":   {periodikum}: {zitstelle}")],
        );
    }

    for comment in meta
        .descendants()
        .filter(|n| has_tag(*n, "standkommentar"))
        .map(text_content)
        .filter(|t| !t.is_empty())
    {
        let block = match comment.split_once(" durch ") {
            Some((kind, by)) => vec![format!("{} durch", capitalize(kind)), format!(":   {by}")],
            None => vec![format!("Stand: {comment}")],
        };
        push_block(&mut lines, block);
    }

    lines
}

/// Append a block, separated from the previous one by a blank line.
fn push_block(lines: &mut Vec<String>, block: Vec<String>) {
    if block.is_empty() {
        return;
    }
    if lines.last().is_some_and(|l| !l.is_empty()) {
        lines.push(String::new());
    }
    lines.extend(block);
}

fn indent(level: usize) -> String {
    INDENT.repeat(level)
}

fn attribute<'a>(node: Node<'a, '_>, name: &str) -> Option<&'a str> {
    node.attributes()
        .find(|a| a.name().eq_ignore_ascii_case(name))
        .map(|a| a.value())
}

/// Stateful renderer for the norms of one document.
struct Renderer {
    width: usize,
    /// Level of the most recent structure heading.
    structure_level: usize,
    /// Footnote references already emitted.
    footnote_refs: HashSet<String>,
}

impl Renderer {
    fn new(width: usize) -> Self {
        Self {
            width,
            structure_level: 1,
            footnote_refs: HashSet::new(),
        }
    }

    fn render_norm(&mut self, norm: Node<'_, '_>, lines: &mut Vec<String>) {
        let Some(meta) = find_child(norm, "metadaten") else {
            push_block(lines, self.norm_text(norm));
            return;
        };

        if meta_field(meta, "enbez").as_deref() == Some(TABLE_OF_CONTENTS) {
            return;
        }

        if let Some(heading) = self.norm_heading(meta) {
            push_block(lines, vec![heading]);
        }
        push_block(lines, self.norm_text(norm));
    }

    fn norm_heading(&mut self, meta: Node<'_, '_>) -> Option<String> {
        let field = |name: &str| meta_field(meta, name).map(|t| escape_emphasis(&t));

        let level = match field("gliederungskennzahl") {
            Some(kennzahl) => {
                self.structure_level = kennzahl.chars().count() / 3 + 1;
                self.structure_level
            }
            None => self.structure_level + 1,
        };

        let mut title = String::new();
        if let Some(bez) = field("gliederungsbez") {
            title = bez;
        }
        if let Some(gliederungstitel) = field("gliederungstitel") {
            title = if title.is_empty() {
                gliederungstitel
            } else {
                format!("{title} - {gliederungstitel}")
            };
        }
        if let Some(enbez) = field("enbez") {
            title = enbez;
        }
        if let Some(titel) = field("titel") {
            title = if title.is_empty() {
                titel
            } else {
                format!("{title} {titel}")
            };
        }

        if title.is_empty() {
            return None;
        }
        Some(format!("{} {title}", "#".repeat(level.min(MAX_HEADING_LEVEL))))
    }

    /// Body text of a norm; `fussnoten` (editorial notes) are not rendered.
    fn norm_text(&mut self, norm: Node<'_, '_>) -> Vec<String> {
        match find_by_path(norm, "textdaten/text") {
            Some(text) => self.render_container(text, 0),
            None => Vec::new(),
        }
    }

    fn render_container(&mut self, node: Node<'_, '_>, level: usize) -> Vec<String> {
        let mut lines = Vec::new();
        let mut inline = String::new();

        for child in node.children() {
            if is_block(child) {
                self.flush_paragraph(&mut inline, level, &mut lines);
                let block = self.render_block(child, level);
                push_block(&mut lines, block);
            } else {
                self.collect_node(child, &mut inline);
            }
        }
        self.flush_paragraph(&mut inline, level, &mut lines);

        lines
    }

    fn flush_paragraph(&self, inline: &mut String, level: usize, lines: &mut Vec<String>) {
        let paragraph = wrap_paragraph(inline, self.width, &indent(level));
        push_block(lines, paragraph);
        inline.clear();
    }

    fn render_block(&mut self, node: Node<'_, '_>, level: usize) -> Vec<String> {
        match get_tag_name(node).to_ascii_lowercase().as_str() {
            "dl" => self.render_list(node, level),
            "table" => self.render_table(node, level),
            "title" => vec![format!("## {}", self.single_line(node))],
            "subtitle" => vec![format!("### {}", self.single_line(node))],
            "footnotes" => self.render_footnotes(node, level),
            _ => self.render_container(node, level),
        }
    }

    fn render_list(&mut self, list: Node<'_, '_>, level: usize) -> Vec<String> {
        let mut lines = Vec::new();
        let mut marker = String::new();

        for child in list.children().filter(|n| n.is_element()) {
            if has_tag(child, "dt") {
                marker = self.single_line(child);
            } else if has_tag(child, "dd") {
                let mut item = self.render_container(child, level + 1);
                let item_marker = if marker.is_empty() { "*" } else { marker.as_str() };
                attach_marker(&mut item, item_marker, &indent(level), &indent(level + 1));
                push_block(&mut lines, item);
                marker.clear();
            }
        }

        lines
    }

    fn render_footnotes(&mut self, footnotes: Node<'_, '_>, level: usize) -> Vec<String> {
        let mut lines = Vec::new();
        for footnote in find_children(footnotes, "Footnote") {
            let mut body = self.render_container(footnote, level + 1);
            match attribute(footnote, "ID") {
                Some(id) => {
                    let marker = format!("[^{id}]:");
                    attach_marker(&mut body, &marker, &indent(level), &indent(level + 1));
                }
                None => tracing::debug!("footnote without ID"),
            }
            push_block(&mut lines, body);
        }
        lines
    }

    /// Render a CALS table as a pipe table.
    fn render_table(&mut self, table: Node<'_, '_>, level: usize) -> Vec<String> {
        let prefix = indent(level);
        let mut lines = Vec::new();

        let groups: Vec<Node<'_, '_>> = {
            let tgroups: Vec<_> = find_children(table, "tgroup").collect();
            if tgroups.is_empty() {
                vec![table]
            } else {
                tgroups
            }
        };

        for group in groups {
            let header: Vec<Vec<String>> = find_children(group, "thead")
                .flat_map(|head| find_children(head, "row"))
                .map(|row| self.table_row(row))
                .collect();
            let body: Vec<Vec<String>> = find_children(group, "tbody")
                .chain(find_children(group, "tfoot"))
                .flat_map(|section| find_children(section, "row"))
                .map(|row| self.table_row(row))
                .collect();

            let declared = attribute(group, "cols").and_then(|c| c.trim().parse::<usize>().ok());
            let widest = header.iter().chain(&body).map(Vec::len).max().unwrap_or(0);
            let columns = declared.unwrap_or(0).max(widest).max(1);

            let (header_row, header_rest) = match header.split_first() {
                Some((first, rest)) => (first.clone(), rest.to_vec()),
                None => (Vec::new(), Vec::new()),
            };

            if !lines.is_empty() {
                lines.push(String::new());
            }
            lines.push(format!("{prefix}{}", pipe_row(&header_row, columns)));
            lines.push(format!("{prefix}|{}", " --- |".repeat(columns)));
            for row in header_rest.iter().chain(&body) {
                lines.push(format!("{prefix}{}", pipe_row(row, columns)));
            }
        }

        lines
    }

    fn table_row(&mut self, row: Node<'_, '_>) -> Vec<String> {
        find_children(row, "entry")
            .map(|entry| self.single_line(entry).replace('|', "\\|"))
            .collect()
    }

    /// Inline content of a node on a single line.
    fn single_line(&mut self, node: Node<'_, '_>) -> String {
        let mut buf = String::new();
        for child in node.children() {
            self.collect_node(child, &mut buf);
        }
        collapse_whitespace(&buf.replace(HARD_BREAK, " "))
    }

    /// Append the inline rendering of `node` to `buf`.
    fn collect_node(&mut self, node: Node<'_, '_>, buf: &mut String) {
        if node.is_text() {
            if let Some(text) = node.text() {
                buf.push_str(&escape_emphasis(text));
            }
            return;
        }
        if !node.is_element() {
            return;
        }

        match get_tag_name(node).to_ascii_lowercase().as_str() {
            "br" => buf.push(HARD_BREAK),
            "b" => self.collect_emphasis(node, "**", buf),
            "u" | "i" => self.collect_emphasis(node, "*", buf),
            "fnr" => {
                if let Some(id) = attribute(node, "ID") {
                    if self.footnote_refs.insert(id.to_string()) {
                        buf.push_str(&format!("[^{id}]"));
                    }
                }
            }
            "img" => {
                if let Some(src) = attribute(node, "SRC") {
                    let alt = attribute(node, "ALT").unwrap_or(src);
                    buf.push_str(&format!(" ![{alt}]({src}) "));
                }
            }
            _ => {
                for child in node.children() {
                    self.collect_node(child, buf);
                }
            }
        }
    }

    fn collect_emphasis(&mut self, node: Node<'_, '_>, marker: &str, buf: &mut String) {
        let mut raw = String::new();
        for child in node.children() {
            self.collect_node(child, &mut raw);
        }
        let inner = collapse_whitespace(&raw);
        if raw.starts_with(char::is_whitespace) {
            buf.push(' ');
        }
        if !inner.is_empty() {
            buf.push_str(&format!("{marker}{inner}{marker}"));
        }
        if raw.ends_with(char::is_whitespace) {
            buf.push(' ');
        }
    }
}

/// Format table cells as a pipe row padded to `columns` cells.
fn pipe_row(cells: &[String], columns: usize) -> String {
    let mut row = String::from("|");
    for i in 0..columns {
        let cell = cells.get(i).map(String::as_str).unwrap_or("");
        row.push_str(&format!(" {cell} |"));
    }
    row
}
