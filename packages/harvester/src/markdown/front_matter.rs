//! YAML front matter of converted law documents.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Layout name expected by the static site rendering the laws.
pub const DEFAULT_LAYOUT: &str = "default";

/// Front matter at the top of every `index.md`.
///
/// Fields are declared in the sorted key order of the emitted YAML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontMatter {
    /// Full title of the law.
    #[serde(rename = "Title")]
    pub title: String,

    /// Official abbreviation.
    pub jurabk: String,

    /// Page layout.
    #[serde(default = "default_layout")]
    pub layout: String,

    /// Directory name the XML was read from.
    #[serde(default)]
    pub origslug: String,

    /// Slug derived from the abbreviation.
    #[serde(default)]
    pub slug: String,
}

fn default_layout() -> String {
    DEFAULT_LAYOUT.to_string()
}

impl FrontMatter {
    /// Render as a front matter block.
    ///
    /// A blank line precedes the closing `---` so the block never turns into
    /// a setext heading.
    pub fn render(&self) -> Result<String> {
        let yaml = serde_yaml_ng::to_string(self)?;
        Ok(format!("---\n{yaml}\n---\n\n"))
    }
}

/// Extract the front matter of a Markdown document, if it has one.
///
/// # Examples
/// ```
/// use gesetze_harvester::markdown::parse_front_matter;
///
/// let md = "---\nTitle: Bürgerliches Gesetzbuch\njurabk: BGB\nlayout: default\norigslug: bgb\nslug: bgb\n\n---\n\n# BGB\n";
/// let fm = parse_front_matter(md).unwrap();
/// assert_eq!(fm.jurabk, "BGB");
///
/// assert!(parse_front_matter("# No front matter").is_none());
/// ```
pub fn parse_front_matter(markdown: &str) -> Option<FrontMatter> {
    let body = markdown.strip_prefix("---\n")?;
    let end = body.find("\n---")?;
    match serde_yaml_ng::from_str(&body[..end]) {
        Ok(front_matter) => Some(front_matter),
        Err(e) => {
            tracing::debug!(error = %e, "unreadable front matter");
            None
        }
    }
}
