//! Name and abbreviation of a changed law.

use gesetze_harvester::{parse_front_matter, LawIndex};

/// Who a law is, for matching and commit messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LawIdentity {
    /// Directory name of the law.
    pub slug: String,
    pub name: String,
    pub abbreviation: String,
}

/// Resolve a law's identity.
///
/// The front matter of its `index.md` wins; then the law list (looked up by
/// the original slug from the front matter, then by directory name); the
/// directory name is the last resort.
pub fn resolve_identity(slug: &str, document: Option<&str>, index: &LawIndex) -> LawIdentity {
    let front_matter = document.and_then(parse_front_matter);

    if let Some(fm) = front_matter.as_ref().filter(|fm| !fm.title.is_empty()) {
        return LawIdentity {
            slug: slug.to_string(),
            name: fm.title.clone(),
            abbreviation: fm.jurabk.clone(),
        };
    }

    let record = front_matter
        .as_ref()
        .and_then(|fm| index.get(&fm.origslug))
        .or_else(|| index.get(slug));
    if let Some(record) = record {
        return LawIdentity {
            slug: slug.to_string(),
            name: record.name.clone(),
            abbreviation: record.abbreviation.clone(),
        };
    }

    tracing::debug!(slug, "no identity found, using directory name");
    LawIdentity {
        slug: slug.to_string(),
        name: slug.to_string(),
        abbreviation: slug.to_string(),
    }
}
