//! Law archive downloading and storage.
//!
//! Every law on gesetze-im-internet.de is published as `{slug}/xml.zip`,
//! containing one main XML document plus optional images and PDFs.

use std::fs;
use std::io::{Cursor, Read};
use std::path::Path;

use zip::result::ZipError;
use zip::ZipArchive;

use crate::config::{law_dir, law_zip_url, validate_slug};
use crate::error::{HarvesterError, Result};
use crate::http::Fetch;

/// Download the XML archive of a law.
pub fn fetch_law_archive(fetcher: &impl Fetch, base_url: &str, slug: &str) -> Result<Vec<u8>> {
    validate_slug(slug)?;
    let url = law_zip_url(base_url, slug);
    tracing::debug!(slug, url = %url, "downloading law archive");
    fetcher.fetch(&url)
}

/// Whether an archive member is the main law document.
fn is_main_document(name: &str) -> bool {
    let file_name = name.rsplit('/').next().unwrap_or(name);
    file_name.ends_with(".xml") && !file_name.starts_with('_')
}

/// Replace the law directory below `root` with the contents of `archive`.
///
/// The main XML document is stored as `<slug>.xml`. A body that is not a zip
/// archive means the law is gone; the stale directory is removed and
/// `NotFound` is returned.
pub fn store_law(root: &Path, slug: &str, archive: &[u8]) -> Result<()> {
    validate_slug(slug)?;
    let dir = law_dir(root, slug);

    let mut zip = match ZipArchive::new(Cursor::new(archive)) {
        Ok(zip) => zip,
        Err(ZipError::InvalidArchive(_) | ZipError::UnsupportedArchive(_)) => {
            tracing::info!(slug, "archive unavailable, removing law");
            remove_law(root, slug)?;
            return Err(HarvesterError::NotFound(slug.to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    remove_law(root, slug)?;
    fs::create_dir_all(&dir)?;

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        if entry.is_dir() {
            continue;
        }

        let name = entry.name().to_string();
        let target = if is_main_document(&name) {
            dir.join(format!("{slug}.xml"))
        } else {
            let relative = entry
                .enclosed_name()
                .ok_or_else(|| HarvesterError::UnsafePath(name.clone()))?;
            dir.join(relative)
        };

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut content = Vec::new();
        entry.read_to_end(&mut content)?;
        fs::write(&target, content)?;
        tracing::debug!(slug, member = %name, "extracted");
    }

    Ok(())
}

/// Remove a law directory if it exists.
pub fn remove_law(root: &Path, slug: &str) -> Result<()> {
    let dir = law_dir(root, slug);
    if dir.exists() {
        fs::remove_dir_all(&dir)?;
    }
    Ok(())
}
