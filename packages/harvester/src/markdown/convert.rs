//! Conversion of a whole directory tree of downloaded laws.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::render::law_to_markdown;
use crate::config::law_dir;
use crate::error::{HarvesterError, Result};
use crate::types::{BatchReport, ConvertedLaw};

/// Name of the converted document inside each output law directory.
pub const INDEX_FILE: &str = "index.md";

/// Convert a single XML file.
///
/// The parent directory name is used as the original slug.
pub fn convert_file(path: &Path) -> Result<ConvertedLaw> {
    let orig_slug = path
        .parent()
        .and_then(Path::file_name)
        .or_else(|| path.file_stem())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let bytes = fs::read(path)?;
    let xml = String::from_utf8(bytes).map_err(|e| HarvesterError::MalformedInput {
        document: path.display().to_string(),
        message: e.to_string(),
    })?;

    law_to_markdown(&xml, &orig_slug).map_err(|e| match e {
        HarvesterError::MalformedInput { message, .. } => HarvesterError::MalformedInput {
            document: path.display().to_string(),
            message,
        },
        other => other,
    })
}

/// Find the main XML document of a law directory.
///
/// Prefers `<dirname>.xml`; otherwise the first XML file not starting with `_`.
fn main_document(dir: &Path) -> Result<Option<PathBuf>> {
    let Some(name) = dir.file_name() else {
        return Ok(None);
    };
    let preferred = dir.join(format!("{}.xml", name.to_string_lossy()));
    if preferred.is_file() {
        return Ok(Some(preferred));
    }

    let mut candidates: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path.extension().is_some_and(|ext| ext == "xml")
                && !path
                    .file_name()
                    .is_some_and(|n| n.to_string_lossy().starts_with('_'))
        })
        .collect();
    candidates.sort();
    Ok(candidates.into_iter().next())
}

/// Convert every law below `in_path` into `out_path`.
///
/// Input laws live in `in_path/<c>/<slug>/`; each one is written to
/// `out_path/<c>/<slug>/index.md` (slug derived from the abbreviation), and
/// every other file of the input directory is copied alongside. The output
/// directory of a law is replaced as a whole.
pub fn convert_tree(in_path: &Path, out_path: &Path) -> Result<BatchReport> {
    let mut report = BatchReport::new();
    let mut written = HashSet::new();

    let mut dirs: Vec<PathBuf> = WalkDir::new(in_path)
        .min_depth(2)
        .max_depth(2)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_dir())
        .map(|entry| entry.into_path())
        .collect();
    dirs.sort();

    for dir in dirs {
        let Some(document) = main_document(&dir)? else {
            tracing::debug!(dir = %dir.display(), "no XML document, skipping");
            continue;
        };
        let item = document.display().to_string();

        let converted = match convert_file(&document) {
            Ok(converted) => converted,
            Err(e) if e.is_per_item() => {
                report.record_failure(item, e);
                continue;
            }
            Err(e) => return Err(e),
        };

        if converted.slug.is_empty() {
            report.record_failure(
                item.clone(),
                HarvesterError::MalformedInput {
                    document: item,
                    message: "abbreviation yields an empty slug".to_string(),
                },
            );
            continue;
        }
        if !written.insert(converted.slug.clone()) {
            tracing::warn!(slug = %converted.slug, document = %item, "slug already written in this run, overwriting");
        }

        write_law(&dir, &document, out_path, &converted)?;
        tracing::info!(slug = %converted.slug, "converted");
        report.record_success(converted.slug);
    }

    Ok(report)
}

/// Replace the output directory of a law with its Markdown and attachments.
fn write_law(
    source_dir: &Path,
    document: &Path,
    out_path: &Path,
    converted: &ConvertedLaw,
) -> Result<()> {
    let target = law_dir(out_path, &converted.slug);
    if target.exists() {
        fs::remove_dir_all(&target)?;
    }
    fs::create_dir_all(&target)?;

    for entry in fs::read_dir(source_dir)? {
        let path = entry?.path();
        if path == document || !path.is_file() {
            continue;
        }
        if let Some(name) = path.file_name() {
            fs::copy(&path, target.join(name))?;
        }
    }

    fs::write(target.join(INDEX_FILE), &converted.markdown)?;
    Ok(())
}
