//! Resolve module - Expands `--filename` arguments into manifest files and
//! reads them.
//!
//! An argument is a plain file, a directory, a glob pattern, or `-` for
//! standard input.

use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::manifest::{read_objects, Manifest};

/// Extensions kept when walking a directory. Files named directly are kept
/// whatever their extension.
pub const MANIFEST_EXTENSIONS: &[&str] = &["json", "yaml", "yml"];

/// The argument that reads manifests from standard input.
pub const STDIN: &str = "-";

/// Resolves every pattern into a sorted, deduplicated list of files.
pub fn resolve_all_files<S: AsRef<str>>(patterns: &[S], recursive: bool) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for pattern in patterns {
        files.extend(resolve_pattern(pattern.as_ref(), recursive)?);
    }
    files.sort();
    files.dedup();
    Ok(files)
}

fn resolve_pattern(pattern: &str, recursive: bool) -> Result<Vec<PathBuf>> {
    if is_url(pattern) {
        return Err(Error::Resolve(format!(
            "remote input {} is not supported, download it first",
            pattern
        )));
    }

    if pattern.contains('*') {
        return resolve_glob(pattern);
    }

    let path = Path::new(pattern);
    let meta = std::fs::metadata(path).map_err(|e| Error::io(path, e))?;
    if meta.is_dir() {
        walk_dir(path, recursive)
    } else {
        Ok(vec![path.to_path_buf()])
    }
}

fn resolve_glob(pattern: &str) -> Result<Vec<PathBuf>> {
    let paths = glob::glob(pattern)
        .map_err(|e| Error::Resolve(format!("invalid glob pattern {}: {}", pattern, e)))?;

    let mut files = Vec::new();
    for entry in paths {
        let path = entry.map_err(|e| {
            let source = std::io::Error::new(e.error().kind(), e.to_string());
            Error::io(e.path(), source)
        })?;
        if path.is_file() {
            files.push(path);
        }
    }
    debug!(pattern, matches = files.len(), "resolved glob");
    Ok(files)
}

fn walk_dir(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).max_depth(max_depth).follow_links(true) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            Error::io(path, e.into())
        })?;
        if entry.file_type().is_file() && has_manifest_extension(entry.path()) {
            files.push(entry.into_path());
        }
    }
    debug!(dir = %dir.display(), recursive, files = files.len(), "walked directory");
    Ok(files)
}

fn has_manifest_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| MANIFEST_EXTENSIONS.contains(&ext))
}

fn is_url(s: &str) -> bool {
    match s.split_once("://") {
        Some((scheme, rest)) => {
            !scheme.is_empty()
                && scheme.chars().all(|c| c.is_ascii_alphanumeric() || "+-.".contains(c))
                && !rest.is_empty()
        }
        None => false,
    }
}

/// Reads and decodes every manifest named by `filenames`, in resolved order.
pub fn read_docs<S: AsRef<str>>(filenames: &[S], recursive: bool) -> Result<Vec<Manifest>> {
    read_docs_from(filenames, recursive, std::io::stdin())
}

/// Same as [`read_docs`], with `stdin` standing in for standard input.
pub fn read_docs_from<S, R>(filenames: &[S], recursive: bool, mut stdin: R) -> Result<Vec<Manifest>>
where
    S: AsRef<str>,
    R: Read,
{
    if filenames.iter().any(|f| f.as_ref() == STDIN) {
        if filenames.len() > 1 {
            return Err(Error::Resolve(
                "standard input cannot be combined with other inputs".to_string(),
            ));
        }
        let mut text = String::new();
        stdin
            .read_to_string(&mut text)
            .map_err(|e| Error::io("<stdin>", e))?;
        return read_objects(&text, "<stdin>");
    }

    let mut manifests = Vec::new();
    for file in resolve_all_files(filenames, recursive)? {
        let text = std::fs::read_to_string(&file).map_err(|e| Error::io(&file, e))?;
        manifests.extend(read_objects(&text, &file.display().to_string())?);
    }
    Ok(manifests)
}
