//! # Stale-Record Pruner
//!
//! Deletes every persisted document whose identity was not written during the
//! current run. It must only ever run after all extractors have finished, with
//! the manifest of that same run: deletes cannot be undone.

use crate::constants::TABLE_FILE_EXTENSION;
use crate::errors::PublishError;
use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::info;

/// Reads the manifest into the set of live identities, one per line.
pub fn read_manifest(manifests_path: &Path) -> Result<HashSet<String>, PublishError> {
    let content = fs::read_to_string(manifests_path).map_err(|source| PublishError::Io {
        path: manifests_path.to_path_buf(),
        source,
    })?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect())
}

/// Derives a document's identity from its path: the path relative to
/// `tables_path`, without the extension, with `/` separators.
///
/// `.` segments are ignored on both sides, so `.`, `./` and `./tables/` work
/// like their plain forms. A trailing separator makes no difference.
pub fn file_identity(tables_path: &Path, file_path: &Path) -> Option<String> {
    let file_path = without_cur_dir(file_path);
    let relative = file_path.strip_prefix(without_cur_dir(tables_path)).ok()?;
    let without_extension = relative.with_extension("");
    let segments: Vec<&str> = without_extension
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<Vec<_>>>()?;
    (!segments.is_empty()).then(|| segments.join("/"))
}

fn without_cur_dir(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// Selects the documents whose identity is absent from `live`.
pub fn datasets_to_delete(
    live: &HashSet<String>,
    file_paths: &[PathBuf],
    tables_path: &Path,
) -> Vec<PathBuf> {
    file_paths
        .iter()
        .filter(|path| match file_identity(tables_path, path) {
            Some(identity) => !live.contains(&identity),
            None => false,
        })
        .cloned()
        .collect()
}

/// Lists every persisted document under `tables_path`
/// (`<connection>/<database>/<name>.md`).
pub fn find_table_files(tables_path: &Path) -> Result<Vec<PathBuf>, PublishError> {
    let root = glob::Pattern::escape(&tables_path.to_string_lossy());
    let root = root.trim_end_matches('/');
    let pattern = if root.is_empty() {
        format!("*/*/*.{TABLE_FILE_EXTENSION}")
    } else {
        format!("{root}/*/*/*.{TABLE_FILE_EXTENSION}")
    };

    let mut paths = Vec::new();
    for entry in glob::glob(&pattern)? {
        let path = entry?;
        if path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Removes every document under `tables_path` not listed in the manifest and
/// returns the removed paths.
pub fn prune(manifests_path: &Path, tables_path: &Path) -> Result<Vec<PathBuf>, PublishError> {
    info!("Pruning stale tables under '{}'", tables_path.display());
    let live = read_manifest(manifests_path)?;
    let file_paths = find_table_files(tables_path)?;

    let to_delete = datasets_to_delete(&live, &file_paths, tables_path);
    for path in &to_delete {
        fs::remove_file(path).map_err(|source| PublishError::Io {
            path: path.clone(),
            source,
        })?;
        info!("Removed {}", path.display());
    }
    Ok(to_delete)
}
