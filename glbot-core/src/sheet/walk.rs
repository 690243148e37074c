//! Recursive listing of sheet data files.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::error::SheetError;

/// Recursively collect the relative paths of every regular file under
/// `root` whose path contains `marker` as a substring.
///
/// The listing is eager: callers need the full result to build trees
/// from it. Traversal order is not significant. Any I/O failure during
/// the walk fails the whole call, since a partial listing would produce
/// a silently incomplete tree.
pub fn relative_paths_containing(
    root: impl AsRef<Path>,
    marker: &str,
) -> Result<Vec<PathBuf>, SheetError> {
    let root = root.as_ref();
    let mut results = Vec::new();

    for entry in WalkDir::new(root) {
        let entry = entry.map_err(|source| SheetError::Walk {
            path: source
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| root.to_path_buf()),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        if !entry.path().to_string_lossy().contains(marker) {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(root)
            .unwrap_or_else(|_| entry.path())
            .to_path_buf();
        results.push(relative);
    }

    tracing::debug!(
        root = %root.display(),
        marker,
        count = results.len(),
        "collected sheet data files"
    );
    Ok(results)
}
