//! The cell write path.
//!
//! Materializes a cell back into the on-disk layout, using the same
//! naming grammar the builder parses. Saving is last-write-wins: an
//! existing file at the target coordinate is overwritten without
//! warning, and re-creating existing sheet/row directories is not an
//! error.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::error::SheetError;

/// A (row, column) coordinate inside a sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellLocation {
    pub row: u32,
    pub col: u32,
}

/// A request to store an existing file as a cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellFromFile {
    pub sheet_id: String,
    /// Path of the file to copy into the layout.
    pub source: PathBuf,
    pub location: CellLocation,
}

/// Compute the on-disk path for a cell, following the naming grammar.
///
/// The builder's segment patterns re-parse every path produced here;
/// that round trip is what keeps reader and writer in agreement.
pub fn cell_path(
    root: &Path,
    sheet_id: &str,
    location: CellLocation,
    extension: Option<&str>,
) -> PathBuf {
    let file_name = match extension {
        Some(ext) => format!("{}_cell.{ext}", location.col),
        None => format!("{}_cell", location.col),
    };
    root.join(format!("{sheet_id}_sheet"))
        .join(format!("{}_row", location.row))
        .join(file_name)
}

/// Copy `cell.source` into the layout at the given coordinate,
/// preserving the source file's extension. Returns the destination path.
pub fn save_cell_from_file(root: &Path, cell: &CellFromFile) -> Result<PathBuf, SheetError> {
    let extension = cell.source.extension().and_then(OsStr::to_str);
    let destination = cell_path(root, &cell.sheet_id, cell.location, extension);
    ensure_parent(&destination)?;

    fs::copy(&cell.source, &destination).map_err(|source| SheetError::Io {
        path: cell.source.clone(),
        source,
    })?;
    tracing::debug!(destination = %destination.display(), "saved cell from file");
    Ok(destination)
}

/// Write raw bytes into the layout at the given coordinate. Used when
/// the content arrives over an IPC boundary rather than from disk.
pub fn save_cell_from_buffer(
    root: &Path,
    sheet_id: &str,
    location: CellLocation,
    extension: Option<&str>,
    bytes: &[u8],
) -> Result<PathBuf, SheetError> {
    let destination = cell_path(root, sheet_id, location, extension);
    ensure_parent(&destination)?;

    fs::write(&destination, bytes).map_err(|source| SheetError::Io {
        path: destination.clone(),
        source,
    })?;
    tracing::debug!(destination = %destination.display(), "saved cell from buffer");
    Ok(destination)
}

fn ensure_parent(destination: &Path) -> Result<(), SheetError> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).map_err(|source| SheetError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}
