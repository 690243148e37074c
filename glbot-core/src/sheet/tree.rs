//! Sheet tree reconstruction.
//!
//! A sheet lives on disk as a directory layout following a fixed naming
//! grammar:
//!
//! ```text
//! {sheet_id}_sheet / {row_id}_row / {col}_cell[.ext]
//! ```
//!
//! [`build_sheet_trees`] re-derives the sparse sheet → row → column
//! structure from a flat list of relative paths. The parse is tolerant:
//! a path that is too short or fails a segment pattern is skipped, never
//! an error. The structures produced here are immutable snapshots; any
//! filesystem change requires a full rebuild.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// The substring that marks a path as sheet data during a directory
/// walk. Part of the naming grammar: every sheet directory ends in it.
pub const SHEET_MARKER: &str = "_sheet";

/// One logical sheet, keyed by the id parsed from its directory name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetTree {
    pub sheet_id: String,
    /// Sparse rows, keyed by row index.
    pub rows: BTreeMap<u32, RowTree>,
}

/// One row of a sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowTree {
    pub row_id: u32,
    /// Sparse cells, keyed by column index.
    pub cells: BTreeMap<u32, CellRef>,
}

/// The file that "is" a cell, plus what the UI needs to pick a renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellRef {
    /// Relative path of the backing file, as produced by the walk.
    pub path: PathBuf,
    /// Lowercased file extension, without the dot.
    pub extension: Option<String>,
}

/// Renderer category derived from a cell's extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellKind {
    Image,
    Text,
    Unsupported,
}

impl CellRef {
    /// Classify the cell for rendering purposes.
    pub fn kind(&self) -> CellKind {
        match self.extension.as_deref() {
            Some("png" | "jpg" | "jpeg" | "jpe" | "gif" | "bmp" | "ico" | "svg" | "webp") => {
                CellKind::Image
            }
            Some("txt" | "md" | "json" | "csv" | "html" | "xml") => CellKind::Text,
            _ => CellKind::Unsupported,
        }
    }
}

fn sheet_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([A-Za-z0-9-]+)_sheet$").expect("valid sheet pattern"))
}

fn row_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d+)_row$").expect("valid row pattern"))
}

fn cell_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Prefix match: the leaf may carry an extension or be a directory
    // with further content.
    RE.get_or_init(|| Regex::new(r"^(\d+)_cell").expect("valid cell pattern"))
}

fn parse_sheet_segment(segment: &str) -> Option<&str> {
    sheet_pattern()
        .captures(segment)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

fn parse_row_segment(segment: &str) -> Option<u32> {
    row_pattern()
        .captures(segment)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

fn parse_cell_segment(segment: &str) -> Option<u32> {
    cell_pattern()
        .captures(segment)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Rebuild the sheet structures from a flat listing of relative paths.
///
/// Pure and idempotent: the same listing always yields structurally
/// identical trees. Paths that do not fit the grammar are skipped
/// silently (logged at trace level); a duplicate (sheet, row, column)
/// coordinate keeps the last occurrence, matching the writer's
/// last-write-wins behavior.
pub fn build_sheet_trees<P: AsRef<Path>>(paths: &[P]) -> Vec<SheetTree> {
    let mut sheets: IndexMap<String, SheetTree> = IndexMap::new();

    for path in paths {
        let path = path.as_ref();
        let mut segments = path.components().filter_map(|component| match component {
            Component::Normal(segment) => segment.to_str(),
            _ => None,
        });

        let (Some(sheet_segment), Some(row_segment), Some(cell_segment)) =
            (segments.next(), segments.next(), segments.next())
        else {
            tracing::trace!(path = %path.display(), "skipping path with fewer than 3 segments");
            continue;
        };

        let Some(sheet_id) = parse_sheet_segment(sheet_segment) else {
            tracing::trace!(path = %path.display(), "skipping path outside the sheet grammar");
            continue;
        };
        let Some(row_id) = parse_row_segment(row_segment) else {
            tracing::trace!(path = %path.display(), "skipping path outside the row grammar");
            continue;
        };
        let Some(col) = parse_cell_segment(cell_segment) else {
            tracing::trace!(path = %path.display(), "skipping path outside the cell grammar");
            continue;
        };

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase);

        let sheet = sheets
            .entry(sheet_id.to_owned())
            .or_insert_with(|| SheetTree {
                sheet_id: sheet_id.to_owned(),
                rows: BTreeMap::new(),
            });
        let row = sheet.rows.entry(row_id).or_insert_with(|| RowTree {
            row_id,
            cells: BTreeMap::new(),
        });
        row.cells.insert(
            col,
            CellRef {
                path: path.to_path_buf(),
                extension,
            },
        );
    }

    sheets.into_values().collect()
}
