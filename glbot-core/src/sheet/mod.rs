//! Sheet Tree Builder
//!
//! Pure reconstruction of the sparse sheet → row → column structure from
//! a convention-based directory layout, plus the write path that puts
//! cells back into it.
//!
//! The module has no dependency on the reactive engine; the UI composes
//! the two by wrapping the builder inside a computed/effect pipeline:
//!
//! ```rust,no_run
//! use glbot_core::reactive::ReactiveGraph;
//! use glbot_core::sheet::{build_sheet_trees, relative_paths_containing, SHEET_MARKER};
//!
//! let graph = ReactiveGraph::new();
//! let revision = graph.signal(0u64);
//!
//! let revision_for_trees = revision.clone();
//! let trees = graph.computed(move || {
//!     let _ = revision_for_trees.get(); // rebuild whenever bumped
//!     let paths = relative_paths_containing("/data/sheets", SHEET_MARKER)
//!         .unwrap_or_default();
//!     build_sheet_trees(&paths)
//! });
//!
//! // ... after writing a cell:
//! revision.update(|r| r + 1).unwrap();
//! # let _ = trees;
//! ```

mod error;
mod store;
mod tree;
mod walk;

pub use error::SheetError;
pub use store::{cell_path, save_cell_from_buffer, save_cell_from_file, CellFromFile, CellLocation};
pub use tree::{build_sheet_trees, CellKind, CellRef, RowTree, SheetTree, SHEET_MARKER};
pub use walk::relative_paths_containing;
