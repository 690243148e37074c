//! Error types for the reactive engine.

use thiserror::Error;

use super::node::NodeId;

/// Failures surfaced by the reactive engine.
///
/// A cyclic dependency is fatal to the triggering evaluation only: the
/// offending computed keeps its dirty flag, so once the cycle is broken
/// a subsequent read retries cleanly. The rest of the graph is unharmed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReactiveError {
    /// A computed read itself, directly or transitively, during its own
    /// evaluation.
    #[error("cyclic dependency detected while evaluating node {0}")]
    CyclicDependency(NodeId),
}

/// Panic payload used to unwind out of arbitrary user closures between
/// the frame that re-entered a node and the frame that owns it. The
/// owning evaluation converts it back into [`ReactiveError`]; it never
/// escapes the engine.
pub(crate) struct CycleUnwind(pub(crate) NodeId);
