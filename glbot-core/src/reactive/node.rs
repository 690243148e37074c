//! Node identity and the dependent-node interface.
//!
//! Every participant in the dependency graph (signal, computed, effect)
//! carries a [`NodeId`]. Computeds and effects additionally implement
//! [`DependentNode`] so the graph can mark them dirty and, for effects,
//! re-run them when an upstream signal changes.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use super::error::ReactiveError;

/// Unique identifier for a node in the dependency graph.
///
/// Ids are unique per [`ReactiveGraph`](super::ReactiveGraph); they are
/// handed out from an atomic counter owned by the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u64);

impl NodeId {
    /// Get the raw id value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Counter handing out per-graph node ids.
#[derive(Debug, Default)]
pub(crate) struct NodeIdSource {
    next: AtomicU64,
}

impl NodeIdSource {
    pub(crate) fn next_id(&self) -> NodeId {
        NodeId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

/// The kind of node, used for diagnostics and frame bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// A source node (signal). Roots of the graph: no dependencies.
    Signal,

    /// A derived node (computed). Lazy; caches its value.
    Computed,

    /// An effect node. Leaves of the graph: eager, produces no value.
    Effect,
}

/// A node that depends on other nodes and reacts to their changes.
///
/// Implemented by the shared state of computeds and effects. The graph
/// holds these behind `Weak` references so dropped computeds do not keep
/// receiving notifications.
pub(crate) trait DependentNode: Send + Sync {
    /// The node's id.
    fn id(&self) -> NodeId;

    /// Mark this node as needing re-evaluation.
    fn mark_dirty(&self);

    /// Whether this node should be re-run eagerly on a write (effects)
    /// or lazily on next read (computeds).
    fn is_eager(&self) -> bool;

    /// Re-run the node now. A no-op for lazy nodes.
    fn run(&self) -> Result<(), ReactiveError>;
}
