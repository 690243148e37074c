//! Signal Implementation
//!
//! A Signal is the fundamental reactive primitive. It holds a value and
//! tracks which computations depend on it.
//!
//! # How Signals Work
//!
//! 1. When a signal is read within an evaluation frame (computed/effect),
//!    the read is recorded into that frame; a successful evaluation turns
//!    it into a dependency edge.
//!
//! 2. When a signal's value changes, the graph marks all transitive
//!    dependents dirty and re-runs the affected effects before `set`
//!    returns.
//!
//! # Equality policy
//!
//! By default every write propagates. A signal built with
//! [`ReactiveGraph::signal_distinct`](super::ReactiveGraph::signal_distinct)
//! or [`ReactiveGraph::signal_with_equality`](super::ReactiveGraph::signal_with_equality)
//! carries a predicate; writes the predicate considers equal to the
//! current value are dropped without touching the graph.

use std::fmt::Debug;
use std::sync::Arc;

use parking_lot::RwLock;

use super::error::ReactiveError;
use super::graph::GraphInner;
use super::node::NodeId;

pub(crate) type EqualityFn<T> = Arc<dyn Fn(&T, &T) -> bool + Send + Sync>;

/// A reactive signal holding a value of type T.
///
/// Cloning a signal is cheap; clones share the same cell and the same
/// spot in the dependency graph.
pub struct Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    id: NodeId,
    graph: Arc<GraphInner>,
    value: Arc<RwLock<T>>,
    equals: Option<EqualityFn<T>>,
}

impl<T> Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(graph: Arc<GraphInner>, value: T, equals: Option<EqualityFn<T>>) -> Self {
        Self {
            id: graph.next_id(),
            graph,
            value: Arc::new(RwLock::new(value)),
            equals,
        }
    }

    /// Get the signal's node id.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Get the current value.
    ///
    /// Inside an active evaluation this also records the read, making the
    /// evaluating computed/effect a dependent of this signal. Outside any
    /// evaluation it just returns the value.
    pub fn get(&self) -> T {
        self.graph.track_read(self.id);
        self.value.read().clone()
    }

    /// Get the current value without recording a dependency.
    pub fn get_untracked(&self) -> T {
        self.value.read().clone()
    }

    /// Store a new value and propagate to dependents.
    ///
    /// All affected effects have re-run by the time this returns. The
    /// only failure mode is a cyclic dependency discovered downstream;
    /// the write itself has still been stored in that case.
    pub fn set(&self, value: T) -> Result<(), ReactiveError> {
        if let Some(equals) = &self.equals {
            let unchanged = equals(&self.value.read(), &value);
            if unchanged {
                return Ok(());
            }
        }
        *self.value.write() = value;
        self.graph.notify_change(self.id)
    }

    /// Derive a new value from the current one and store it.
    pub fn update<F>(&self, f: F) -> Result<(), ReactiveError>
    where
        F: FnOnce(&T) -> T,
    {
        let next = f(&self.value.read());
        self.set(next)
    }
}

impl<T> Clone for Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            graph: Arc::clone(&self.graph),
            value: Arc::clone(&self.value),
            equals: self.equals.clone(),
        }
    }
}

impl<T> Debug for Signal<T>
where
    T: Clone + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.id)
            .field("value", &self.get_untracked())
            .finish()
    }
}
