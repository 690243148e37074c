//! Computed Implementation
//!
//! A Computed is a cached derived value that re-evaluates only when its
//! dependencies change.
//!
//! # How Computeds Work
//!
//! 1. On first read, the closure runs inside an evaluation frame and the
//!    result is cached.
//!
//! 2. Reads while clean return the cache without invoking the closure.
//!
//! 3. When a dependency changes, the computed is marked dirty but not
//!    recomputed: the next read does that. A computed nobody reads
//!    stays dirty at zero cost.
//!
//! 4. Each evaluation rebuilds the dependency set from the cells actually
//!    read, so a conditional branch that stops reading a cell also stops
//!    subscribing to it.
//!
//! # Cycle detection
//!
//! A computed whose closure reads itself, directly or through other
//! computeds, fails with [`ReactiveError::CyclicDependency`] instead of
//! overflowing the stack. Detection happens when a node's id is found on
//! the evaluation stack; the failure unwinds through the intermediate
//! user closures and is converted back into the typed error by the
//! evaluation that owns the re-entered node. The computed stays dirty, so
//! fixing the cycle and reading again recovers.

use std::fmt::Debug;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::error::{CycleUnwind, ReactiveError};
use super::graph::GraphInner;
use super::node::{DependentNode, NodeId, NodeKind};

/// A cached, lazily recomputed cell derived from other cells.
pub struct Computed<T>
where
    T: Clone + Send + Sync + 'static,
{
    state: Arc<ComputedState<T>>,
}

pub(crate) struct ComputedState<T> {
    id: NodeId,
    graph: Arc<GraphInner>,
    compute: Box<dyn Fn() -> T + Send + Sync>,
    /// Cached value; `None` until the first successful evaluation.
    value: RwLock<Option<T>>,
    /// Starts dirty so the first read evaluates.
    dirty: AtomicBool,
}

impl<T> Computed<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub(crate) fn new<F>(graph: Arc<GraphInner>, compute: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        let state = Arc::new(ComputedState {
            id: graph.next_id(),
            graph: Arc::clone(&graph),
            compute: Box::new(compute),
            value: RwLock::new(None),
            dirty: AtomicBool::new(true),
        });
        graph.register_dependent(&(state.clone() as Arc<dyn DependentNode>));
        Self { state }
    }

    /// Get the computed's node id.
    pub fn id(&self) -> NodeId {
        self.state.id
    }

    /// Get the current value, recomputing if a dependency changed since
    /// the last read.
    ///
    /// Inside an active evaluation this also records the read, so the
    /// caller becomes a dependent of this computed.
    pub fn get(&self) -> Result<T, ReactiveError> {
        self.state.graph.track_read(self.state.id);

        if !self.state.dirty.load(Ordering::Acquire) {
            if let Some(value) = self.state.value.read().clone() {
                return Ok(value);
            }
        }
        self.state.recompute()
    }

    /// Whether a cached value exists (at least one successful evaluation).
    pub fn has_value(&self) -> bool {
        self.state.value.read().is_some()
    }

    /// Whether the next read will invoke the closure.
    pub fn is_dirty(&self) -> bool {
        self.state.dirty.load(Ordering::Acquire)
    }
}

impl<T> ComputedState<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn recompute(&self) -> Result<T, ReactiveError> {
        if self.graph.is_on_stack(self.id) {
            // Re-entered during our own evaluation: unwind to the frame
            // that owns this node. An active frame is guaranteed here.
            panic::panic_any(CycleUnwind(self.id));
        }

        let frame = self.graph.push_frame(self.id, NodeKind::Computed);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| (self.compute)()));
        let reads = frame.finish();

        match outcome {
            Ok(value) => {
                self.graph.commit_edges(self.id, &reads);
                *self.value.write() = Some(value.clone());
                self.dirty.store(false, Ordering::Release);
                Ok(value)
            }
            Err(payload) => match payload.downcast::<CycleUnwind>() {
                Ok(unwind) if unwind.0 == self.id => {
                    // We are the cycle head: stop unwinding and report.
                    // The dirty flag was never cleared, so a later read
                    // retries once the cycle is gone.
                    let error = ReactiveError::CyclicDependency(self.id);
                    self.graph.note_cycle(&error);
                    Err(error)
                }
                Ok(unwind) => panic::panic_any(*unwind),
                Err(other) => panic::resume_unwind(other),
            },
        }
    }
}

impl<T> DependentNode for ComputedState<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn id(&self) -> NodeId {
        self.id
    }

    fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    fn is_eager(&self) -> bool {
        false
    }

    fn run(&self) -> Result<(), ReactiveError> {
        // Lazy: nothing to do until the next read.
        Ok(())
    }
}

impl<T> Clone for Computed<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T> Debug for Computed<T>
where
    T: Clone + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Computed")
            .field("id", &self.state.id)
            .field("dirty", &self.is_dirty())
            .field("has_value", &self.has_value())
            .finish()
    }
}
