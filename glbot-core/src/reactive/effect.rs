//! Effect Implementation
//!
//! An Effect is a side-effecting computation that re-runs whenever its
//! dependencies change.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs its closure immediately to establish
//!    initial dependencies.
//!
//! 2. A write to any dependency re-runs the closure with fresh tracking;
//!    cells not read this time are unsubscribed.
//!
//! 3. [`Effect::stop`] permanently unsubscribes the effect. Stopping is
//!    idempotent and safe to call from inside the effect's own body.
//!
//! # Ownership
//!
//! An effect created while another effect is running becomes a child of
//! that effect. Children are disposed automatically when the parent
//! re-runs or stops, so a body that conditionally spawns effects cannot
//! leak subscriptions across runs.
//!
//! # Differences from Computed
//!
//! - Computeds return a value; effects do not.
//! - Computeds are lazy (evaluate on read); effects are eager (run on
//!   write).
//! - An effect's lifetime is owned by the graph until stopped; dropping
//!   the [`Effect`] handle alone does not stop it.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::error::{CycleUnwind, ReactiveError};
use super::graph::GraphInner;
use super::node::{DependentNode, NodeId, NodeKind};

/// Handle to a running effect. `stop()` is the only way to end it.
#[derive(Clone)]
pub struct Effect {
    state: Arc<EffectState>,
}

pub(crate) struct EffectState {
    id: NodeId,
    graph: Arc<GraphInner>,
    run_fn: Box<dyn Fn() + Send + Sync>,
    disposed: AtomicBool,
}

impl Effect {
    pub(crate) fn new<F>(graph: Arc<GraphInner>, run: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let state = Arc::new(EffectState {
            id: graph.next_id(),
            graph: Arc::clone(&graph),
            run_fn: Box::new(run),
            disposed: AtomicBool::new(false),
        });
        graph.register_dependent(&(state.clone() as Arc<dyn DependentNode>));
        graph.register_effect(state.clone());

        if let Err(error) = state.execute() {
            tracing::error!(effect = %state.id, %error, "initial effect run failed");
        }

        Self { state }
    }

    /// Get the effect's node id.
    pub fn id(&self) -> NodeId {
        self.state.id
    }

    /// Stop the effect.
    ///
    /// All subscriptions are removed and child effects are disposed;
    /// subsequent writes to former dependencies never run it again.
    /// Calling `stop` more than once is a no-op.
    pub fn stop(&self) {
        self.state.graph.dispose_effect(self.state.id);
    }

    /// Whether the effect has been stopped.
    pub fn is_stopped(&self) -> bool {
        self.state.disposed.load(Ordering::SeqCst)
    }
}

impl EffectState {
    pub(crate) fn id(&self) -> NodeId {
        self.id
    }

    pub(crate) fn mark_disposed(&self) {
        self.disposed.store(true, Ordering::SeqCst);
    }

    /// Run the closure inside an evaluation frame and commit the reads.
    fn execute(&self) -> Result<(), ReactiveError> {
        if self.disposed.load(Ordering::SeqCst) {
            return Ok(());
        }

        // Children from the previous run are torn down before tracking
        // starts over; the body re-creates whichever ones it still wants.
        for child in self.graph.take_children(self.id) {
            self.graph.dispose_effect(child);
        }

        let frame = self.graph.push_frame(self.id, NodeKind::Effect);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| (self.run_fn)()));
        let reads = frame.finish();

        if self.disposed.load(Ordering::SeqCst) {
            // Stopped from within its own body: the disposal already
            // cleared our edges, leave them cleared.
            return Ok(());
        }

        match outcome {
            Ok(()) => {
                self.graph.commit_edges(self.id, &reads);
                self.graph
                    .take_pending_cycle()
                    .map_or(Ok(()), |error| Err(error))
            }
            Err(payload) => match payload.downcast::<CycleUnwind>() {
                Ok(unwind) => {
                    // Keep whatever was read before the failure so a
                    // later write retries the effect.
                    self.graph.commit_edges(self.id, &reads);
                    let _ = self.graph.take_pending_cycle();
                    Err(ReactiveError::CyclicDependency(unwind.0))
                }
                Err(other) => panic::resume_unwind(other),
            },
        }
    }
}

impl DependentNode for EffectState {
    fn id(&self) -> NodeId {
        self.id
    }

    fn mark_dirty(&self) {
        // Effects carry no dirty state: they are re-run immediately.
    }

    fn is_eager(&self) -> bool {
        true
    }

    fn run(&self) -> Result<(), ReactiveError> {
        self.execute()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Arc;

    use parking_lot::RwLock;

    use crate::reactive::{Effect, ReactiveGraph};

    #[test]
    fn effect_runs_on_creation() {
        let graph = ReactiveGraph::new();
        let runs = Arc::new(AtomicI32::new(0));

        let runs_clone = runs.clone();
        let _effect = graph.effect(move || {
            runs_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn effect_reruns_on_dependency_write() {
        let graph = ReactiveGraph::new();
        let source = graph.signal(0);
        let observed = Arc::new(AtomicI32::new(-1));

        let observed_clone = observed.clone();
        let source_clone = source.clone();
        let _effect = graph.effect(move || {
            observed_clone.store(source_clone.get(), Ordering::SeqCst);
        });

        assert_eq!(observed.load(Ordering::SeqCst), 0);

        source.set(42).unwrap();
        assert_eq!(observed.load(Ordering::SeqCst), 42);
    }

    #[test]
    fn stopped_effect_never_runs_again() {
        let graph = ReactiveGraph::new();
        let source = graph.signal(0);
        let runs = Arc::new(AtomicI32::new(0));

        let runs_clone = runs.clone();
        let source_clone = source.clone();
        let effect = graph.effect(move || {
            let _ = source_clone.get();
            runs_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(runs.load(Ordering::SeqCst), 1);

        effect.stop();
        assert!(effect.is_stopped());

        source.set(1).unwrap();
        source.set(2).unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn double_stop_is_a_noop() {
        let graph = ReactiveGraph::new();
        let effect = graph.effect(|| {});
        effect.stop();
        effect.stop();
        assert!(effect.is_stopped());
    }

    #[test]
    fn effect_can_stop_itself() {
        let graph = ReactiveGraph::new();
        let source = graph.signal(0);
        let runs = Arc::new(AtomicI32::new(0));
        let handle: Arc<RwLock<Option<Effect>>> = Arc::new(RwLock::new(None));

        let runs_clone = runs.clone();
        let source_clone = source.clone();
        let handle_clone = handle.clone();
        let effect = graph.effect(move || {
            let value = source_clone.get();
            runs_clone.fetch_add(1, Ordering::SeqCst);
            if value >= 1 {
                if let Some(this) = handle_clone.read().clone() {
                    this.stop();
                }
            }
        });
        *handle.write() = Some(effect.clone());

        assert_eq!(runs.load(Ordering::SeqCst), 1);

        // This run stops the effect from within its own body.
        source.set(1).unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 2);

        source.set(2).unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn other_effects_survive_a_sibling_stopping_itself() {
        let graph = ReactiveGraph::new();
        let source = graph.signal(0);
        let first_runs = Arc::new(AtomicI32::new(0));
        let second_runs = Arc::new(AtomicI32::new(0));
        let handle: Arc<RwLock<Option<Effect>>> = Arc::new(RwLock::new(None));

        let first_runs_clone = first_runs.clone();
        let source_clone = source.clone();
        let handle_clone = handle.clone();
        let first = graph.effect(move || {
            let _ = source_clone.get();
            first_runs_clone.fetch_add(1, Ordering::SeqCst);
            if let Some(this) = handle_clone.read().clone() {
                this.stop();
            }
        });
        *handle.write() = Some(first.clone());

        let second_runs_clone = second_runs.clone();
        let source_clone = source.clone();
        let _second = graph.effect(move || {
            let _ = source_clone.get();
            second_runs_clone.fetch_add(1, Ordering::SeqCst);
        });

        source.set(1).unwrap();
        source.set(2).unwrap();

        // The sibling keeps reacting after the first disposed itself.
        assert_eq!(second_runs.load(Ordering::SeqCst), 3);
        assert!(first_runs.load(Ordering::SeqCst) <= 2);
    }

    #[test]
    fn child_effect_is_disposed_when_parent_reruns() {
        let graph = ReactiveGraph::new();
        let outer = graph.signal(0);
        let inner = graph.signal(0);
        let child_runs = Arc::new(AtomicI32::new(0));

        let graph_clone = graph.clone();
        let outer_clone = outer.clone();
        let inner_clone = inner.clone();
        let child_runs_clone = child_runs.clone();
        let _parent = graph.effect(move || {
            let _ = outer_clone.get();
            let inner_for_child = inner_clone.clone();
            let child_runs_for_child = child_runs_clone.clone();
            // A fresh child per parent run; the previous one must die.
            let _child = graph_clone.effect(move || {
                let _ = inner_for_child.get();
                child_runs_for_child.fetch_add(1, Ordering::SeqCst);
            });
        });

        assert_eq!(child_runs.load(Ordering::SeqCst), 1);

        inner.set(1).unwrap();
        assert_eq!(child_runs.load(Ordering::SeqCst), 2);

        // Parent re-runs: old child disposed, new child created (runs once).
        outer.set(1).unwrap();
        assert_eq!(child_runs.load(Ordering::SeqCst), 3);

        // Only the latest child reacts.
        inner.set(2).unwrap();
        assert_eq!(child_runs.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn child_effect_is_disposed_when_parent_stops() {
        let graph = ReactiveGraph::new();
        let inner = graph.signal(0);
        let child_runs = Arc::new(AtomicI32::new(0));

        let graph_clone = graph.clone();
        let inner_clone = inner.clone();
        let child_runs_clone = child_runs.clone();
        let parent = graph.effect(move || {
            let inner_for_child = inner_clone.clone();
            let child_runs_for_child = child_runs_clone.clone();
            let _child = graph_clone.effect(move || {
                let _ = inner_for_child.get();
                child_runs_for_child.fetch_add(1, Ordering::SeqCst);
            });
        });

        assert_eq!(child_runs.load(Ordering::SeqCst), 1);

        parent.stop();
        inner.set(1).unwrap();
        assert_eq!(child_runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dispose_all_stops_everything() {
        let graph = ReactiveGraph::new();
        let source = graph.signal(0);
        let runs = Arc::new(AtomicI32::new(0));

        for _ in 0..3 {
            let runs_clone = runs.clone();
            let source_clone = source.clone();
            graph.effect(move || {
                let _ = source_clone.get();
                runs_clone.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(runs.load(Ordering::SeqCst), 3);
        assert_eq!(graph.effect_count(), 3);

        graph.dispose_all();
        assert_eq!(graph.effect_count(), 0);

        source.set(1).unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }
}
