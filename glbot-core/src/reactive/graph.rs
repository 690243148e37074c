//! Reactive Graph
//!
//! The graph is the central coordinator that connects signals, computeds,
//! and effects. It owns every piece of shared bookkeeping:
//!
//! - the id counter for nodes
//! - the edge tables (dependency and reverse-dependency)
//! - the registry of dependents (computeds and effects)
//! - the evaluation stack used for automatic dependency tracking
//!
//! There is no process-wide implicit state: a graph is constructed once at
//! startup, handed to whatever composes reactive values, and torn down with
//! a single [`ReactiveGraph::dispose_all`] call.
//!
//! # How It Works
//!
//! 1. When a computed or effect evaluates, it pushes a frame onto the
//!    evaluation stack. Signals and computeds read during the evaluation
//!    record themselves into that frame.
//!
//! 2. When the evaluation succeeds, the recorded reads replace the node's
//!    previous dependency set wholesale. Cells that were not read this
//!    time are unsubscribed, so conditional reads never leave stale edges.
//!
//! 3. When a signal's value changes, the graph walks the reverse edges,
//!    marks every transitive dependent dirty exactly once, and re-runs the
//!    affected effects. Computeds stay lazy: they recompute on next read,
//!    which resolves their own upstream dependencies depth-first. That
//!    pull order is what makes propagation glitch-free without an explicit
//!    topological sort.
//!
//! Propagation is eager per write: every `set` runs each affected effect
//! once before returning. There is no cross-write batching.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use smallvec::SmallVec;

use super::computed::Computed;
use super::effect::{Effect, EffectState};
use super::error::ReactiveError;
use super::node::{DependentNode, NodeId, NodeIdSource, NodeKind};
use super::signal::Signal;

/// Reads recorded during one evaluation frame.
pub(crate) type ReadSet = SmallVec<[NodeId; 8]>;

/// An entry in the evaluation stack.
#[derive(Debug)]
struct Frame {
    /// The node currently evaluating.
    node: NodeId,
    /// Whether the frame belongs to a computed or an effect.
    kind: NodeKind,
    /// Cells read so far during this evaluation.
    reads: ReadSet,
}

/// Handle to the reactive graph.
///
/// Cloning is cheap and every clone refers to the same graph. Signals,
/// computeds, and effects created through one handle interoperate with
/// those created through any other clone.
#[derive(Clone)]
pub struct ReactiveGraph {
    inner: Arc<GraphInner>,
}

pub(crate) struct GraphInner {
    ids: NodeIdSource,

    /// Reverse edges: cell id -> dependents subscribed to it.
    subscribers: RwLock<HashMap<NodeId, HashSet<NodeId>>>,

    /// Forward edges: dependent id -> cells it read last evaluation.
    dependencies: RwLock<HashMap<NodeId, SmallVec<[NodeId; 4]>>>,

    /// Every dependent node, held weakly so dropped computeds fall out
    /// of propagation on their own.
    nodes: RwLock<HashMap<NodeId, Weak<dyn DependentNode>>>,

    /// Strong references keeping effects alive until they are stopped.
    effects: RwLock<HashMap<NodeId, Arc<EffectState>>>,

    /// Parent effect -> child effects created during its last run.
    children: RwLock<HashMap<NodeId, Vec<NodeId>>>,

    /// The evaluation stack. Innermost frame last.
    frames: RwLock<Vec<Frame>>,

    /// Cycle failure noted while an effect frame was active, so the
    /// triggering write can report it even if the effect body ignored
    /// the failed read.
    pending_cycle: RwLock<Option<ReactiveError>>,
}

impl ReactiveGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(GraphInner {
                ids: NodeIdSource::default(),
                subscribers: RwLock::new(HashMap::new()),
                dependencies: RwLock::new(HashMap::new()),
                nodes: RwLock::new(HashMap::new()),
                effects: RwLock::new(HashMap::new()),
                children: RwLock::new(HashMap::new()),
                frames: RwLock::new(Vec::new()),
                pending_cycle: RwLock::new(None),
            }),
        }
    }

    /// Create a signal with the given initial value.
    ///
    /// Every write propagates, even if the new value equals the old one.
    /// Use [`ReactiveGraph::signal_distinct`] or
    /// [`ReactiveGraph::signal_with_equality`] to suppress redundant
    /// propagation.
    pub fn signal<T>(&self, value: T) -> Signal<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        Signal::new(self.inner.clone(), value, None)
    }

    /// Create a signal that skips propagation when the written value
    /// compares equal to the current one.
    pub fn signal_distinct<T>(&self, value: T) -> Signal<T>
    where
        T: Clone + PartialEq + Send + Sync + 'static,
    {
        Signal::new(self.inner.clone(), value, Some(Arc::new(T::eq)))
    }

    /// Create a signal with a custom equality predicate. Writes for which
    /// the predicate returns true are dropped without propagation.
    pub fn signal_with_equality<T, F>(&self, value: T, equals: F) -> Signal<T>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn(&T, &T) -> bool + Send + Sync + 'static,
    {
        Signal::new(self.inner.clone(), value, Some(Arc::new(equals)))
    }

    /// Create a computed cell. The closure does not run until first read.
    pub fn computed<T, F>(&self, compute: F) -> Computed<T>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        Computed::new(self.inner.clone(), compute)
    }

    /// Create an effect. The closure runs immediately to establish its
    /// initial dependencies and re-runs whenever any of them change.
    ///
    /// If the first run trips a cyclic dependency the effect stays
    /// registered (the failure is reported through `tracing`); a later
    /// write to one of the cells it managed to read retries it.
    pub fn effect<F>(&self, run: F) -> Effect
    where
        F: Fn() + Send + Sync + 'static,
    {
        Effect::new(self.inner.clone(), run)
    }

    /// Stop every effect registered with this graph.
    ///
    /// This is the single teardown call for an application shutdown: all
    /// effects are unsubscribed and become inert, exactly as if each had
    /// been stopped individually.
    pub fn dispose_all(&self) {
        let ids: Vec<NodeId> = self.inner.effects.read().keys().copied().collect();
        for id in ids {
            self.inner.dispose_effect(id);
        }
    }

    /// Number of live effects (stopped effects excluded).
    pub fn effect_count(&self) -> usize {
        self.inner.effects.read().len()
    }
}

impl Default for ReactiveGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphInner {
    pub(crate) fn next_id(&self) -> NodeId {
        self.ids.next_id()
    }

    /// Register a dependent node for dirty-marking and scheduling.
    pub(crate) fn register_dependent(&self, node: &Arc<dyn DependentNode>) {
        self.nodes.write().insert(node.id(), Arc::downgrade(node));
    }

    /// Register an effect: keep it alive, and adopt it under the
    /// enclosing effect frame if one is active.
    pub(crate) fn register_effect(&self, state: Arc<EffectState>) {
        let id = state.id();
        self.effects.write().insert(id, state);

        if let Some(parent) = self.enclosing_effect() {
            let parent_live = self.effects.read().contains_key(&parent);
            if parent_live {
                self.children.write().entry(parent).or_default().push(id);
            } else {
                // The parent stopped itself earlier in this same run.
                self.dispose_effect(id);
            }
        }
    }

    /// Stop an effect: drop the strong reference, tear down its edges,
    /// and recursively dispose any child effects it created. Idempotent.
    pub(crate) fn dispose_effect(&self, id: NodeId) {
        let state = self.effects.write().remove(&id);
        if let Some(state) = state {
            state.mark_disposed();
        }
        self.nodes.write().remove(&id);
        self.clear_edges(id);

        let children = self.children.write().remove(&id).unwrap_or_default();
        for child in children {
            self.dispose_effect(child);
        }
    }

    /// Take the children registered under a parent effect, leaving the
    /// parent ready to adopt a fresh set on its next run.
    pub(crate) fn take_children(&self, parent: NodeId) -> Vec<NodeId> {
        self.children.write().remove(&parent).unwrap_or_default()
    }

    /// Innermost active effect frame, if any.
    fn enclosing_effect(&self) -> Option<NodeId> {
        self.frames
            .read()
            .iter()
            .rev()
            .find(|frame| frame.kind == NodeKind::Effect)
            .map(|frame| frame.node)
    }

    /// Whether the given node is currently evaluating somewhere up the
    /// stack. Re-entering such a node is a cyclic dependency.
    pub(crate) fn is_on_stack(&self, id: NodeId) -> bool {
        self.frames.read().iter().any(|frame| frame.node == id)
    }

    /// Record a read of `id` into the innermost evaluation frame.
    /// Outside any frame this is a no-op: untracked reads have no side
    /// effect on the graph.
    pub(crate) fn track_read(&self, id: NodeId) {
        if let Some(frame) = self.frames.write().last_mut() {
            frame.reads.push(id);
        }
    }

    /// Enter an evaluation frame for `node`. The returned guard pops the
    /// frame when dropped, which keeps the stack balanced across unwinds.
    pub(crate) fn push_frame(self: &Arc<Self>, node: NodeId, kind: NodeKind) -> FrameGuard {
        self.frames.write().push(Frame {
            node,
            kind,
            reads: ReadSet::new(),
        });
        FrameGuard {
            graph: Arc::clone(self),
            node,
            finished: false,
        }
    }

    fn pop_frame(&self, node: NodeId) -> ReadSet {
        let popped = self.frames.write().pop();
        match popped {
            Some(frame) => {
                debug_assert_eq!(
                    frame.node, node,
                    "evaluation frame mismatch: expected {node}, got {}",
                    frame.node
                );
                frame.reads
            }
            None => ReadSet::new(),
        }
    }

    /// Replace `node`'s dependency set with the cells in `reads`.
    ///
    /// Old edges are removed first, so cells not read this evaluation no
    /// longer subscribe the node. Duplicate reads collapse to one edge.
    pub(crate) fn commit_edges(&self, node: NodeId, reads: &[NodeId]) {
        let mut subscribers = self.subscribers.write();
        let mut dependencies = self.dependencies.write();

        if let Some(old) = dependencies.remove(&node) {
            for dep in old {
                if let Some(set) = subscribers.get_mut(&dep) {
                    set.remove(&node);
                }
            }
        }

        let mut fresh: SmallVec<[NodeId; 4]> = SmallVec::new();
        for &dep in reads {
            if dep != node && !fresh.contains(&dep) {
                fresh.push(dep);
                subscribers.entry(dep).or_default().insert(node);
            }
        }
        if !fresh.is_empty() {
            dependencies.insert(node, fresh);
        }
    }

    /// Remove all of `node`'s dependency edges.
    pub(crate) fn clear_edges(&self, node: NodeId) {
        self.commit_edges(node, &[]);
    }

    /// Note a cycle failure hit while an effect frame was active, so the
    /// triggering write can surface it even if the effect body discarded
    /// the failed read.
    pub(crate) fn note_cycle(&self, error: &ReactiveError) {
        let inside_effect = self
            .frames
            .read()
            .iter()
            .any(|frame| frame.kind == NodeKind::Effect);
        if inside_effect {
            *self.pending_cycle.write() = Some(error.clone());
        }
    }

    pub(crate) fn take_pending_cycle(&self) -> Option<ReactiveError> {
        self.pending_cycle.write().take()
    }

    /// Propagate a change of `origin` to everything downstream.
    ///
    /// Marks every transitive dependent dirty exactly once, then re-runs
    /// the affected effects. The read locks are released before any
    /// effect body runs, so effects are free to create signals, stop
    /// themselves, or write other cells.
    pub(crate) fn notify_change(&self, origin: NodeId) -> Result<(), ReactiveError> {
        let mut to_run: Vec<Arc<dyn DependentNode>> = Vec::new();
        {
            let subscribers = self.subscribers.read();
            let nodes = self.nodes.read();
            let mut visited: HashSet<NodeId> = HashSet::new();
            let mut queue: VecDeque<NodeId> = subscribers
                .get(&origin)
                .map(|set| set.iter().copied().collect())
                .unwrap_or_default();

            while let Some(id) = queue.pop_front() {
                if !visited.insert(id) {
                    continue;
                }
                let Some(node) = nodes.get(&id).and_then(Weak::upgrade) else {
                    continue;
                };
                node.mark_dirty();
                if node.is_eager() {
                    to_run.push(node);
                }
                if let Some(next) = subscribers.get(&id) {
                    queue.extend(next.iter().copied());
                }
            }
        }

        let mut first_error: Option<ReactiveError> = None;
        for node in to_run {
            if let Err(error) = node.run() {
                tracing::error!(node = %node.id(), %error, "effect re-run failed");
                first_error.get_or_insert(error);
            }
        }
        match first_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    #[cfg(test)]
    pub(crate) fn subscriber_count(&self, id: NodeId) -> usize {
        self.subscribers
            .read()
            .get(&id)
            .map(HashSet::len)
            .unwrap_or(0)
    }
}

/// Guard for an evaluation frame.
///
/// [`FrameGuard::finish`] pops the frame and hands back the recorded
/// reads; dropping the guard without finishing (a panic unwinding
/// through the evaluation) pops the frame and discards them.
pub(crate) struct FrameGuard {
    graph: Arc<GraphInner>,
    node: NodeId,
    finished: bool,
}

impl FrameGuard {
    pub(crate) fn finish(mut self) -> ReadSet {
        self.finished = true;
        self.graph.pop_frame(self.node)
    }
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.graph.pop_frame(self.node);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inner(graph: &ReactiveGraph) -> &Arc<GraphInner> {
        &graph.inner
    }

    #[test]
    fn frames_balance_and_collect_reads() {
        let graph = ReactiveGraph::new();
        let inner = inner(&graph);
        let node = inner.next_id();
        let a = inner.next_id();
        let b = inner.next_id();

        assert!(!inner.is_on_stack(node));

        let frame = inner.push_frame(node, NodeKind::Computed);
        assert!(inner.is_on_stack(node));
        inner.track_read(a);
        inner.track_read(b);
        inner.track_read(a);

        let reads = frame.finish();
        assert_eq!(reads.as_slice(), &[a, b, a]);
        assert!(!inner.is_on_stack(node));
    }

    #[test]
    fn nested_frames_track_independently() {
        let graph = ReactiveGraph::new();
        let inner = inner(&graph);
        let outer = inner.next_id();
        let nested = inner.next_id();
        let a = inner.next_id();
        let b = inner.next_id();

        let outer_frame = inner.push_frame(outer, NodeKind::Effect);
        inner.track_read(a);
        {
            let nested_frame = inner.push_frame(nested, NodeKind::Computed);
            inner.track_read(b);
            assert_eq!(nested_frame.finish().as_slice(), &[b]);
        }
        inner.track_read(b);
        assert_eq!(outer_frame.finish().as_slice(), &[a, b]);
    }

    #[test]
    fn commit_edges_replaces_previous_set() {
        let graph = ReactiveGraph::new();
        let inner = inner(&graph);
        let node = inner.next_id();
        let a = inner.next_id();
        let b = inner.next_id();

        inner.commit_edges(node, &[a, b]);
        assert_eq!(inner.subscriber_count(a), 1);
        assert_eq!(inner.subscriber_count(b), 1);

        // B was not read this time: its edge must go away.
        inner.commit_edges(node, &[a]);
        assert_eq!(inner.subscriber_count(a), 1);
        assert_eq!(inner.subscriber_count(b), 0);

        inner.clear_edges(node);
        assert_eq!(inner.subscriber_count(a), 0);
    }

    #[test]
    fn duplicate_reads_collapse_to_one_edge() {
        let graph = ReactiveGraph::new();
        let inner = inner(&graph);
        let node = inner.next_id();
        let a = inner.next_id();

        inner.commit_edges(node, &[a, a, a]);
        assert_eq!(inner.subscriber_count(a), 1);
    }

    #[test]
    fn notify_change_without_subscribers_is_inert() {
        let graph = ReactiveGraph::new();
        let inner = inner(&graph);
        let id = inner.next_id();
        assert!(inner.notify_change(id).is_ok());
    }
}
