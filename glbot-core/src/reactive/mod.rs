//! Reactive Primitives
//!
//! This module implements the fine-grained reactive system driving the
//! glbot UI: signals, computeds, and effects connected by an explicit
//! dependency graph.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A [`Signal`] is a container for mutable state. When a signal's value
//! is read while a computed or effect is evaluating, the signal becomes
//! one of its dependencies. When the value changes, dependents are
//! notified.
//!
//! ## Computeds
//!
//! A [`Computed`] is a derived value that caches its result and
//! re-evaluates lazily: a write marks it dirty, the next read recomputes.
//!
//! ## Effects
//!
//! An [`Effect`] is a side-effecting subscriber that re-runs eagerly
//! whenever its dependencies change. Effects synchronize reactive state
//! with the outside world (in glbot, mostly the DOM-side renderer).
//!
//! # Implementation Notes
//!
//! Dependency tracking is automatic: each evaluation pushes a frame onto
//! the graph's evaluation stack, and every cell read during the closure
//! records itself into that frame. This approach (sometimes called
//! "transparent reactivity") is the one used by SolidJS, Vue 3, and
//! Leptos.
//!
//! Unlike those frameworks there is no ambient global runtime here: all
//! state lives in a [`ReactiveGraph`] constructed by the caller, which
//! makes the engine testable without a live renderer and lets an
//! application tear everything down with one
//! [`ReactiveGraph::dispose_all`] call.

mod computed;
mod effect;
mod error;
mod graph;
mod node;
mod signal;

pub use computed::Computed;
pub use effect::Effect;
pub use error::ReactiveError;
pub use graph::ReactiveGraph;
pub use node::{NodeId, NodeKind};
pub use signal::Signal;
