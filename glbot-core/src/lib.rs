//! glbot Core
//!
//! This crate provides the engine behind the glbot sheet browser.
//! It implements:
//!
//! - Reactive primitives (signals, computeds, effects) with automatic
//!   dependency tracking
//! - Sheet tree reconstruction from a convention-based directory layout
//!
//! The rendering layer consumes both: it wraps the (pure) sheet tree
//! builder inside a computed/effect pipeline so that a directory rescan
//! can be re-triggered by flipping a signal.
//!
//! # Architecture
//!
//! The crate is organized into two modules:
//!
//! - `reactive`: fine-grained reactivity and the dependency graph
//! - `sheet`: directory walking, path-grammar parsing, and the cell
//!   write path
//!
//! # Example
//!
//! ```rust
//! use glbot_core::reactive::ReactiveGraph;
//!
//! let graph = ReactiveGraph::new();
//!
//! // Create a signal
//! let count = graph.signal(0);
//!
//! // Create a derived value
//! let count_for_doubled = count.clone();
//! let doubled = graph.computed(move || count_for_doubled.get() * 2);
//!
//! // Create an effect
//! let count_for_effect = count.clone();
//! let effect = graph.effect(move || {
//!     let _ = count_for_effect.get();
//! });
//!
//! // Update the signal; the effect re-runs, the computed recomputes lazily
//! count.set(5).unwrap();
//! assert_eq!(doubled.get().unwrap(), 10);
//!
//! effect.stop();
//! ```

pub mod reactive;
pub mod sheet;
