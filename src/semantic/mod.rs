//! # Semantic Analysis
//!
//! Turns the unresolved [`Model`](crate::hir::Model) into a linked one. All
//! passes share one [`Session`]:
//!
//! ```text
//! graphs::set_layers      sources → layers
//!   ↓
//! extend                  extend / annotate, includes
//!   ↓
//! resolver                every reference → artifact, dependency edges
//!   ↓
//! graphs::detect_cycles   ref-cyclic
//!   ↓
//! propagate               inherited properties along origin / includes / type
//! ```
//!
//! Extension, resolution and propagation call into each other on demand:
//! navigating into an artifact extends it first, and propagation resolves
//! the `type` it follows. Status flags make every such call idempotent.

mod extend;
pub mod graphs;
mod propagate;
pub mod resolver;
mod session;
pub mod status;

pub use graphs::{DependencyGraph, Edge, Layer, Layers, set_layers};
pub use resolver::{Env, ExpectedContext};
pub use session::Session;
pub use status::{Status, StatusFlags};
