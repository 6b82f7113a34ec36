//! # cds-base
//!
//! Semantic core of a CDS compiler: name resolution, extension application
//! and property propagation over an already-defined model.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! compile   → compile() pipeline, Compiled output
//!   ↓
//! semantic  → resolver, extend, propagate, graphs (cycles, layers), session
//!   ↓
//! hir       → arena model, references, extensions, builder, diagnostics
//!   ↓
//! base      → Primitives (SourceId, Position, Location)
//! ```
//!
//! ## Example
//!
//! ```
//! use cds::hir::{AnnoValue, ModelBuilder};
//! use cds::{CompileOptions, compile};
//!
//! let mut b = ModelBuilder::new();
//! b.source("db.cds");
//! let books = b.entity("Books").id();
//! b.element(books, "ID").ty("Integer").key();
//! b.annotate("Books").anno("title", AnnoValue::string("Books"));
//!
//! let compiled = compile(b.build(), &CompileOptions::default()).unwrap();
//! let books = compiled.model.definition("Books").unwrap();
//! assert!(compiled.model.annotation(books, "@title").is_some());
//! ```

// ============================================================================
// MODULES (dependency order: base → hir → semantic → compile)
// ============================================================================

/// Foundation types: SourceId, Position, Location
pub mod base;

/// High-level IR: the arena model and its builder
pub mod hir;

/// Semantic analysis: resolution, extensions, propagation, cycles
pub mod semantic;

/// The compile pipeline
pub mod compile;

/// Compile options
pub mod config;

/// Error types
pub mod error;

// Re-export the pipeline surface
pub use compile::{Compiled, compile};
pub use config::CompileOptions;
pub use error::CompileError;

// Re-export foundation types
pub use base::{Location, Position, SourceId, Span};
