//! Reference resolution.
//!
//! A reference is resolved in two stages: its first step is looked up in
//! the scope chains of its [`ExpectedContext`] (lexical scopes first, then
//! the dynamic dictionary of the context), the remaining steps navigate
//! nested definitions or the elements of the previous step.
//!
//! ## Module Structure
//!
//! - `context` - the per-context resolution table
//! - `environment` - [`Env`], scopes and name lookup
//! - `path` - root and step resolution, acceptance, dependency edges
//! - `expr` - expressions, enum symbols, `$self` backlinks
//! - `effective` - effective structure / target / enum of an artifact
//! - `query` - lazily populated elements of query entities
//! - `resolve_all` - the whole-model pass

mod context;
mod effective;
mod environment;
mod expr;
mod path;
mod query;
mod resolve_all;

pub use context::ExpectedContext;
pub use environment::Env;
pub(crate) use environment::{Found, Scope};
