//! High-level IR (HIR): the CDS model graph.
//!
//! The model is an arena: artifacts, references and extensions live in
//! vectors inside [`Model`] and point at each other through index newtypes.
//! The semantic engine mutates this graph in place.
//!
//! ## Key Types
//!
//! - [`Model`]: the arena and the definitions table
//! - [`Artifact`]: a definition or member
//! - [`Reference`]: a path expression with a write-once [`Link`]
//! - [`Extension`]: a pending `extend`/`annotate` statement
//! - [`ModelBuilder`]: programmatic construction of the unresolved model
//! - [`Diagnostic`] / [`DiagnosticCollector`]: modeling errors
//!
//! ## Shape
//!
//! ```text
//! Model
//!  ├── definitions: absolute name → main artifact
//!  ├── artifacts[]   parent / elements / origin / type_ref ...
//!  ├── refs[]        path steps + link
//!  ├── extensions[]  target path + annotations / members / includes
//!  └── sources[]     usings, dependencies, file-level names
//! ```

mod annotation;
mod artifact;
pub mod builder;
mod diagnostics;
mod expr;
mod extension;
mod ids;
pub mod messages;
mod model;
mod query;
mod reference;
mod source;

pub use annotation::{AnnoValue, Annotation, anno_name};
pub use artifact::{
    Artifact, ArtifactKind, CardMax, Cardinality, Flag, Generated, Inferred, MemberGroup, Members,
    Prop, TypeArgs,
};
pub use builder::{ArtDef, ExtDef, ModelBuilder, QueryDef, eq, func, op};
pub use diagnostics::{Diagnostic, DiagnosticCollector, RelatedInfo, Severity};
pub use expr::{Expr, Literal};
pub use extension::{Extension, ExtensionKind, ExtensionTarget, MemberExtension};
pub use ids::{ArtifactId, ExtensionId, RefId};
pub use messages::MessageParams;
pub use model::Model;
pub use query::{Column, ColumnValue, Query};
pub use reference::{Link, PathStep, RefScope, Reference, StepArg};
pub use source::{Source, Using};
