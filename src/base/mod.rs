//! Foundation types for the CDS toolchain.
//!
//! This module provides fundamental types used throughout the compiler:
//! - [`SourceId`] - Identifier of a source file in the model
//! - [`Position`], [`Span`] - Line/column positions
//! - [`Location`] - A span inside a particular source
//!
//! This module has NO dependencies on other crate modules.

mod file_id;
mod position;

pub use file_id::SourceId;
pub use position::{Location, Position, Span};
