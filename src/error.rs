//! Error types for the compile pipeline.

use thiserror::Error;

use crate::hir::Diagnostic;

/// The aggregate failure of [`compile`](crate::compile).
#[derive(Debug, Error)]
pub enum CompileError {
    /// At least one error-severity diagnostic was reported.
    #[error("compilation failed with {} error(s)", count_errors(.diagnostics))]
    Failed { diagnostics: Vec<Diagnostic> },

    /// The input model violates a contract of the define phase.
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl CompileError {
    /// Create a failure carrying the full diagnostic list.
    pub fn failed(diagnostics: Vec<Diagnostic>) -> Self {
        Self::Failed { diagnostics }
    }

    /// Create an internal (contract violation) error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Diagnostics of a failed compilation; empty for internal errors.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            Self::Failed { diagnostics } => diagnostics,
            Self::Internal { .. } => &[],
        }
    }
}

fn count_errors(diagnostics: &[Diagnostic]) -> usize {
    diagnostics.iter().filter(|d| d.is_error()).count()
}
