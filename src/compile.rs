//! The compile pipeline.
//!
//! ```text
//! check_invariants → layers → extensions → resolve → cycles → propagate
//! ```

use tracing::{debug, info_span};

use crate::config::CompileOptions;
use crate::error::CompileError;
use crate::hir::{Diagnostic, Model};
use crate::semantic::{Layers, Session};

/// A resolved model.
#[derive(Debug)]
pub struct Compiled {
    pub model: Model,
    /// All diagnostics, errors included when compiled with
    /// [`CompileOptions::continue_after_errors`].
    pub diagnostics: Vec<Diagnostic>,
    pub layers: Layers,
    /// Extensions had to be applied without respecting `includes` order.
    pub used_unordered_fallback: bool,
}

impl Compiled {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.is_error())
    }

    /// Diagnostics with the given message id.
    pub fn diagnostics_with_id<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.id == id)
    }

    /// The diagnostics as a JSON array.
    #[cfg(feature = "serde")]
    pub fn diagnostics_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.diagnostics)
    }
}

/// Resolve references, apply extensions and propagate properties of `model`.
///
/// Fails with [`CompileError::Failed`] if an error was reported, unless
/// `options.continue_after_errors` is set, and with
/// [`CompileError::Internal`] if the input breaks the model invariants.
pub fn compile(model: Model, options: &CompileOptions) -> Result<Compiled, CompileError> {
    let _span = info_span!("compile").entered();
    model.check_invariants().map_err(CompileError::internal)?;

    let mut session = Session::new(model, options.clone());
    session.compute_layers();
    session.apply_extensions();
    session.resolve_all();
    session.report_cycles();
    session.propagate();

    let used_unordered_fallback = session.used_unordered_fallback();
    let (model, mut collector, layers) = session.into_parts();
    if let Some(ext) = model.extension_ids().find(|&e| !model.extension(e).is_consumed()) {
        return Err(CompileError::internal(format!(
            "extension at {} was never applied",
            model.extension(ext).location
        )));
    }

    if options.test_mode {
        collector.sort();
    }
    debug!(
        "[COMPILE] {} error(s), {} warning(s)",
        collector.error_count(),
        collector.warning_count()
    );
    let diagnostics = collector.take();
    if diagnostics.iter().any(|d| d.is_error()) && !options.continue_after_errors {
        return Err(CompileError::failed(diagnostics));
    }
    Ok(Compiled {
        model,
        diagnostics,
        layers,
        used_unordered_fallback,
    })
}
