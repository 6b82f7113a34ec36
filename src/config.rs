//! Compile options

use rustc_hash::FxHashMap;

use crate::hir::Severity;
use crate::hir::messages::message_def;

/// Options for one compile run.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Return the model even if errors were reported.
    pub continue_after_errors: bool,
    /// Attach `valid_names` suggestions to undefined-reference diagnostics.
    pub collect_valid_names: bool,
    /// Sort diagnostics by location and id.
    pub test_mode: bool,
    /// Severity overrides by message id; only configurable messages change.
    pub severities: FxHashMap<String, Severity>,
    /// The model is generated code: auto-exposed entities may be referenced.
    pub internal: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            continue_after_errors: false,
            collect_valid_names: false,
            test_mode: false,
            severities: FxHashMap::default(),
            internal: false,
        }
    }
}

impl CompileOptions {
    pub fn with_continue_after_errors(mut self) -> Self {
        self.continue_after_errors = true;
        self
    }

    pub fn with_valid_names(mut self) -> Self {
        self.collect_valid_names = true;
        self
    }

    pub fn with_test_mode(mut self) -> Self {
        self.test_mode = true;
        self
    }

    pub fn with_severity(mut self, id: &str, severity: Severity) -> Self {
        self.severities.insert(id.to_string(), severity);
        self
    }

    /// Effective severity of message `id`.
    pub fn severity_of(&self, id: &str) -> Severity {
        let Some(def) = message_def(id) else {
            return Severity::Error;
        };
        if !def.configurable {
            return def.severity;
        }
        self.severities.get(id).copied().unwrap_or(def.severity)
    }
}
