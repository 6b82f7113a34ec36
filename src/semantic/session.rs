//! The compile session: the model plus all side tables of one run.

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use tracing::trace;

use super::graphs::{CycleReport, DependencyGraph, Layers, detect_cycles, set_layers};
use super::status::StatusFlags;
use crate::base::Location;
use crate::config::CompileOptions;
use crate::hir::messages::{MessageParams, message_def, render};
use crate::hir::{ArtifactId, Diagnostic, DiagnosticCollector, ExtensionId, Model, RelatedInfo};

/// An extension queued on an artifact.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Pending {
    pub ext: ExtensionId,
    /// Index of the next element step of the extension's target path still
    /// to be navigated; `None` once the queue owner is the final target.
    pub next_step: Option<usize>,
}

/// State of one compile run.
///
/// The engine components are `impl Session` blocks in their modules; they
/// share the model, the diagnostics and the status tables through it.
#[derive(Debug)]
pub struct Session {
    pub(crate) model: Model,
    pub(crate) options: CompileOptions,
    pub(crate) diagnostics: DiagnosticCollector,
    pub(crate) deps: DependencyGraph,
    pub(crate) layers: Layers,
    /// Extensions whose target could not be resolved, by target name.
    pub(crate) staged: IndexMap<SmolStr, Vec<ExtensionId>>,
    /// Extensions queued per artifact.
    pub(crate) pending: FxHashMap<ArtifactId, Vec<Pending>>,
    pub(crate) extend_status: StatusFlags,
    pub(crate) propagate_status: StatusFlags,
    pub(crate) elements_status: StatusFlags,
    pub(crate) used_unordered_fallback: bool,
}

impl Session {
    pub fn new(model: Model, options: CompileOptions) -> Self {
        Self {
            model,
            options,
            diagnostics: DiagnosticCollector::new(),
            deps: DependencyGraph::new(),
            layers: Layers::default(),
            staged: IndexMap::new(),
            pending: FxHashMap::default(),
            extend_status: StatusFlags::new(),
            propagate_status: StatusFlags::new(),
            elements_status: StatusFlags::new(),
            used_unordered_fallback: false,
        }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn diagnostics(&self) -> &DiagnosticCollector {
        &self.diagnostics
    }

    pub fn dependencies(&self) -> &DependencyGraph {
        &self.deps
    }

    pub fn layers(&self) -> &Layers {
        &self.layers
    }

    /// True if extension application had to ignore include ordering.
    pub fn used_unordered_fallback(&self) -> bool {
        self.used_unordered_fallback
    }

    pub fn into_parts(self) -> (Model, DiagnosticCollector, Layers) {
        (self.model, self.diagnostics, self.layers)
    }

    // ========================================================================
    // GRAPHS
    // ========================================================================

    /// Number the sources by their dependencies.
    pub fn compute_layers(&mut self) {
        self.layers = set_layers(self.model.sources());
    }

    /// Report the recorded dependency edges that lie on a cycle.
    ///
    /// Returns the number of cyclic components.
    pub fn report_cycles(&mut self) -> usize {
        let mut edges = Vec::new();
        let mut components = Vec::new();
        let cyclic = detect_cycles(self.model.artifact_count(), &self.deps, |report| {
            match report {
                CycleReport::Edge(edge) => edges.push(*edge),
                CycleReport::Component(members) => components.push(members),
            }
        });
        for edge in edges {
            let Some(location) = edge.location else {
                continue;
            };
            let params = MessageParams::new().art(edge.to);
            self.report("ref-cyclic", location, Some(edge.from), params);
        }
        for members in components {
            let Some(&first) = members.first() else {
                continue;
            };
            let names: Vec<SmolStr> = members
                .iter()
                .map(|&m| SmolStr::new(self.model.display_name(m)))
                .collect();
            let location = self.model.artifact(first).location;
            let params = MessageParams::new().names(names).variant("generic");
            self.report("ref-cyclic", location, Some(first), params);
        }
        cyclic
    }

    // ========================================================================
    // REPORTING
    // ========================================================================

    /// Report message `id` at `location`; `home` is the artifact the message
    /// is about. Returns `false` if the location was already flagged.
    pub(crate) fn report(
        &mut self,
        id: &'static str,
        location: Location,
        home: Option<ArtifactId>,
        params: MessageParams,
    ) -> bool {
        self.report_with(id, location, home, params, None, Vec::new())
    }

    pub(crate) fn report_with(
        &mut self,
        id: &'static str,
        location: Location,
        home: Option<ArtifactId>,
        params: MessageParams,
        valid_names: Option<IndexMap<SmolStr, ArtifactId>>,
        related: Vec<RelatedInfo>,
    ) -> bool {
        if self.diagnostics.is_flagged(location, id) {
            return false;
        }
        let severity = self.options.severity_of(id);
        let model = &self.model;
        let text = match message_def(id) {
            Some(def) => render(def, &params, &|a| model.display_name(a)),
            None => id.to_string(),
        };
        trace!("[REPORT] {} at {}: {}", id, location, text);
        let mut diagnostic = Diagnostic::new(severity, id, location, text).with_params(params);
        if let Some(home) = home {
            diagnostic = diagnostic.with_semantic_location(self.model.display_name(home));
        }
        if self.options.collect_valid_names {
            if let Some(names) = valid_names {
                diagnostic = diagnostic.with_valid_names(names);
            }
        }
        for info in related {
            diagnostic = diagnostic.with_related(info);
        }
        self.diagnostics.add(diagnostic)
    }
}
