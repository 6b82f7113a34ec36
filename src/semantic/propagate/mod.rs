//! Property propagation.
//!
//! Properties an artifact does not carry itself are copied from the
//! artifacts it derives from. For one artifact the chain of ancestors is
//! collected first and then replayed from the most distant ancestor on, so
//! each step copies from a source that is already complete:
//!
//! ```text
//! D ──include──▶ C ──include──▶ B          chain:  D←C, C←B
//!                                          replay: C←B, then D←C
//! ```
//!
//! Copies only fill properties that are absent. An artifact met again while
//! its chain is being built (a cycle) contributes nothing.

mod rules;

use tracing::{debug, trace};

use super::resolver::ExpectedContext;
use super::status::Status;
use crate::hir::{ArtifactId, ArtifactKind};
use crate::semantic::Session;

/// The relation a propagation step follows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum StepKind {
    /// `origin` of a query element, a wildcard element or a proxy.
    Origin,
    /// An included member, or an `includes` entry of the artifact itself.
    Include,
    /// The `type` of the artifact: annotations and doc only.
    Type,
}

/// Copy from `source` into `target`.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Step {
    pub target: ArtifactId,
    pub source: ArtifactId,
    pub kind: StepKind,
}

impl Session {
    /// Propagate properties into every artifact of the model.
    pub fn propagate(&mut self) {
        let mut next = 0;
        loop {
            let count = self.model.artifact_count();
            if next == count {
                break;
            }
            for index in next..count {
                self.propagate_artifact(ArtifactId::from_index(index));
            }
            next = count;
        }
        debug!(
            "[PROPAGATE] done, {} artifact(s)",
            self.model.artifact_count()
        );
    }

    pub(crate) fn propagate_artifact(&mut self, id: ArtifactId) {
        if self.propagate_status.get(id) != Status::Untouched || self.is_orphan(id) {
            return;
        }
        let mut chain: Vec<Step> = Vec::new();
        let mut visited = Vec::new();
        let mut current = id;
        loop {
            if !self.propagate_status.begin(current) {
                break;
            }
            visited.push(current);

            let includes = self.resolved_includes(current);
            for &base in &includes {
                self.propagate_artifact(base);
            }
            for &base in includes.iter().rev() {
                chain.push(Step {
                    target: current,
                    source: base,
                    kind: StepKind::Include,
                });
            }

            let Some((next, kind)) = self.derived_from(current) else {
                break;
            };
            chain.push(Step {
                target: current,
                source: next,
                kind,
            });
            current = next;
        }

        trace!(
            "[PROPAGATE] {}: {} step(s)",
            self.model.display_name(id),
            chain.len()
        );
        for step in chain.iter().rev() {
            if self.propagate_status.get(step.source) == Status::InProgress
                && !visited.contains(&step.source)
            {
                // source is on an outer chain still being built
                continue;
            }
            self.apply_step(*step);
        }
        for art in visited {
            self.propagate_status.finish(art);
        }
    }

    /// Member of an extension that was never applied.
    fn is_orphan(&self, id: ArtifactId) -> bool {
        let a = self.model.artifact(id);
        a.parent.is_none() && !a.kind.is_main() && a.kind != ArtifactKind::Magic
    }

    fn resolved_includes(&mut self, art: ArtifactId) -> Vec<ArtifactId> {
        let includes = self.model.artifact(art).includes.clone();
        if includes.is_empty() {
            return Vec::new();
        }
        let env = self.env_of(art);
        includes
            .into_iter()
            .filter_map(|rid| self.resolve_ref(rid, ExpectedContext::Include, &env))
            .filter(|&base| base != art)
            .collect()
    }

    /// The nearest ancestor: `origin`, the entity a single-source query
    /// selects from, else the resolved `type`.
    fn derived_from(&mut self, art: ArtifactId) -> Option<(ArtifactId, StepKind)> {
        let a = self.model.artifact(art);
        if let Some(q) = a.query.as_deref() {
            let primary = (q.from.len() == 1).then(|| q.from[0]);
            self.ensure_query_elements(art);
            let source = self.alias_source(primary?)?;
            let is_entity = self.model.artifact(source).kind == ArtifactKind::Entity;
            return (is_entity && source != art).then_some((source, StepKind::Origin));
        }
        if let Some(origin) = a.origin {
            let kind = if a.is_included() {
                StepKind::Include
            } else {
                StepKind::Origin
            };
            return Some((origin, kind));
        }
        let type_ref = a.type_ref?;
        let env = self.env_of(art);
        let ty = self.resolve_ref(type_ref, ExpectedContext::Type, &env)?;
        (ty != art).then_some((ty, StepKind::Type))
    }
}
