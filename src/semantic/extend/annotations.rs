//! Layered merge of annotation assignments.
//!
//! Assignments from extensions are peeled into frontiers: the assignments
//! no other remaining assignment's layer depends on come first. The first
//! frontier with a plain (non-`...`) value wins, and the `...` values of the
//! frontiers above it are spliced onto it, least specific first.
//!
//! ```text
//! layer 3:  @A: [..., 'c']      frontier 0   (spliced last)
//! layer 2:  @A: ['a', 'b']      frontier 1   (stops: plain value)
//! layer 1:  @A: ['x']           ignored
//! ```

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::base::SourceId;
use crate::hir::{AnnoValue, Annotation, ArtifactId, ExtensionId, MessageParams};
use crate::semantic::Session;

/// One assignment together with the source of its extension.
#[derive(Clone, Debug)]
struct Assignment {
    source: SourceId,
    annotation: Annotation,
}

impl Session {
    /// Merge the annotation assignments of `exts` (sorted) into `art`.
    pub(super) fn merge_annotations(&mut self, art: ArtifactId, exts: &[ExtensionId]) {
        let mut by_name: IndexMap<SmolStr, Vec<Assignment>> = IndexMap::new();
        for &ext in exts {
            let extension = self.model.extension(ext);
            for (name, annotation) in &extension.annotations {
                by_name.entry(name.clone()).or_default().push(Assignment {
                    source: extension.source,
                    annotation: annotation.clone(),
                });
            }
        }
        for (name, assignments) in by_name {
            let merged = self.merge_layered(art, &name, assignments);
            self.model.artifact_mut(art).annotations.insert(name, merged);
        }
    }

    fn merge_layered(
        &mut self,
        art: ArtifactId,
        name: &SmolStr,
        assignments: Vec<Assignment>,
    ) -> Annotation {
        let mut remaining = assignments;
        let mut frontiers: Vec<Vec<Assignment>> = Vec::new();
        let mut overwritten = false;
        while !remaining.is_empty() {
            let sources: Vec<SourceId> = remaining.iter().map(|a| a.source).collect();
            let layers = &self.layers;
            let (mut frontier, rest): (Vec<Assignment>, Vec<Assignment>) =
                remaining.into_iter().partition(|a| {
                    !sources
                        .iter()
                        .any(|&other| layers.is_dominated(a.source, other))
                });
            remaining = rest;
            if frontier.is_empty() {
                frontier = std::mem::take(&mut remaining);
            }
            self.check_frontier(art, name, &frontier);
            let plain = frontier.iter().any(|a| !a.annotation.value.has_ellipsis());
            frontiers.push(frontier);
            if plain {
                overwritten = true;
                break;
            }
        }

        let own = self.model.artifact(art).annotations.get(name).cloned();
        let mut location = own.as_ref().map(|a| a.location).unwrap_or_default();
        let mut base = if overwritten { None } else { own.map(|a| a.value) };
        for frontier in frontiers.iter().rev() {
            for assignment in frontier {
                let value = if assignment.annotation.value.has_ellipsis() {
                    self.splice_ellipsis(art, name, &assignment.annotation, base.take())
                } else {
                    assignment.annotation.value.clone()
                };
                base = Some(value);
                location = assignment.annotation.location;
            }
        }
        Annotation::new(base.unwrap_or(AnnoValue::Null), location)
    }

    /// More than one assignment in one frontier: none overrides the others.
    fn check_frontier(&mut self, art: ArtifactId, name: &SmolStr, frontier: &[Assignment]) {
        let Some(first) = frontier.first() else {
            return;
        };
        for other in &frontier[1..] {
            let id = if other.source == first.source {
                "anno-duplicate-same-file"
            } else if self.layers.same_layer(other.source, first.source) {
                "anno-duplicate"
            } else {
                "anno-duplicate-unrelated-layer"
            };
            let params = MessageParams::new().art(art).name(name.clone());
            self.report(id, other.annotation.location, Some(art), params);
        }
    }
}
