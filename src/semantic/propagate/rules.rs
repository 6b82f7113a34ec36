//! What one propagation step copies.
//!
//! | property                        | origin | include | type |
//! |---------------------------------|--------|---------|------|
//! | annotations, doc                | yes    | yes     | yes  |
//! | key                             | yes    |         |      |
//! | type, type arguments, default   | yes    | yes     |      |
//! | not null, virtual, masked, ...  | yes    | yes     |      |
//! | target, on, cardinality         | unless the target is an `expand` shape |
//! | elements, enum, items, keys     | only if the target has no own `type` |

use smol_str::SmolStr;

use super::{Step, StepKind};
use crate::hir::{Annotation, Artifact, ArtifactId, Inferred, MemberGroup, Members, Prop};
use crate::semantic::Session;

/// Annotations that describe one artifact only.
const NEVER_PROPAGATED: &[&str] = &[
    "@cds.persistence.exists",
    "@cds.persistence.table",
    "@sql.append",
    "@sql.prepend",
    "@cds.autoexposed",
    "@cds.redirection.target",
    "@Analytics.hidden",
    "@Analytics.visible",
];

/// Annotations copied from a main artifact to a main artifact only.
const MAIN_ONLY: &[&str] = &[
    "@cds.autoexpose",
    "@fiori.draft.enabled",
    "@cds.persistence.skip",
];

fn inherit<T: Clone>(prop: &Prop<T>) -> Prop<T> {
    Prop {
        value: prop.value.clone(),
        location: prop.location,
        inferred: Some(Inferred::Propagated),
    }
}

fn fill<T: Clone>(slot: &mut Option<Prop<T>>, from: &Option<Prop<T>>) {
    if slot.is_none() {
        *slot = from.as_ref().map(inherit);
    }
}

impl Session {
    pub(super) fn apply_step(&mut self, step: Step) {
        let source = self.model.artifact(step.source).clone();
        let both_main =
            source.kind.is_main() && self.model.artifact(step.target).kind.is_main();
        self.copy_annotations(step.target, &source, both_main);
        if step.kind == StepKind::Type {
            return;
        }

        let target = self.model.artifact_mut(step.target);
        if step.kind == StepKind::Origin {
            fill(&mut target.key, &source.key);
        }
        if target.type_ref.is_none() {
            target.type_ref = source.type_ref;
        }
        fill(&mut target.type_args.length, &source.type_args.length);
        fill(&mut target.type_args.precision, &source.type_args.precision);
        fill(&mut target.type_args.scale, &source.type_args.scale);
        fill(&mut target.type_args.srid, &source.type_args.srid);
        fill(&mut target.default, &source.default);
        fill(&mut target.not_null, &source.not_null);
        fill(&mut target.is_virtual, &source.is_virtual);
        fill(&mut target.masked, &source.masked);
        fill(&mut target.localized, &source.localized);

        let mut copy_keys = false;
        if !target.expanded && !target.has_target() && source.has_target() {
            target.target = source.target;
            target.target_aspect = source.target_aspect;
            target.is_composition = source.is_composition;
            if target.on.is_none() {
                target.on = source.on.clone();
            }
            fill(&mut target.cardinality, &source.cardinality);
            copy_keys = target.foreign_keys.is_none();
        }
        let structural = target.type_ref.is_none();

        if copy_keys {
            self.copy_members(step.target, &source, MemberGroup::ForeignKeys);
        }
        if structural {
            self.copy_structure(step.target, &source);
        }
    }

    fn copy_annotations(&mut self, target: ArtifactId, source: &Artifact, both_main: bool) {
        let t = self.model.artifact_mut(target);
        for (name, annotation) in &source.annotations {
            if t.annotations.contains_key(name)
                || annotation.value.is_null()
                || NEVER_PROPAGATED.contains(&name.as_str())
                || (!both_main && MAIN_ONLY.contains(&name.as_str()))
            {
                continue;
            }
            let copy = Annotation {
                value: annotation.value.clone(),
                location: annotation.location,
                inferred: Some(Inferred::Propagated),
            };
            t.annotations.insert(name.clone(), copy);
        }
        fill(&mut t.doc, &source.doc);
    }

    /// Elements, enum symbols and the line type of `source` as proxies of
    /// `target`.
    fn copy_structure(&mut self, target: ArtifactId, source: &Artifact) {
        let t = self.model.artifact(target);
        let needs_elements = t.elements.is_none() && source.elements.is_some();
        let needs_enum = t.enum_values.is_none() && source.enum_values.is_some();
        let needs_items = t.items.is_none();
        if needs_elements {
            self.copy_members(target, source, MemberGroup::Elements);
        }
        if needs_enum {
            self.copy_members(target, source, MemberGroup::Enum);
        }
        if let (true, Some(items)) = (needs_items, source.items) {
            let proxy = self.proxy_of(items, SmolStr::new_static("items"), target);
            self.model.artifact_mut(target).items = Some(proxy);
        }
    }

    fn copy_members(&mut self, target: ArtifactId, source: &Artifact, group: MemberGroup) {
        let Some(members) = source.members(group) else {
            return;
        };
        let mut copies = Members::new();
        for (name, &member) in members {
            let proxy = self.proxy_of(member, name.clone(), target);
            copies.insert(name.clone(), proxy);
        }
        *self.model.artifact_mut(target).members_mut(group) = copies;
    }

    /// A new artifact standing for `original` inside `parent`; its own
    /// properties come from `original` when it is propagated.
    fn proxy_of(&mut self, original: ArtifactId, name: SmolStr, parent: ArtifactId) -> ArtifactId {
        let o = self.model.artifact(original);
        let mut proxy = Artifact::new(o.kind, name, o.location);
        proxy.origin = Some(original);
        proxy.inferred = Some(Inferred::Propagated);
        proxy.parent = Some(parent);
        self.model.push_artifact(proxy)
    }
}
