//! New members and member extensions.

use smol_str::SmolStr;

use super::Pending;
use crate::base::{Location, SourceId};
use crate::hir::{
    ArtifactId, ArtifactKind, ExtensionId, ExtensionKind, ExtensionTarget, MemberExtension,
    MemberGroup, MessageParams,
};
use crate::semantic::Session;

impl Session {
    /// Drop extensions that can't apply to the kind of `art`.
    pub(super) fn check_extension_kinds(
        &mut self,
        art: ArtifactId,
        exts: Vec<ExtensionId>,
    ) -> Vec<ExtensionId> {
        let mut kept = Vec::with_capacity(exts.len());
        for ext in exts {
            let (kind, location, adds_elements) = {
                let e = self.model.extension(ext);
                let adds_elements = e
                    .members_of(MemberGroup::Elements)
                    .any(|(_, m)| matches!(m, MemberExtension::Define(_)));
                (e.kind, self.extension_location(ext), adds_elements)
            };
            let a = self.model.artifact(art);
            let problem = match (a.kind, kind) {
                (ArtifactKind::Namespace, ExtensionKind::Extend) => Some((
                    "extend-unexpected-kind",
                    MessageParams::new().kind(a.kind.display()),
                )),
                (ArtifactKind::Namespace, ExtensionKind::Annotate) => Some((
                    "anno-undefined-art",
                    MessageParams::new().name(self.model.display_name(art)),
                )),
                (ArtifactKind::Builtin, ExtensionKind::Extend) => Some((
                    "extend-unexpected-kind",
                    MessageParams::new().kind(a.kind.display()),
                )),
                (_, ExtensionKind::Extend) if a.is_generated() => Some((
                    "extend-unexpected-kind",
                    MessageParams::new().art(art).variant("generated"),
                )),
                (_, ExtensionKind::Extend) if adds_elements && !self.accepts_elements(art) => {
                    Some((
                        "extend-unexpected-kind",
                        MessageParams::new()
                            .art(art)
                            .kind(a.kind.display())
                            .variant("elements"),
                    ))
                }
                _ => None,
            };
            match problem {
                Some((id, params)) => {
                    self.report(id, location, Some(art), params);
                    self.discard_extension(ext);
                }
                None => kept.push(ext),
            }
        }
        kept
    }

    /// Structures without `type`, target or `many` can get new elements.
    fn accepts_elements(&self, art: ArtifactId) -> bool {
        let a = self.model.artifact(art);
        if !a.kind.can_have_elements() {
            return false;
        }
        a.elements.is_some() || (a.type_ref.is_none() && a.items.is_none() && !a.has_target())
    }

    pub(super) fn extension_location(&self, ext: ExtensionId) -> Location {
        let e = self.model.extension(ext);
        match &e.target {
            ExtensionTarget::Path(rid) => self.model.reference(*rid).location,
            ExtensionTarget::Member(_, location) => *location,
        }
    }

    /// Attach the members defined by `exts` to `art`.
    pub(super) fn define_members(&mut self, art: ArtifactId, exts: &[ExtensionId]) {
        let mut defining: Vec<(SourceId, Location)> = Vec::new();
        for &ext in exts {
            let (source, location, members) = {
                let e = self.model.extension(ext);
                let members: Vec<(MemberGroup, SmolStr, ArtifactId)> = e
                    .members
                    .iter()
                    .flat_map(|(group, members)| {
                        members.iter().filter_map(move |(name, member)| match member {
                            MemberExtension::Define(child) => Some((*group, name.clone(), *child)),
                            MemberExtension::Extend(_) => None,
                        })
                    })
                    .collect();
                (e.source, self.extension_location(ext), members)
            };
            if members.is_empty() {
                continue;
            }
            for (group, name, child) in members {
                if self.model.member(art, group, &name).is_some() {
                    let child_location = self.model.artifact(child).location;
                    let params = MessageParams::new().art(art).name(name);
                    self.report("duplicate-definition", child_location, Some(art), params);
                    // keep it reachable for messages, but not as a member
                    self.model.artifact_mut(child).parent = Some(art);
                    continue;
                }
                self.model.attach_member(art, group, name, child);
            }
            defining.push((source, location));
        }

        for (index, &(source, location)) in defining.iter().enumerate() {
            let earlier = defining[..index]
                .iter()
                .find(|(other, _)| self.layers.are_unrelated(source, *other));
            if let Some(&(_, other_location)) = earlier {
                let params = MessageParams::new().art(art).line(other_location.line());
                self.report("extend-unrelated-layer", location, Some(art), params);
            }
        }
    }

    /// Queue nested member extensions and remaining target path steps on the
    /// members of `art`.
    pub(super) fn route_member_extensions(
        &mut self,
        art: ArtifactId,
        exts: &[ExtensionId],
        routed: &[Pending],
    ) {
        let mut nested = Vec::new();
        for &ext in exts {
            let e = self.model.extension(ext);
            for (group, members) in &e.members {
                for (name, member) in members {
                    if let MemberExtension::Extend(child) = member {
                        nested.push((*group, name.clone(), *child));
                    }
                }
            }
        }
        for (group, name, child) in nested {
            match self.find_member(art, group, &name) {
                Some(member) => self.enqueue(
                    member,
                    Pending {
                        ext: child,
                        next_step: None,
                    },
                ),
                None => self.report_missing_member(art, group, &name, child),
            }
        }

        for pending in routed {
            let Some(index) = pending.next_step else {
                continue;
            };
            let ExtensionTarget::Path(rid) = &self.model.extension(pending.ext).target else {
                continue;
            };
            let reference = self.model.reference(*rid);
            let name = reference.path[index].id.clone();
            let next_step = (index + 1 < reference.path.len()).then_some(index + 1);
            match self.find_member(art, MemberGroup::Elements, &name) {
                Some(member) => self.enqueue(
                    member,
                    Pending {
                        ext: pending.ext,
                        next_step,
                    },
                ),
                None => self.report_missing_member(art, MemberGroup::Elements, &name, pending.ext),
            }
        }
    }

    /// Member lookup for extensions; elements of query entities are created
    /// first.
    fn find_member(&mut self, art: ArtifactId, group: MemberGroup, name: &str) -> Option<ArtifactId> {
        if group == MemberGroup::Elements && self.model.artifact(art).query.is_some() {
            self.ensure_query_elements(art);
        }
        self.model.member(art, group, name)
    }

    fn report_missing_member(
        &mut self,
        art: ArtifactId,
        group: MemberGroup,
        name: &SmolStr,
        ext: ExtensionId,
    ) {
        let location = self.extension_location(ext);
        let params = MessageParams::new().art(art).name(name.clone());
        let (id, params) = match self.model.extension(ext).kind {
            ExtensionKind::Annotate => match group {
                MemberGroup::Actions => ("anno-undefined-action", params),
                MemberGroup::Params => ("anno-undefined-param", params),
                _ => ("anno-undefined-element", params),
            },
            ExtensionKind::Extend => ("ref-undefined-element", params.variant("element")),
        };
        self.report(id, location, Some(art), params);
        self.discard_extension(ext);
    }
}
