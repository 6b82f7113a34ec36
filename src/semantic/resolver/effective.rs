//! Effective structure, target and enum of an artifact.
//!
//! Navigation follows `type`, association targets, table aliases and
//! `origin` until it reaches an artifact that carries the dictionary itself.
//! Every step resolves lazily, so these can be asked at any time.

use rustc_hash::FxHashSet;
use smol_str::SmolStr;

use super::context::ExpectedContext;
use crate::base::Location;
use crate::hir::{Artifact, ArtifactId, ArtifactKind, MemberGroup};
use crate::semantic::Session;

impl Session {
    /// The artifact whose `elements` are navigated for `art`.
    ///
    /// Returns `None` for scalars, arrays and unresolvable or cyclic chains.
    pub(crate) fn effective_struct(&mut self, art: ArtifactId) -> Option<ArtifactId> {
        let mut visited = FxHashSet::default();
        let mut current = art;
        loop {
            if !visited.insert(current) {
                return None;
            }
            self.ensure_extended(current);
            let a = self.model.artifact(current);
            if a.query.is_some() {
                self.ensure_query_elements(current);
                return Some(current);
            }
            if a.kind == ArtifactKind::Magic || a.elements.is_some() {
                return Some(current);
            }
            if a.kind == ArtifactKind::TableAlias {
                current = self.alias_source(current)?;
                continue;
            }
            if a.has_target() {
                current = self.target_of_lazy(current)?;
                continue;
            }
            if a.items.is_some() {
                return None;
            }
            if let Some(type_ref) = a.type_ref {
                let env = self.env_of(current);
                current = self.resolve_ref(type_ref, ExpectedContext::Type, &env)?;
                continue;
            }
            current = a.origin?;
        }
    }

    /// The entity (or association) a table alias selects from.
    pub(crate) fn alias_source(&mut self, alias: ArtifactId) -> Option<ArtifactId> {
        let source_ref = self.model.artifact(alias).source_ref?;
        let env = self.env_of(alias);
        self.resolve_ref(source_ref, ExpectedContext::From, &env)
    }

    /// The association target, resolved on demand.
    pub(crate) fn target_of_lazy(&mut self, art: ArtifactId) -> Option<ArtifactId> {
        let a = self.model.artifact(art);
        let (reference, ctx) = match (a.target, a.target_aspect) {
            (Some(target), _) => (target, ExpectedContext::Target),
            (None, Some(aspect)) => (aspect, ExpectedContext::TargetAspect),
            (None, None) => return None,
        };
        let env = self.env_of(art);
        self.resolve_ref(reference, ctx, &env)
    }

    /// The artifact carrying the enum symbols valid for `art`.
    pub(crate) fn effective_enum(&mut self, art: ArtifactId) -> Option<ArtifactId> {
        let mut visited = FxHashSet::default();
        let mut current = art;
        loop {
            if !visited.insert(current) {
                return None;
            }
            self.ensure_extended(current);
            let a = self.model.artifact(current);
            if a.enum_values.is_some() {
                return Some(current);
            }
            if let Some(type_ref) = a.type_ref {
                let env = self.env_of(current);
                current = self.resolve_ref(type_ref, ExpectedContext::Type, &env)?;
                continue;
            }
            current = a.origin?;
        }
    }

    /// True if `candidate` is `of` or an artifact `of` is derived from,
    /// following `origin` and the primary query source.
    pub(crate) fn is_in_origin_chain(&mut self, candidate: ArtifactId, of: ArtifactId) -> bool {
        let mut visited = FxHashSet::default();
        let mut current = of;
        loop {
            if current == candidate {
                return true;
            }
            if !visited.insert(current) {
                return false;
            }
            let a = self.model.artifact(current);
            let origin = a.origin;
            let primary = a.query.as_deref().and_then(|q| q.from.first().copied());
            let next = match (origin, primary) {
                (Some(origin), _) => Some(origin),
                (None, Some(alias)) => self.alias_source(alias),
                (None, None) => None,
            };
            let Some(next) = next else {
                return false;
            };
            current = next;
        }
    }

    /// `$session` accepts any element; create it on first use.
    pub(crate) fn session_variable_element(
        &mut self,
        structure: ArtifactId,
        name: &SmolStr,
    ) -> Option<ArtifactId> {
        let a = self.model.artifact(structure);
        if a.kind != ArtifactKind::Magic || a.parent.is_some() || a.name != "$session" {
            return None;
        }
        let element = self.model.push_artifact(Artifact::new(
            ArtifactKind::Magic,
            name.clone(),
            Location::default(),
        ));
        self.model
            .attach_member(structure, MemberGroup::Elements, name.clone(), element);
        Some(element)
    }
}
