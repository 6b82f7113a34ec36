//! Extension application.
//!
//! `extend`/`annotate` statements are collected per target artifact and
//! applied when the artifact is first needed ([`Session::ensure_extended`])
//! or by the driver passes of [`Session::apply_extensions`], whichever
//! comes first.
//!
//! ## Order of application on one artifact
//!
//! 1. own `includes` (included members come first)
//! 2. new members of the extensions, sorted by layer, file and position
//! 3. `includes` added by extensions
//! 4. nested member extensions are queued on the members
//! 5. annotations, merged by layer ([`annotations`])
//! 6. type arguments, the last one wins
//! 7. members with queued extensions are extended in turn
//!
//! An artifact is ready for the driver when none of the artifacts it
//! includes still has queued extensions. If a full pass makes no progress
//! (include cycles), the rest is applied without that ordering and
//! [`Session::used_unordered_fallback`] reports it.

mod annotations;
mod ellipsis;
mod includes;
mod members;

use smol_str::SmolStr;
use tracing::{debug, trace, warn};

use super::resolver::{Env, ExpectedContext, Found, Scope};
use super::session::Pending;
use super::status::Status;
use crate::base::Location;
use crate::hir::{
    AnnoValue, ArtifactId, ArtifactKind, ExtensionId, ExtensionKind, ExtensionTarget, Link,
    MemberExtension, MemberGroup, MessageParams, RefId, RefScope,
};
use crate::semantic::Session;

impl Session {
    /// Apply all `extend` and `annotate` statements of the model.
    pub fn apply_extensions(&mut self) {
        self.strip_definition_ellipsis();
        self.collect_extensions();
        self.run_extension_passes();
        self.report_staged();
        debug!(
            "[EXTEND] {} extension(s) applied{}",
            self.model.extension_ids().count(),
            if self.used_unordered_fallback {
                " (unordered fallback used)"
            } else {
                ""
            }
        );
    }

    /// `...` in the annotation of a definition has nothing to splice.
    fn strip_definition_ellipsis(&mut self) {
        for id in self.model.artifact_ids() {
            let names: Vec<SmolStr> = self
                .model
                .artifact(id)
                .annotations
                .iter()
                .filter(|(_, a)| a.value.has_ellipsis())
                .map(|(name, _)| name.clone())
                .collect();
            for name in names {
                let Some(annotation) = self.model.artifact_mut(id).annotations.get_mut(&name) else {
                    continue;
                };
                let location = annotation.location;
                let value = std::mem::replace(&mut annotation.value, AnnoValue::Null);
                annotation.value = value.without_ellipsis();
                let params = MessageParams::new().art(id).name(name);
                self.report("anno-unexpected-ellipsis", location, Some(id), params);
            }
        }
    }

    // ========================================================================
    // COLLECTION
    // ========================================================================

    fn collect_extensions(&mut self) {
        for ext in self.model.extension_ids() {
            let extension = self.model.extension(ext);
            let ExtensionTarget::Path(rid) = &extension.target else {
                continue;
            };
            let rid = *rid;
            let ctx = target_context(extension.kind);
            let env = Env::in_source(extension.source);
            match self.extension_target(rid, ctx, &env) {
                Some((art, next_step)) => self.enqueue(art, Pending { ext, next_step }),
                None => {
                    let name = SmolStr::new(self.model.reference(rid).display_path());
                    self.staged.entry(name).or_default().push(ext);
                }
            }
        }
        debug!(
            "[EXTEND] {} artifact(s) with queued extensions, {} unknown target(s)",
            self.pending.len(),
            self.staged.len()
        );
    }

    /// The artifact part of an extension target path, plus the index of the
    /// first element step.
    ///
    /// Only definitions are navigated here: element steps are followed when
    /// the artifact itself is extended, so new elements are visible.
    fn extension_target(
        &mut self,
        rid: RefId,
        ctx: ExpectedContext,
        env: &Env,
    ) -> Option<(ArtifactId, Option<usize>)> {
        let reference = self.model.reference(rid).clone();
        let head = reference.path.first()?;
        let mut current = None;
        for scope in self.target_scopes(rid, ctx, env) {
            if let Found::One(art) = self.lookup(scope, &head.id) {
                current = Some(art);
                break;
            }
        }
        let mut current = current?;
        self.record_step(rid, 0, current);

        let artifact_end = reference.element_start.unwrap_or(reference.path.len());
        for index in 1..artifact_end {
            let step = &reference.path[index];
            let art = self.model.artifact(current);
            match art.sub_artifacts.get(&step.id) {
                Some(&next) => current = next,
                None if reference.element_start.is_none() && !is_container(art.kind) => {
                    return Some((current, Some(index)));
                }
                None => return None,
            }
            self.record_step(rid, index, current);
        }
        let next_step = (artifact_end < reference.path.len()).then_some(artifact_end);
        Some((current, next_step))
    }

    /// Scopes searched for the first step of an extension target.
    fn target_scopes(&self, rid: RefId, ctx: ExpectedContext, env: &Env) -> Vec<Scope> {
        if self.model.reference(rid).scope == RefScope::Global {
            return vec![Scope::Definitions];
        }
        let sem = ctx.semantics();
        let mut scopes = (sem.lexical)(self, env);
        scopes.extend((sem.dynamic)(self, env));
        scopes
    }

    pub(crate) fn enqueue(&mut self, art: ArtifactId, pending: Pending) {
        self.pending.entry(art).or_default().push(pending);
    }

    fn has_pending(&self, art: ArtifactId) -> bool {
        self.pending.get(&art).is_some_and(|q| !q.is_empty())
    }

    // ========================================================================
    // DRIVER
    // ========================================================================

    fn run_extension_passes(&mut self) {
        let mut pass = 0;
        loop {
            let mut waiting: Vec<ArtifactId> = self
                .pending
                .iter()
                .filter(|(_, queue)| !queue.is_empty())
                .map(|(&art, _)| art)
                .collect();
            if waiting.is_empty() {
                break;
            }
            waiting.sort();
            pass += 1;
            trace!("[EXTEND] pass {}: {} artifact(s) waiting", pass, waiting.len());

            let mut progressed = false;
            for &art in &waiting {
                if self.has_pending(art) && self.includes_ready(art) {
                    self.extend_now(art);
                    progressed = true;
                }
            }
            if !progressed {
                warn!(
                    "[EXTEND] no progress in pass {}, applying extensions of {} artifact(s) without include order",
                    pass,
                    waiting.len()
                );
                self.used_unordered_fallback = true;
                for art in waiting {
                    self.extend_now(art);
                }
            }
        }
    }

    /// None of the artifacts `art` includes has queued extensions.
    fn includes_ready(&mut self, art: ArtifactId) -> bool {
        let mut refs: Vec<(RefId, Env)> = Vec::new();
        let own_env = self.env_of(art);
        for &rid in &self.model.artifact(art).includes {
            refs.push((rid, own_env));
        }
        let queued: Vec<ExtensionId> = self
            .pending
            .get(&art)
            .into_iter()
            .flatten()
            .filter(|p| p.next_step.is_none())
            .map(|p| p.ext)
            .collect();
        for ext in queued {
            let env = self.extension_env(art, ext);
            for &rid in &self.model.extension(ext).includes {
                refs.push((rid, env));
            }
        }
        for (rid, env) in refs {
            if let Some(base) = self.resolve_ref(rid, ExpectedContext::Include, &env) {
                if base != art && self.has_pending(base) {
                    return false;
                }
            }
        }
        true
    }

    /// Environment for references written inside extension `ext` of `art`.
    fn extension_env(&self, art: ArtifactId, ext: ExtensionId) -> Env {
        Env {
            source: self.model.extension(ext).source,
            ..self.env_of(art)
        }
    }

    /// Apply the queue of `art`, including its own includes if that did not
    /// happen yet.
    fn extend_now(&mut self, art: ArtifactId) {
        if self.extend_status.get(art) == Status::Untouched {
            self.ensure_extended(art);
        } else {
            self.apply_queue(art);
        }
    }

    /// Make sure includes and queued extensions of `art` are applied.
    pub(crate) fn ensure_extended(&mut self, art: ArtifactId) {
        if !self.extend_status.begin(art) {
            return;
        }
        let includes = self.model.artifact(art).includes.clone();
        if !includes.is_empty() {
            let env = self.env_of(art);
            self.apply_includes(art, &includes, &env, true);
        }
        self.apply_queue(art);
        self.extend_status.finish(art);
    }

    fn apply_queue(&mut self, art: ArtifactId) {
        let Some(queue) = self.pending.remove(&art) else {
            return;
        };
        let (direct, routed): (Vec<Pending>, Vec<Pending>) =
            queue.into_iter().partition(|p| p.next_step.is_none());
        let mut exts: Vec<ExtensionId> = direct.into_iter().map(|p| p.ext).collect();
        self.sort_extensions(&mut exts);
        trace!(
            "[EXTEND] {}: {} extension(s), {} routed to members",
            self.model.display_name(art),
            exts.len(),
            routed.len()
        );

        let exts = self.check_extension_kinds(art, exts);
        self.define_members(art, &exts);
        self.apply_extension_includes(art, &exts);
        self.route_member_extensions(art, &exts, &routed);
        self.merge_annotations(art, &exts);
        self.merge_type_args(art, &exts);
        for &ext in &exts {
            self.model.extension_mut(ext).consumed = true;
            self.link_extension_target(ext, Some(art));
        }

        let mut members = Vec::new();
        for group in MemberGroup::ALL {
            for &member in self.model.artifact(art).members(group).into_iter().flatten().map(|(_, id)| id) {
                if self.has_pending(member) {
                    members.push(member);
                }
            }
        }
        for member in members {
            self.extend_now(member);
        }
    }

    /// Sort by layer, then file name, then position.
    fn sort_extensions(&self, exts: &mut [ExtensionId]) {
        exts.sort_by_cached_key(|&ext| {
            let e = self.model.extension(ext);
            let filename = self
                .model
                .sources()
                .get(e.source.index())
                .map(|s| s.filename.clone())
                .unwrap_or_default();
            (self.layers.number(e.source), filename, e.location)
        });
    }

    fn merge_type_args(&mut self, art: ArtifactId, exts: &[ExtensionId]) {
        for &ext in exts {
            let delta = self.model.extension(ext).type_args.clone();
            let args = &mut self.model.artifact_mut(art).type_args;
            if delta.length.is_some() {
                args.length = delta.length;
            }
            if delta.precision.is_some() {
                args.precision = delta.precision;
            }
            if delta.scale.is_some() {
                args.scale = delta.scale;
            }
            if delta.srid.is_some() {
                args.srid = delta.srid;
            }
        }
    }

    /// Set the target reference link of a top-level extension.
    pub(crate) fn link_extension_target(&mut self, ext: ExtensionId, art: Option<ArtifactId>) {
        let ExtensionTarget::Path(rid) = &self.model.extension(ext).target else {
            return;
        };
        let reference = self.model.reference_mut(*rid);
        if !reference.is_settled() {
            reference.set_link(art.map_or(Link::Unresolved, Link::Resolved));
        }
    }

    /// Mark an extension and its nested member extensions as consumed
    /// without applying them.
    pub(crate) fn discard_extension(&mut self, ext: ExtensionId) {
        let mut stack = vec![ext];
        while let Some(ext) = stack.pop() {
            let extension = self.model.extension_mut(ext);
            if extension.consumed {
                continue;
            }
            extension.consumed = true;
            for members in extension.members.values() {
                for member in members.values() {
                    if let MemberExtension::Extend(nested) = member {
                        stack.push(*nested);
                    }
                }
            }
            self.link_extension_target(ext, None);
        }
    }

    /// Extensions whose target was never found.
    fn report_staged(&mut self) {
        let staged = std::mem::take(&mut self.staged);
        for (name, exts) in staged {
            for ext in exts {
                let (ctx, source, target) = {
                    let e = self.model.extension(ext);
                    (target_context(e.kind), e.source, e.target.clone())
                };
                let location = self.target_location(&target);
                let valid_names = match target {
                    ExtensionTarget::Path(rid) => {
                        let scopes = self.target_scopes(rid, ctx, &Env::in_source(source));
                        self.valid_names(&scopes)
                    }
                    ExtensionTarget::Member(..) => None,
                };
                let params = MessageParams::new().name(name.clone());
                let not_found = ctx.semantics().not_found;
                self.report_with(not_found, location, None, params, valid_names, Vec::new());
                self.discard_extension(ext);
            }
        }
    }

    fn target_location(&self, target: &ExtensionTarget) -> Location {
        match target {
            ExtensionTarget::Path(rid) => self.model.reference(*rid).location,
            ExtensionTarget::Member(_, location) => *location,
        }
    }
}

fn target_context(kind: ExtensionKind) -> ExpectedContext {
    match kind {
        ExtensionKind::Extend => ExpectedContext::ExtendTarget,
        ExtensionKind::Annotate => ExpectedContext::AnnotateTarget,
    }
}

fn is_container(kind: ArtifactKind) -> bool {
    matches!(
        kind,
        ArtifactKind::Namespace | ArtifactKind::Context | ArtifactKind::Service
    )
}
