//! Copying members of included aspects and types.

use rustc_hash::FxHashSet;
use smol_str::SmolStr;
use tracing::trace;

use crate::hir::{
    Artifact, ArtifactId, Expr, ExtensionId, Inferred, MemberGroup, Members, MessageParams, RefId,
    RelatedInfo, StepArg,
};
use crate::semantic::Session;
use crate::semantic::resolver::{Env, ExpectedContext};

impl Session {
    /// Copy the elements and actions of the artifacts `refs` name into `art`.
    ///
    /// With `leading`, the included members come first and a local member of
    /// the same name takes the position of the included one; otherwise the
    /// included members are appended.
    pub(crate) fn apply_includes(
        &mut self,
        art: ArtifactId,
        refs: &[RefId],
        env: &Env,
        leading: bool,
    ) {
        let mut bases = Vec::with_capacity(refs.len());
        for &rid in refs {
            let Some(base) = self.resolve_ref(rid, ExpectedContext::Include, env) else {
                continue;
            };
            if base == art || bases.contains(&base) {
                continue;
            }
            self.ensure_extended(base);
            bases.push(base);
        }
        if bases.is_empty() {
            return;
        }
        trace!(
            "[EXTEND] {} includes {} artifact(s)",
            self.model.display_name(art),
            bases.len()
        );

        for group in [MemberGroup::Elements, MemberGroup::Actions] {
            let locals = self
                .model
                .artifact(art)
                .members(group)
                .cloned()
                .unwrap_or_default();
            let mut merged = Members::new();
            for &base in &bases {
                let base_members = self
                    .model
                    .artifact(base)
                    .members(group)
                    .cloned()
                    .unwrap_or_default();
                for (name, member) in base_members {
                    if let Some(&existing) = merged.get(&name) {
                        self.check_override(art, existing, member, &name);
                        continue;
                    }
                    if let Some(&local) = locals.get(&name) {
                        self.check_override(art, local, member, &name);
                        if leading {
                            merged.insert(name, local);
                        }
                        continue;
                    }
                    let copy = self.copy_included(member, art);
                    merged.insert(name, copy);
                }
            }
            if merged.is_empty() {
                continue;
            }

            let combined: Members = if leading {
                let mut combined = merged;
                for (name, local) in locals {
                    combined.entry(name).or_insert(local);
                }
                combined
            } else {
                let mut combined = locals;
                for (name, copy) in merged {
                    combined.entry(name).or_insert(copy);
                }
                combined
            };
            *self.model.artifact_mut(art).members_mut(group) = combined;
        }
    }

    /// Includes added by `extend ... with Aspect`.
    pub(super) fn apply_extension_includes(&mut self, art: ArtifactId, exts: &[ExtensionId]) {
        for &ext in exts {
            let includes = self.model.extension(ext).includes.clone();
            if includes.is_empty() {
                continue;
            }
            self.model
                .artifact_mut(art)
                .includes
                .extend(includes.iter().copied());
            let env = self.extension_env(art, ext);
            self.apply_includes(art, &includes, &env, false);
        }
    }

    /// A member `art` gets from an include: a fresh artifact pointing back
    /// to `member` through `origin`, the rest is propagated later.
    fn copy_included(&mut self, member: ArtifactId, art: ArtifactId) -> ArtifactId {
        let source = self.model.artifact(member).clone();
        let mut copy = Artifact::new(source.kind, source.name.clone(), source.location);
        copy.origin = Some(member);
        copy.inferred = Some(Inferred::Include);
        copy.key = source.key.clone();
        copy.masked = source.masked.clone();
        copy.value = source.value.as_ref().map(|v| self.fresh_expr(v));
        copy.parent = Some(art);
        let id = self.model.push_artifact(copy);

        if let Some(params) = &source.params {
            for (name, &param) in params {
                let param_copy = self.copy_included(param, id);
                self.model
                    .attach_member(id, MemberGroup::Params, name.clone(), param_copy);
            }
        }
        id
    }

    /// Local and included members of one name must have the same shape.
    fn check_override(
        &mut self,
        art: ArtifactId,
        local: ArtifactId,
        included: ArtifactId,
        name: &SmolStr,
    ) {
        let local_written = self.written_member(local);
        let included_written = self.written_member(included);
        let local_shape = self.shape_of(local_written);
        let included_shape = self.shape_of(included_written);
        let variant = if local_shape.0 != included_shape.0 {
            "assoc"
        } else if local_shape.1 != included_shape.1 {
            "std"
        } else {
            return;
        };
        let location = if self.model.artifact(local).is_included() {
            self.model.artifact(art).location
        } else {
            self.model.artifact(local).location
        };
        let related = RelatedInfo {
            location: self.model.artifact(included_written).location,
            message: format!(
                "{} is defined here",
                self.model.display_name(included_written)
            )
            .into(),
        };
        let params = MessageParams::new().art(art).name(name.clone()).variant(variant);
        self.report_with(
            "ext-invalid-override",
            location,
            Some(art),
            params,
            None,
            vec![related],
        );
    }

    /// The written definition behind an included copy.
    fn written_member(&self, mut id: ArtifactId) -> ArtifactId {
        let mut steps = 0;
        loop {
            let a = self.model.artifact(id);
            match a.origin {
                Some(origin) if a.is_included() && steps < self.model.artifact_count() => {
                    id = origin;
                    steps += 1;
                }
                _ => return id,
            }
        }
    }

    /// (is association, is structured) of a written member, following
    /// its `type` chain.
    fn shape_of(&mut self, written: ArtifactId) -> (bool, bool) {
        let mut visited = FxHashSet::default();
        let mut current = written;
        loop {
            if !visited.insert(current) {
                return (false, false);
            }
            if current != written {
                self.ensure_extended(current);
            }
            let a = self.model.artifact(current);
            if a.has_target() {
                return (true, false);
            }
            if a.elements.is_some() {
                return (false, true);
            }
            let Some(type_ref) = a.type_ref.filter(|_| a.items.is_none()) else {
                return (false, false);
            };
            let env = self.env_of(current);
            match self.resolve_ref(type_ref, ExpectedContext::Type, &env) {
                Some(next) => current = next,
                None => return (false, false),
            }
        }
    }

    // ========================================================================
    // EXPRESSION COPIES
    // ========================================================================

    /// A deep copy of `expr` whose references are fresh and unresolved.
    pub(crate) fn fresh_expr(&mut self, expr: &Expr) -> Expr {
        match expr {
            Expr::Ref(rid) => Expr::Ref(self.fresh_ref(*rid)),
            Expr::Op { op, args, location } => Expr::Op {
                op: op.clone(),
                args: args.iter().map(|a| self.fresh_expr(a)).collect(),
                location: *location,
            },
            Expr::Func {
                name,
                args,
                location,
            } => Expr::Func {
                name: name.clone(),
                args: args.iter().map(|a| self.fresh_expr(a)).collect(),
                location: *location,
            },
            Expr::Literal(..) | Expr::EnumSymbol(..) => expr.clone(),
        }
    }

    fn fresh_ref(&mut self, rid: RefId) -> RefId {
        let mut copy = self.model.reference(rid).unresolved_copy();
        for step in &mut copy.path {
            if let Some(filter) = step.filter.take() {
                step.filter = Some(self.fresh_expr(&filter));
            }
            if let Some(args) = step.args.take() {
                let args: Vec<StepArg> = args
                    .into_iter()
                    .map(|arg| StepArg {
                        value: self.fresh_expr(&arg.value),
                        ..arg
                    })
                    .collect();
                step.args = Some(args);
            }
        }
        self.model.push_reference(copy)
    }
}
