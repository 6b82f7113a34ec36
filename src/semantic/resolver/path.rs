//! Path resolution: the root step against the context's scope chains, then
//! the remaining steps through nested definitions or elements.

use indexmap::IndexMap;
use smol_str::SmolStr;
use tracing::trace;

use super::context::{ExpectedContext, Navigation};
use super::environment::{Env, Found, Scope};
use crate::hir::{
    ArtifactId, ArtifactKind, Generated, Link, MemberGroup, MessageParams, RefId, RefScope,
    Reference,
};
use crate::semantic::Session;

impl Session {
    /// Resolve reference `rid` written at `user` in context `ctx`.
    ///
    /// Resolution is idempotent: a settled reference returns its link
    /// without searching again and without new diagnostics.
    pub fn resolve(
        &mut self,
        rid: RefId,
        ctx: ExpectedContext,
        user: ArtifactId,
    ) -> Option<ArtifactId> {
        let env = self.env_of(user);
        self.resolve_ref(rid, ctx, &env)
    }

    pub(crate) fn resolve_ref(
        &mut self,
        rid: RefId,
        ctx: ExpectedContext,
        env: &Env,
    ) -> Option<ArtifactId> {
        match self.model.reference(rid).link() {
            Some(Link::Resolved(art)) => return Some(art),
            // re-entered while resolving: a cycle, reported by the cycle pass
            Some(Link::Resolving) | Some(Link::Unresolved) => return None,
            None => {}
        }
        self.model.reference_mut(rid).set_link(Link::Resolving);

        let found = self.walk_path(rid, ctx, env);
        let accepted = found.filter(|&art| self.accept_resolved(rid, ctx, env, art));
        self.model
            .reference_mut(rid)
            .set_link(accepted.map_or(Link::Unresolved, Link::Resolved));

        trace!(
            "[RESOLVE] {} {:?} -> {}",
            self.model.reference(rid).display_path(),
            ctx,
            accepted.map_or_else(|| "-".to_string(), |a| self.model.display_name(a))
        );
        accepted
    }

    fn walk_path(&mut self, rid: RefId, ctx: ExpectedContext, env: &Env) -> Option<ArtifactId> {
        let reference = self.model.reference(rid).clone();
        if reference.path.is_empty() {
            return None;
        }
        let (mut current, mut index) = self.resolve_root(rid, &reference, ctx, env)?;
        self.resolve_step_extras(&reference, index - 1, current, env);
        while index < reference.path.len() {
            current = self.resolve_step(rid, &reference, index, current, ctx, env)?;
            self.resolve_step_extras(&reference, index, current, env);
            index += 1;
        }
        Some(current)
    }

    pub(crate) fn record_step(&mut self, rid: RefId, index: usize, art: ArtifactId) {
        if let Some(step) = self.model.reference_mut(rid).path.get_mut(index) {
            step.artifact = Some(art);
        }
    }

    // ========================================================================
    // ROOT
    // ========================================================================

    /// Resolve the first step; returns the artifact and the number of
    /// steps consumed.
    fn resolve_root(
        &mut self,
        rid: RefId,
        reference: &Reference,
        ctx: ExpectedContext,
        env: &Env,
    ) -> Option<(ArtifactId, usize)> {
        let sem = ctx.semantics();
        let head = &reference.path[0];
        let name = head.id.as_str();

        match reference.scope {
            RefScope::Param => {
                let found = env
                    .main
                    .and_then(|m| self.model.member(m, MemberGroup::Params, name));
                let Some(param) = found else {
                    let params = match env.main {
                        Some(main) => MessageParams::new().art(main).name(name),
                        None => MessageParams::new().name(name).variant("none"),
                    };
                    self.report("ref-undefined-param", head.location, env.user, params);
                    return None;
                };
                self.record_step(rid, 0, param);
                return Some((param, 1));
            }
            RefScope::TypeOf if reference.element_start.is_none() => {
                let holder = env
                    .user
                    .and_then(|u| self.model.artifact(u).parent)
                    .or(env.main)?;
                let scopes = [Scope::Elements(holder)];
                return self
                    .root_in_scopes(rid, reference, &scopes, "ref-undefined-element", env)
                    .map(|a| (a, 1));
            }
            _ => {}
        }

        if name.starts_with('$') && reference.scope != RefScope::Global {
            match name {
                "$self" | "$projection" => {
                    if !sem.allows_self {
                        let params = MessageParams::new().name(reference.display_path());
                        self.report("ref-unexpected-self", head.location, env.user, params);
                        return None;
                    }
                    let this = env.query.or(env.main)?;
                    self.record_step(rid, 0, this);
                    return Some((this, 1));
                }
                "$parameters" if sem.allows_magic => {
                    let main = env.main?;
                    self.record_step(rid, 0, main);
                    let Some(step) = reference.path.get(1) else {
                        return Some((main, 1));
                    };
                    let Some(param) = self.model.member(main, MemberGroup::Params, &step.id) else {
                        let params = MessageParams::new().art(main).name(step.id.clone());
                        self.report("ref-undefined-param", step.location, env.user, params);
                        return None;
                    };
                    self.record_step(rid, 1, param);
                    return Some((param, 2));
                }
                _ if sem.allows_magic => {
                    let Some(var) = self.model.magic(name) else {
                        let mut names = IndexMap::new();
                        for (n, id) in self.model.magic_variables() {
                            names.insert(n.clone(), id);
                        }
                        self.report_with(
                            "ref-undefined-var",
                            head.location,
                            env.user,
                            MessageParams::new().name(name),
                            Some(names),
                            Vec::new(),
                        );
                        return None;
                    };
                    self.record_step(rid, 0, var);
                    return Some((var, 1));
                }
                _ => {}
            }
        }

        let scopes = if reference.scope == RefScope::Global {
            vec![Scope::Definitions]
        } else {
            let mut scopes = (sem.lexical)(self, env);
            scopes.extend((sem.dynamic)(self, env));
            scopes
        };
        self.root_in_scopes(rid, reference, &scopes, sem.not_found, env)
            .map(|a| (a, 1))
    }

    fn root_in_scopes(
        &mut self,
        rid: RefId,
        reference: &Reference,
        scopes: &[Scope],
        not_found: &'static str,
        env: &Env,
    ) -> Option<ArtifactId> {
        let head = &reference.path[0];
        for &scope in scopes {
            match self.lookup(scope, &head.id) {
                Found::One(art) => {
                    self.record_step(rid, 0, art);
                    return Some(art);
                }
                Found::Ambiguous(names) => {
                    let params = MessageParams::new().name(head.id.clone()).names(names);
                    self.report("ref-ambiguous", head.location, env.user, params);
                    return None;
                }
                Found::Nothing => {}
            }
        }
        let valid_names = self.valid_names(scopes);
        let mut params = MessageParams::new().name(head.id.clone());
        if let Some(art) = env.user.filter(|_| not_found == "anno-undefined-element") {
            params = params.art(art);
        }
        self.report_with(not_found, head.location, env.user, params, valid_names, Vec::new());
        None
    }

    pub(crate) fn valid_names(&mut self, scopes: &[Scope]) -> Option<IndexMap<SmolStr, ArtifactId>> {
        if !self.options.collect_valid_names {
            return None;
        }
        let mut names = IndexMap::new();
        for &scope in scopes {
            self.scope_names(scope, &mut names);
        }
        Some(names)
    }

    // ========================================================================
    // PATH STEPS
    // ========================================================================

    fn resolve_step(
        &mut self,
        rid: RefId,
        reference: &Reference,
        index: usize,
        prev: ArtifactId,
        ctx: ExpectedContext,
        env: &Env,
    ) -> Option<ArtifactId> {
        let step = &reference.path[index];
        let in_elements = reference.element_start.is_some_and(|s| index >= s);
        let prev_art = self.model.artifact(prev);
        let artifact_mode = !in_elements
            && ctx.semantics().navigation == Navigation::Artifacts
            && prev_art.parent.is_none()
            && prev_art.kind.is_main();

        if artifact_mode {
            if let Some(&next) = prev_art.sub_artifacts.get(&step.id) {
                self.record_step(rid, index, next);
                return Some(next);
            }
            // without `:`, a definition path may continue with elements
            let container = matches!(
                prev_art.kind,
                ArtifactKind::Namespace | ArtifactKind::Context | ArtifactKind::Service
            );
            if reference.element_start.is_some() || container {
                let name = reference.path[..=index]
                    .iter()
                    .map(|s| s.id.as_str())
                    .collect::<Vec<_>>()
                    .join(".");
                let valid_names = self.options.collect_valid_names.then(|| {
                    prev_art
                        .sub_artifacts
                        .iter()
                        .map(|(n, id)| (n.clone(), *id))
                        .collect()
                });
                self.report_with(
                    "ref-undefined-def",
                    step.location,
                    env.user,
                    MessageParams::new().name(name),
                    valid_names,
                    Vec::new(),
                );
                return None;
            }
        }

        let Some(structure) = self.effective_struct(prev) else {
            let variant = if self.model.artifact(prev).items.is_some() {
                "many"
            } else {
                "std"
            };
            let params = MessageParams::new()
                .art(prev)
                .name(step.id.clone())
                .variant(variant);
            self.report("ref-invalid-navigation", step.location, env.user, params);
            return None;
        };

        let found = self
            .model
            .element(structure, &step.id)
            .or_else(|| self.session_variable_element(structure, &step.id));
        if let Some(element) = found {
            self.record_step(rid, index, element);
            return Some(element);
        }

        let (id, variant) = if self.model.artifact(structure).kind == ArtifactKind::Magic {
            ("ref-undefined-var", "element")
        } else if ctx == ExpectedContext::AnnoValue {
            ("anno-undefined-element", "std")
        } else {
            ("ref-undefined-element", "element")
        };
        let valid_names = self.valid_names(&[Scope::Elements(structure)]);
        let params = MessageParams::new()
            .art(prev)
            .name(step.id.clone())
            .variant(variant);
        self.report_with(id, step.location, env.user, params, valid_names, Vec::new());
        None
    }

    /// Arguments and filter of step `index`, which denotes `art`.
    fn resolve_step_extras(
        &mut self,
        reference: &Reference,
        index: usize,
        art: ArtifactId,
        env: &Env,
    ) {
        let Some(step) = reference.path.get(index) else {
            return;
        };
        if let Some(args) = &step.args {
            let params = self.model.artifact(art).params.clone();
            match params {
                None => {
                    let params = MessageParams::new().art(art);
                    self.report("ref-unexpected-args", step.location, env.user, params);
                }
                Some(declared) => {
                    for arg in args {
                        if !declared.contains_key(&arg.name) {
                            let params = MessageParams::new().art(art).name(arg.name.clone());
                            self.report("ref-undefined-param", arg.location, env.user, params);
                        }
                    }
                }
            }
            let ctx = if env.query.is_some() {
                ExpectedContext::Expr
            } else {
                ExpectedContext::Calc
            };
            for arg in args {
                self.resolve_expr(&arg.value, ctx, env);
            }
        }
        if let Some(filter) = &step.filter {
            let base = self.effective_struct(art);
            let filter_env = env.with_base(base);
            self.resolve_expr(filter, ExpectedContext::Filter, &filter_env);
        }
    }

    // ========================================================================
    // ACCEPTANCE
    // ========================================================================

    fn accept_resolved(
        &mut self,
        rid: RefId,
        ctx: ExpectedContext,
        env: &Env,
        art: ArtifactId,
    ) -> bool {
        let sem = ctx.semantics();
        let location = self.model.reference(rid).location;
        if let Err(id) = (sem.accept)(&self.model, env, art) {
            let kind = self.model.artifact(art).kind.display();
            let params = MessageParams::new().art(art).kind(kind);
            self.report(id, location, env.user, params);
            return false;
        }

        let generated_user = env.user.is_some_and(|u| self.model.artifact(u).is_generated());
        if self.model.artifact(art).generated == Some(Generated::AutoExposed)
            && !self.options.internal
            && !generated_user
        {
            let params = MessageParams::new().art(art);
            self.report("ref-unexpected-autoexposed", location, env.user, params);
            return false;
        }

        let via_self = matches!(
            self.model.reference(rid).head().map(|h| h.as_str()),
            Some("$self" | "$projection")
        );
        if sem.dependency && !via_self {
            if let Some(user) = env.user {
                self.deps.add_located(user, art, location);
            }
        }
        true
    }
}
