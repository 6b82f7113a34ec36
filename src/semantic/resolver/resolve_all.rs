//! The whole-model resolution pass.

use tracing::debug;

use super::context::ExpectedContext;
use crate::hir::{ArtifactId, ArtifactKind, MessageParams};
use crate::semantic::Session;

impl Session {
    /// Resolve every reference of every artifact.
    ///
    /// Resolution may create artifacts (query elements, included members);
    /// the pass repeats until no new ones appear.
    pub fn resolve_all(&mut self) {
        let mut next = 0;
        loop {
            let count = self.model.artifact_count();
            if next == count {
                break;
            }
            for id in next..count {
                self.resolve_artifact(ArtifactId::from_index(id));
            }
            next = count;
        }
        self.check_usings();
        debug!(
            "[RESOLVE] {} artifact(s), {} reference(s), {} dependency edge(s)",
            self.model.artifact_count(),
            self.model.reference_count(),
            self.deps.len()
        );
    }

    fn resolve_artifact(&mut self, id: ArtifactId) {
        self.ensure_extended(id);
        let art = self.model.artifact(id).clone();
        match art.parent {
            Some(parent) => {
                self.deps.add_silent(parent, id);
            }
            // member of an extension that was never applied
            None if !art.kind.is_main() && art.kind != ArtifactKind::Magic => return,
            None => {}
        }
        let env = self.env_of(id);

        if let Some(type_ref) = art.type_ref {
            self.resolve_ref(type_ref, ExpectedContext::Type, &env);
        }
        for &include in &art.includes {
            self.resolve_ref(include, ExpectedContext::Include, &env);
        }
        if art.target.is_some() || art.target_aspect.is_some() {
            self.target_of_lazy(id);
            if let (Some(_), Some(aspect)) = (art.target, art.target_aspect) {
                self.resolve_ref(aspect, ExpectedContext::TargetAspect, &env);
            }
        }
        if let Some(on) = &art.on {
            self.resolve_expr(on, ExpectedContext::OnCondition, &env);
            self.check_backlinks(on, &env);
        }
        if let Some(value) = &art.value {
            if art.parent.is_some_and(|p| self.model.artifact(p).query.is_none()) {
                self.resolve_expr(value, ExpectedContext::Calc, &env);
            }
        }
        if let Some(default) = &art.default {
            self.resolve_default(id, &default.value, &env);
        }
        if let Some(source_ref) = art.source_ref {
            match art.kind {
                ArtifactKind::ForeignKey => {
                    let base = match art.parent {
                        Some(assoc) => self
                            .target_of_lazy(assoc)
                            .and_then(|t| self.effective_struct(t)),
                        None => None,
                    };
                    let fk_env = env.with_base(base);
                    self.resolve_ref(source_ref, ExpectedContext::ForeignKey, &fk_env);
                }
                _ => {
                    self.resolve_ref(source_ref, ExpectedContext::From, &env);
                }
            }
        }
        if let Some(query) = &art.query {
            self.ensure_query_elements(id);
            if let Some(where_) = &query.where_ {
                self.resolve_expr(where_, ExpectedContext::Where, &env);
            }
            for expr in &query.group_by {
                self.resolve_expr(expr, ExpectedContext::Where, &env);
            }
            if let Some(having) = &query.having {
                self.resolve_expr(having, ExpectedContext::Where, &env);
            }
            for expr in &query.order_by {
                self.resolve_expr(expr, ExpectedContext::OrderBy, &env);
            }
        }

        let mut refs = Vec::new();
        for annotation in art.annotations.values() {
            annotation.value.collect_refs(&mut refs);
        }
        for rid in refs {
            self.resolve_ref(rid, ExpectedContext::AnnoValue, &env);
        }
    }

    /// A `using` whose target does not exist.
    fn check_usings(&mut self) {
        let mut missing = Vec::new();
        for source in self.model.sources() {
            for using in &source.usings {
                if self.model.definition(&using.target).is_none() {
                    missing.push((using.target.clone(), using.location));
                }
            }
        }
        for (target, location) in missing {
            let params = MessageParams::new().name(target);
            self.report("ref-undefined-def", location, None, params);
        }
    }
}

