//! Expressions: operands, enum symbols and `$self` backlinks.

use smol_str::SmolStr;

use super::context::ExpectedContext;
use super::environment::Env;
use crate::base::Location;
use crate::hir::{ArtifactId, Expr, MemberGroup, MessageParams, RefId};
use crate::semantic::Session;

impl Session {
    /// Resolve all references in `expr`.
    ///
    /// Returns the artifact if the expression is a single path.
    pub(crate) fn resolve_expr(
        &mut self,
        expr: &Expr,
        ctx: ExpectedContext,
        env: &Env,
    ) -> Option<ArtifactId> {
        match expr {
            Expr::Ref(rid) => {
                let art = self.resolve_ref(*rid, ctx, env)?;
                let a = self.model.artifact(art);
                if ctx.semantics().rejects_unmanaged && a.has_target() && a.is_unmanaged() {
                    let location = self.model.reference(*rid).location;
                    let params = MessageParams::new().art(art);
                    self.report("ref-unexpected-assoc", location, env.user, params);
                }
                Some(art)
            }
            Expr::Op { args, .. } => {
                let operand = ctx.operand();
                let resolved: Vec<Option<ArtifactId>> = args
                    .iter()
                    .map(|arg| self.resolve_expr(arg, operand, env))
                    .collect();
                self.check_enum_operands(args, &resolved, env);
                None
            }
            Expr::Func { args, .. } => {
                let operand = ctx.operand();
                for arg in args {
                    self.resolve_expr(arg, operand, env);
                }
                None
            }
            Expr::Literal(..) | Expr::EnumSymbol(..) => None,
        }
    }

    /// `elem = #symbol`: the symbol must be a value of `elem`'s enum.
    fn check_enum_operands(&mut self, args: &[Expr], resolved: &[Option<ArtifactId>], env: &Env) {
        let Some(typed) = resolved.iter().flatten().next().copied() else {
            return;
        };
        for arg in args {
            if let Expr::EnumSymbol(symbol, location) = arg {
                self.check_enum_symbol(typed, symbol, *location, env);
            }
        }
    }

    pub(crate) fn check_enum_symbol(
        &mut self,
        typed: ArtifactId,
        symbol: &SmolStr,
        location: Location,
        env: &Env,
    ) {
        match self.effective_enum(typed) {
            None => {
                let params = MessageParams::new()
                    .art(typed)
                    .name(symbol.clone())
                    .variant("no-enum");
                self.report("ref-undefined-enum", location, env.user, params);
            }
            Some(holder) => {
                if self.model.member(holder, MemberGroup::Enum, symbol).is_none() {
                    let params = MessageParams::new().art(holder).name(symbol.clone());
                    self.report("ref-undefined-enum", location, env.user, params);
                }
            }
        }
    }

    /// `default` value of `art`; a bare `#symbol` is checked against `art`.
    pub(crate) fn resolve_default(&mut self, art: ArtifactId, expr: &Expr, env: &Env) {
        match expr {
            Expr::EnumSymbol(symbol, location) => {
                self.check_enum_symbol(art, symbol, *location, env);
            }
            other => {
                self.resolve_expr(other, ExpectedContext::Calc, env);
            }
        }
    }

    /// In `assoc.back = $self`, `back` must point to the main artifact or
    /// to one it is derived from.
    pub(crate) fn check_backlinks(&mut self, on: &Expr, env: &Env) {
        if let Some((left, right)) = on.equality_operands() {
            let pair = if self.is_bare_self(left) {
                Some(right)
            } else if self.is_bare_self(right) {
                Some(left)
            } else {
                None
            };
            if let Some(Expr::Ref(rid)) = pair {
                self.check_backlink(*rid, env);
            }
        }
        for child in on.children() {
            self.check_backlinks(child, env);
        }
    }

    fn is_bare_self(&self, expr: &Expr) -> bool {
        let Expr::Ref(rid) = expr else {
            return false;
        };
        let reference = self.model.reference(*rid);
        reference.path.len() == 1
            && matches!(
                reference.head().map(|h| h.as_str()),
                Some("$self" | "$projection")
            )
    }

    fn check_backlink(&mut self, rid: RefId, env: &Env) {
        let Some(assoc) = self.model.reference(rid).artifact() else {
            return;
        };
        let (Some(main), true) = (env.main, self.model.artifact(assoc).has_target()) else {
            return;
        };
        let Some(target) = self.target_of_lazy(assoc) else {
            return;
        };
        if !self.is_in_origin_chain(target, main) {
            let location = self.model.reference(rid).location;
            let params = MessageParams::new().art(assoc).target(main);
            self.report("ref-invalid-backlink", location, env.user, params);
        }
    }
}
