//! Expressions: conditions, calculated values, defaults and column values.

use smol_str::SmolStr;

use super::ids::RefId;
use crate::base::Location;

/// Literal values.
#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    /// Kept in its source spelling.
    Number(SmolStr),
    String(SmolStr),
}

/// An expression tree. Path expressions live in the reference arena.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Literal(Literal, Location),
    Ref(RefId),
    /// `#symbol`
    EnumSymbol(SmolStr, Location),
    /// Operator application, e.g. `=` / `and` / `+`.
    Op {
        op: SmolStr,
        args: Vec<Expr>,
        location: Location,
    },
    /// Function call, e.g. `concat(a, b)`.
    Func {
        name: SmolStr,
        args: Vec<Expr>,
        location: Location,
    },
}

impl Expr {
    pub fn as_ref_id(&self) -> Option<RefId> {
        match self {
            Expr::Ref(id) => Some(*id),
            _ => None,
        }
    }

    /// Operands of a binary `=` comparison.
    pub fn equality_operands(&self) -> Option<(&Expr, &Expr)> {
        match self {
            Expr::Op { op, args, .. } if op == "=" && args.len() == 2 => {
                Some((&args[0], &args[1]))
            }
            _ => None,
        }
    }

    /// Direct sub-expressions.
    pub fn children(&self) -> &[Expr] {
        match self {
            Expr::Op { args, .. } | Expr::Func { args, .. } => args,
            _ => &[],
        }
    }

    /// All references in this tree, in source order.
    ///
    /// Filters and arguments of path steps belong to their reference and are
    /// not included.
    pub fn collect_refs(&self, out: &mut Vec<RefId>) {
        match self {
            Expr::Ref(id) => out.push(*id),
            Expr::Op { args, .. } | Expr::Func { args, .. } => {
                for arg in args {
                    arg.collect_refs(out);
                }
            }
            Expr::Literal(..) | Expr::EnumSymbol(..) => {}
        }
    }

    /// All `#symbol` nodes in this tree.
    pub fn collect_enum_symbols<'a>(&'a self, out: &mut Vec<(&'a SmolStr, Location)>) {
        match self {
            Expr::EnumSymbol(name, loc) => out.push((name, *loc)),
            Expr::Op { args, .. } | Expr::Func { args, .. } => {
                for arg in args {
                    arg.collect_enum_symbols(out);
                }
            }
            Expr::Literal(..) | Expr::Ref(_) => {}
        }
    }
}
