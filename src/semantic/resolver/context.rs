//! Expected contexts: how a reference is looked up depends on where it is
//! written.
//!
//! Each [`ExpectedContext`] maps to a static [`Semantics`] record naming the
//! lexical and dynamic scope chains, the acceptance predicate for the
//! resolved artifact and the message for a missing root.

use super::environment::{Env, Scope};
use crate::hir::{ArtifactId, ArtifactKind, Model};
use crate::semantic::Session;

/// Where a reference is written.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExpectedContext {
    /// `elem: Type`
    Type,
    /// `entity E : Base`
    Include,
    /// `Association to Target`
    Target,
    /// `Composition of Aspect`
    TargetAspect,
    /// `select from Source`
    From,
    /// A select item.
    Column,
    /// Operand inside a select item expression.
    Expr,
    /// `where`, `group by`, `having`
    Where,
    OrderBy,
    /// `on` condition of an association or mixin.
    OnCondition,
    /// Calculated element value and `default`.
    Calc,
    /// Path value of an annotation, `@A: elem`.
    AnnoValue,
    /// `{ elem as fk }` of a managed association.
    ForeignKey,
    /// `assoc[filter]`
    Filter,
    /// Nested select item of an `expand`.
    Expand,
    ExtendTarget,
    AnnotateTarget,
}

/// Which dictionary a non-root path step navigates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Navigation {
    /// Nested definitions (`my.ns.E`) while the previous step is a main artifact.
    Artifacts,
    Elements,
}

type ScopeFn = fn(&Session, &Env) -> Vec<Scope>;
type AcceptFn = fn(&Model, &Env, ArtifactId) -> Result<(), &'static str>;

/// Resolution semantics of one context.
pub(crate) struct Semantics {
    pub lexical: ScopeFn,
    pub dynamic: ScopeFn,
    pub accept: AcceptFn,
    /// Message id for a root that is found nowhere.
    pub not_found: &'static str,
    /// Successful resolution records a located dependency edge.
    pub dependency: bool,
    pub navigation: Navigation,
    pub allows_self: bool,
    pub allows_magic: bool,
    /// A bare unmanaged association is an error.
    pub rejects_unmanaged: bool,
}

impl ExpectedContext {
    pub(crate) fn semantics(self) -> &'static Semantics {
        match self {
            ExpectedContext::Type => &TYPE,
            ExpectedContext::Include => &INCLUDE,
            ExpectedContext::Target => &TARGET,
            ExpectedContext::TargetAspect => &TARGET_ASPECT,
            ExpectedContext::From => &FROM,
            ExpectedContext::Column => &COLUMN,
            ExpectedContext::Expr => &EXPR,
            ExpectedContext::Where => &WHERE,
            ExpectedContext::OrderBy => &ORDER_BY,
            ExpectedContext::OnCondition => &ON_CONDITION,
            ExpectedContext::Calc => &CALC,
            ExpectedContext::AnnoValue => &ANNO_VALUE,
            ExpectedContext::ForeignKey => &FOREIGN_KEY,
            ExpectedContext::Filter => &FILTER,
            ExpectedContext::Expand => &EXPAND,
            ExpectedContext::ExtendTarget => &EXTEND_TARGET,
            ExpectedContext::AnnotateTarget => &ANNOTATE_TARGET,
        }
    }

    /// Contexts whose root names a definition rather than an element.
    pub fn is_artifact_context(self) -> bool {
        self.semantics().navigation == Navigation::Artifacts
    }

    /// Context of the operands below the top of an expression.
    pub(crate) fn operand(self) -> ExpectedContext {
        match self {
            ExpectedContext::Column => ExpectedContext::Expr,
            other => other,
        }
    }
}

// ============================================================================
// SCOPE CHAINS
// ============================================================================

fn no_scopes(_: &Session, _: &Env) -> Vec<Scope> {
    Vec::new()
}

/// Enclosing blocks, then the file, for definition names.
fn definition_lexical(session: &Session, env: &Env) -> Vec<Scope> {
    let mut scopes = Vec::new();
    let mut block = env.block;
    // bounded by the number of artifacts: blocks never nest cyclically
    while let Some(b) = block {
        if scopes.len() > session.model.artifact_count() {
            break;
        }
        scopes.push(Scope::Block(b));
        block = session.model.artifact(b).block;
    }
    scopes.push(Scope::File(env.source));
    scopes
}

fn definitions(_: &Session, _: &Env) -> Vec<Scope> {
    vec![Scope::Definitions]
}

fn extension_lexical(_: &Session, env: &Env) -> Vec<Scope> {
    vec![Scope::File(env.source)]
}

fn query_aliases(_: &Session, env: &Env) -> Vec<Scope> {
    env.query.map(Scope::Aliases).into_iter().collect()
}

fn query_source_elements(_: &Session, env: &Env) -> Vec<Scope> {
    env.query.map(Scope::SourceElements).into_iter().collect()
}

/// Own query elements first, then the sources.
fn order_by_lexical(_: &Session, env: &Env) -> Vec<Scope> {
    match env.query {
        Some(q) => vec![Scope::Elements(q), Scope::Aliases(q)],
        None => env.main.map(Scope::Elements).into_iter().collect(),
    }
}

/// Sibling elements of the user; a mixin sees the query sources instead.
fn sibling_elements(session: &Session, env: &Env) -> Vec<Scope> {
    let Some(user) = env.user else {
        return Vec::new();
    };
    let art = session.model.artifact(user);
    if art.kind == ArtifactKind::Mixin {
        if let Some(q) = env.query {
            return vec![Scope::Aliases(q), Scope::SourceElements(q)];
        }
    }
    match art.parent {
        Some(parent) => vec![Scope::Elements(parent)],
        None => vec![Scope::Elements(user)],
    }
}

/// Elements next to the annotated artifact; for a main artifact its own.
fn annotated_elements(session: &Session, env: &Env) -> Vec<Scope> {
    let Some(user) = env.user else {
        return Vec::new();
    };
    let holder = session.model.artifact(user).parent.unwrap_or(user);
    vec![Scope::Elements(holder)]
}

fn base_elements(_: &Session, env: &Env) -> Vec<Scope> {
    env.base.map(Scope::Elements).into_iter().collect()
}

// ============================================================================
// ACCEPTANCE
// ============================================================================

fn accept_any(_: &Model, _: &Env, _: ArtifactId) -> Result<(), &'static str> {
    Ok(())
}

fn accept_type(model: &Model, _: &Env, art: ArtifactId) -> Result<(), &'static str> {
    if model.artifact(art).kind.is_type_like() {
        Ok(())
    } else {
        Err("ref-expected-type")
    }
}

fn accept_struct(model: &Model, _: &Env, art: ArtifactId) -> Result<(), &'static str> {
    match model.artifact(art).kind {
        ArtifactKind::Entity | ArtifactKind::Aspect | ArtifactKind::Type | ArtifactKind::Event => {
            Ok(())
        }
        _ => Err("ref-expected-struct"),
    }
}

fn accept_target(model: &Model, env: &Env, art: ArtifactId) -> Result<(), &'static str> {
    let composition = env
        .user
        .is_some_and(|u| model.artifact(u).is_composition);
    match model.artifact(art).kind {
        ArtifactKind::Entity => Ok(()),
        ArtifactKind::Aspect if composition => Ok(()),
        _ => Err("ref-expected-entity"),
    }
}

fn accept_aspect(model: &Model, _: &Env, art: ArtifactId) -> Result<(), &'static str> {
    match model.artifact(art).kind {
        ArtifactKind::Aspect | ArtifactKind::Type => Ok(()),
        _ => Err("ref-expected-aspect"),
    }
}

fn accept_source(model: &Model, _: &Env, art: ArtifactId) -> Result<(), &'static str> {
    let a = model.artifact(art);
    if a.kind == ArtifactKind::Entity || (a.kind == ArtifactKind::Element && a.has_target()) {
        Ok(())
    } else {
        Err("ref-expected-source")
    }
}

// ============================================================================
// TABLE
// ============================================================================

const fn artifact_ref(accept: AcceptFn) -> Semantics {
    Semantics {
        lexical: definition_lexical,
        dynamic: definitions,
        accept,
        not_found: "ref-undefined-def",
        dependency: false,
        navigation: Navigation::Artifacts,
        allows_self: false,
        allows_magic: false,
        rejects_unmanaged: false,
    }
}

const fn element_ref(lexical: ScopeFn, dynamic: ScopeFn) -> Semantics {
    Semantics {
        lexical,
        dynamic,
        accept: accept_any,
        not_found: "ref-undefined-element",
        dependency: false,
        navigation: Navigation::Elements,
        allows_self: true,
        allows_magic: true,
        rejects_unmanaged: false,
    }
}

static TYPE: Semantics = Semantics {
    dependency: true,
    ..artifact_ref(accept_type)
};

static INCLUDE: Semantics = Semantics {
    dependency: true,
    ..artifact_ref(accept_struct)
};

static TARGET: Semantics = artifact_ref(accept_target);

static TARGET_ASPECT: Semantics = artifact_ref(accept_aspect);

static FROM: Semantics = Semantics {
    dependency: true,
    ..artifact_ref(accept_source)
};

static COLUMN: Semantics = element_ref(query_aliases, query_source_elements);

static EXPR: Semantics = Semantics {
    rejects_unmanaged: true,
    ..element_ref(query_aliases, query_source_elements)
};

static WHERE: Semantics = Semantics {
    rejects_unmanaged: true,
    ..element_ref(query_aliases, query_source_elements)
};

static ORDER_BY: Semantics = element_ref(order_by_lexical, query_source_elements);

static ON_CONDITION: Semantics = element_ref(sibling_elements, no_scopes);

static CALC: Semantics = Semantics {
    dependency: true,
    rejects_unmanaged: true,
    ..element_ref(sibling_elements, no_scopes)
};

static ANNO_VALUE: Semantics = Semantics {
    not_found: "anno-undefined-element",
    ..element_ref(annotated_elements, no_scopes)
};

static FOREIGN_KEY: Semantics = Semantics {
    allows_self: false,
    allows_magic: false,
    ..element_ref(no_scopes, base_elements)
};

static FILTER: Semantics = Semantics {
    rejects_unmanaged: true,
    ..element_ref(no_scopes, base_elements)
};

static EXPAND: Semantics = Semantics {
    allows_self: false,
    ..element_ref(no_scopes, base_elements)
};

static EXTEND_TARGET: Semantics = Semantics {
    lexical: extension_lexical,
    not_found: "ref-undefined-art",
    ..artifact_ref(accept_any)
};

static ANNOTATE_TARGET: Semantics = Semantics {
    lexical: extension_lexical,
    not_found: "anno-undefined-art",
    ..artifact_ref(accept_any)
};
