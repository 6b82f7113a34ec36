//! References: dotted path expressions and their write-once resolution link.

use smol_str::SmolStr;

use super::artifact::Inferred;
use super::expr::Expr;
use super::ids::ArtifactId;
use crate::base::Location;

/// Special resolution semantics selected by the path's syntax.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RefScope {
    #[default]
    Default,
    /// Absolute name: skip the lexical environments.
    Global,
    /// `:param`, resolved against the entity's parameters.
    Param,
    /// `type of elem`, resolved against the enclosing artifact's elements.
    TypeOf,
}

/// Resolution state of a reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Link {
    /// Resolution of this reference is in progress (re-entry means a cycle).
    Resolving,
    Resolved(ArtifactId),
    /// Resolution failed; a diagnostic has been reported.
    Unresolved,
}

/// A named argument of a path step, `E(p: 1)`.
#[derive(Clone, Debug, PartialEq)]
pub struct StepArg {
    pub name: SmolStr,
    pub value: Expr,
    pub location: Location,
}

/// One identifier of a path, with optional call arguments or filter.
#[derive(Clone, Debug, PartialEq)]
pub struct PathStep {
    pub id: SmolStr,
    pub location: Location,
    pub args: Option<Vec<StepArg>>,
    pub filter: Option<Expr>,
    /// The artifact this step denotes, set during resolution.
    pub artifact: Option<ArtifactId>,
}

impl PathStep {
    pub fn new(id: impl Into<SmolStr>, location: Location) -> Self {
        Self {
            id: id.into(),
            location,
            args: None,
            filter: None,
            artifact: None,
        }
    }
}

/// A path expression like `my.Entity:struct.elem` or `$self.a`.
#[derive(Clone, Debug, PartialEq)]
pub struct Reference {
    pub path: Vec<PathStep>,
    pub scope: RefScope,
    /// Index of the first step naming an element (after `:`).
    pub element_start: Option<usize>,
    pub location: Location,
    /// Set on references created by the engine instead of the user.
    pub inferred: Option<Inferred>,
    link: Option<Link>,
}

impl Reference {
    pub fn new(path: Vec<PathStep>, location: Location) -> Self {
        Self {
            path,
            scope: RefScope::Default,
            element_start: None,
            location,
            inferred: None,
            link: None,
        }
    }

    /// Parse the `a.b:c.d` notation; a leading `:` selects the parameter scope.
    ///
    /// All steps share the given location.
    pub fn parse(text: &str, location: Location) -> Self {
        let (scope, text) = match text.strip_prefix(':') {
            Some(rest) => (RefScope::Param, rest),
            None => (RefScope::Default, text),
        };
        let mut path = Vec::new();
        let mut element_start = None;
        for (i, part) in text.split(':').enumerate() {
            if i == 1 {
                element_start = Some(path.len());
            }
            for id in part.split('.').filter(|s| !s.is_empty()) {
                path.push(PathStep::new(id, location));
            }
        }
        Self {
            path,
            scope,
            element_start,
            location,
            inferred: None,
            link: None,
        }
    }

    /// A reference which is resolved from the start.
    pub fn resolved(artifact: ArtifactId, name: &str, inferred: Inferred) -> Self {
        let mut reference = Self::parse(name, Location::default());
        reference.inferred = Some(inferred);
        reference.link = Some(Link::Resolved(artifact));
        reference
    }

    /// A copy with no resolution state, for re-resolution in another place.
    ///
    /// Step filters and arguments still share their references with `self`.
    pub fn unresolved_copy(&self) -> Self {
        let mut copy = self.clone();
        copy.link = None;
        for step in &mut copy.path {
            step.artifact = None;
        }
        copy
    }

    pub fn with_scope(mut self, scope: RefScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn link(&self) -> Option<Link> {
        self.link
    }

    /// The resolved artifact; `None` while unresolved or after failure.
    pub fn artifact(&self) -> Option<ArtifactId> {
        match self.link {
            Some(Link::Resolved(art)) => Some(art),
            _ => None,
        }
    }

    /// True once resolution has finished, successfully or not.
    pub fn is_settled(&self) -> bool {
        matches!(self.link, Some(Link::Resolved(_) | Link::Unresolved))
    }

    /// Set the resolution state.
    ///
    /// A settled link is final: only `Resolving` may be replaced.
    pub(crate) fn set_link(&mut self, link: Link) {
        debug_assert!(
            !self.is_settled(),
            "reference at {} resolved twice",
            self.location
        );
        if !self.is_settled() {
            self.link = Some(link);
        }
    }

    /// First identifier of the path.
    pub fn head(&self) -> Option<&SmolStr> {
        self.path.first().map(|s| &s.id)
    }

    /// The path rendered back into `a.b:c` notation.
    pub fn display_path(&self) -> String {
        let mut out = String::new();
        if self.scope == RefScope::Param {
            out.push(':');
        }
        for (i, step) in self.path.iter().enumerate() {
            if i > 0 {
                if Some(i) == self.element_start {
                    out.push(':');
                } else {
                    out.push('.');
                }
            }
            out.push_str(&step.id);
        }
        out
    }

    /// Same step identifiers, used by annotation `up to` matching.
    pub fn same_path(&self, other: &Reference) -> bool {
        self.scope == other.scope
            && self.path.len() == other.path.len()
            && self.path.iter().zip(&other.path).all(|(a, b)| a.id == b.id)
    }
}
