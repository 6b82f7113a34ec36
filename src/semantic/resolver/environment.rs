//! Lookup environments.
//!
//! An [`Env`] describes where a reference is written; a [`Scope`] is one
//! dictionary consulted for the first path step. Scopes are plain
//! descriptors so a context can list them without touching the model; the
//! dictionaries behind them may be computed lazily during [`Session::lookup`].

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::base::SourceId;
use crate::hir::{ArtifactId, ArtifactKind};
use crate::semantic::Session;

/// The place a reference is written.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Env {
    /// The artifact carrying the reference; `None` for extension targets.
    pub user: Option<ArtifactId>,
    /// Main artifact of `user`.
    pub main: Option<ArtifactId>,
    /// Source file whose `using`s and namespace apply.
    pub source: SourceId,
    /// Innermost context/service block.
    pub block: Option<ArtifactId>,
    /// The query entity, if `main` has a query.
    pub query: Option<ArtifactId>,
    /// Structure navigated by foreign keys, filters and expand columns.
    pub base: Option<ArtifactId>,
}

impl Env {
    pub fn in_source(source: SourceId) -> Self {
        Self {
            source,
            ..Self::default()
        }
    }

    pub fn with_base(mut self, base: Option<ArtifactId>) -> Self {
        self.base = base;
        self
    }
}

/// One dictionary of names.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Scope {
    /// Definitions nested in a context or service.
    Block(ArtifactId),
    /// `using` aliases, top-level names of the file and its namespace.
    File(SourceId),
    /// Absolute names, then unqualified builtin names.
    Definitions,
    /// Table aliases and mixins of a query.
    Aliases(ArtifactId),
    /// Elements of the effective structure of an artifact.
    Elements(ArtifactId),
    /// Elements of all query sources together.
    SourceElements(ArtifactId),
}

/// Result of a lookup in one scope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Found {
    One(ArtifactId),
    /// Found through several table aliases, as `alias.name`.
    Ambiguous(Vec<SmolStr>),
    Nothing,
}

impl Session {
    /// Look up `name` in one scope.
    pub(crate) fn lookup(&mut self, scope: Scope, name: &str) -> Found {
        let found = match scope {
            Scope::Block(block) => self.model.artifact(block).sub_artifacts.get(name).copied(),
            Scope::File(source) => self.lookup_in_file(source, name),
            Scope::Definitions => self
                .model
                .definition(name)
                .or_else(|| self.model.builtin(name)),
            Scope::Aliases(query) => self.query_alias(query, name),
            Scope::Elements(art) => self
                .effective_struct(art)
                .and_then(|s| self.model.element(s, name)),
            Scope::SourceElements(query) => return self.lookup_source_element(query, name),
        };
        match found {
            Some(id) => Found::One(id),
            None => Found::Nothing,
        }
    }

    fn lookup_in_file(&self, source: SourceId, name: &str) -> Option<ArtifactId> {
        let Some(file) = self.model.sources().get(source.index()) else {
            return self.model.definition(name);
        };
        if let Some(using) = file.using(name) {
            if let Some(target) = self.model.definition(&using.target) {
                return Some(target);
            }
        }
        if let Some(&id) = file.artifacts.get(name) {
            return Some(id);
        }
        file.namespace
            .as_ref()
            .and_then(|ns| self.model.definition(&format!("{ns}.{name}")))
    }

    fn query_alias(&self, query: ArtifactId, name: &str) -> Option<ArtifactId> {
        let q = self.model.artifact(query).query.as_deref()?;
        q.from
            .iter()
            .copied()
            .find(|&alias| self.model.artifact(alias).name == name)
            .or_else(|| q.mixins.get(name).copied())
    }

    fn lookup_source_element(&mut self, query: ArtifactId, name: &str) -> Found {
        let aliases = self.query_from(query);
        let mut hits: Vec<(SmolStr, ArtifactId)> = Vec::new();
        for alias in aliases {
            let Some(structure) = self.effective_struct(alias) else {
                continue;
            };
            if let Some(element) = self.model.element(structure, name) {
                hits.push((self.model.artifact(alias).name.clone(), element));
            }
        }
        match hits.len() {
            0 => Found::Nothing,
            1 => Found::One(hits[0].1),
            _ => Found::Ambiguous(
                hits.into_iter()
                    .map(|(alias, _)| SmolStr::new(format!("{alias}.{name}")))
                    .collect(),
            ),
        }
    }

    /// Table aliases of a query entity, in `from` order.
    pub(crate) fn query_from(&self, query: ArtifactId) -> Vec<ArtifactId> {
        self.model
            .artifact(query)
            .query
            .as_deref()
            .map(|q| q.from.clone())
            .unwrap_or_default()
    }

    /// All names visible in `scope`, for `valid_names` suggestions.
    pub(crate) fn scope_names(&mut self, scope: Scope, out: &mut IndexMap<SmolStr, ArtifactId>) {
        match scope {
            Scope::Block(block) => {
                for (name, &id) in &self.model.artifact(block).sub_artifacts {
                    out.entry(name.clone()).or_insert(id);
                }
            }
            Scope::File(source) => {
                let Some(file) = self.model.sources().get(source.index()) else {
                    return;
                };
                for using in &file.usings {
                    if let Some(id) = self.model.definition(&using.target) {
                        out.entry(using.alias.clone()).or_insert(id);
                    }
                }
                for (name, &id) in &file.artifacts {
                    out.entry(name.clone()).or_insert(id);
                }
            }
            Scope::Definitions => {
                for (name, id) in self.model.definitions() {
                    let art = self.model.artifact(id);
                    if art.kind != ArtifactKind::Namespace && art.kind != ArtifactKind::Builtin {
                        out.entry(name.clone()).or_insert(id);
                    }
                }
            }
            Scope::Aliases(query) => {
                let Some(q) = self.model.artifact(query).query.as_deref() else {
                    return;
                };
                for &alias in &q.from {
                    out.entry(self.model.artifact(alias).name.clone()).or_insert(alias);
                }
                for (name, &id) in &q.mixins {
                    out.entry(name.clone()).or_insert(id);
                }
            }
            Scope::Elements(art) => {
                if let Some(structure) = self.effective_struct(art) {
                    self.element_names(structure, out);
                }
            }
            Scope::SourceElements(query) => {
                for alias in self.query_from(query) {
                    if let Some(structure) = self.effective_struct(alias) {
                        self.element_names(structure, out);
                    }
                }
            }
        }
    }

    fn element_names(&self, art: ArtifactId, out: &mut IndexMap<SmolStr, ArtifactId>) {
        for (name, &id) in self.model.artifact(art).elements.iter().flatten() {
            out.entry(name.clone()).or_insert(id);
        }
    }

    /// Environment of a reference carried by `user`.
    pub(crate) fn env_of(&self, user: ArtifactId) -> Env {
        let main = self.model.main_of(user);
        let main_art = self.model.artifact(main);
        Env {
            user: Some(user),
            main: Some(main),
            source: self.model.artifact(user).location.source,
            block: main_art.block,
            query: main_art.query.is_some().then_some(main),
            base: None,
        }
    }
}
