//! Elements of query entities, created on first use from the select list.

use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use smol_str::SmolStr;
use tracing::debug;

use super::context::ExpectedContext;
use super::environment::Env;
use crate::base::Location;
use crate::hir::{
    Artifact, ArtifactId, ArtifactKind, Column, ColumnValue, Expr, Flag, Inferred, MemberGroup,
    MessageParams,
};
use crate::semantic::Session;

/// Where the names of a `*` come from.
enum WildcardSource {
    /// The table aliases of the query.
    Aliases(Vec<ArtifactId>),
    /// The structure an `expand` column navigates.
    Structure(Option<ArtifactId>),
}

impl Session {
    /// Populate the elements of query entity `entity` once.
    pub(crate) fn ensure_query_elements(&mut self, entity: ArtifactId) {
        if !self.elements_status.begin(entity) {
            return;
        }
        let Some(query) = self.model.artifact(entity).query.clone() else {
            self.elements_status.finish(entity);
            return;
        };
        self.model
            .artifact_mut(entity)
            .members_mut(MemberGroup::Elements);
        let env = self.env_of(entity);
        for &alias in &query.from {
            self.alias_source(alias);
        }

        let columns = query
            .columns
            .clone()
            .unwrap_or_else(|| vec![Column::Wildcard(query.location)]);
        let excluding: Vec<SmolStr> = query.excluding.iter().map(|(n, _)| n.clone()).collect();
        self.populate_columns(
            entity,
            &columns,
            WildcardSource::Aliases(query.from.clone()),
            &excluding,
            ExpectedContext::Column,
            &env,
        );
        debug!(
            "[RESOLVE] query {} has {} element(s)",
            self.model.display_name(entity),
            self.model
                .artifact(entity)
                .elements
                .as_ref()
                .map_or(0, |e| e.len())
        );
        self.elements_status.finish(entity);
    }

    fn populate_columns(
        &mut self,
        owner: ArtifactId,
        columns: &[Column],
        wildcard: WildcardSource,
        excluding: &[SmolStr],
        ctx: ExpectedContext,
        env: &Env,
    ) {
        let explicit: FxHashSet<SmolStr> = columns
            .iter()
            .filter_map(|c| match c {
                Column::Value(value) => self.column_name(value),
                Column::Wildcard(_) => None,
            })
            .collect();
        for column in columns {
            match column {
                Column::Wildcard(location) => {
                    self.expand_wildcard(owner, &wildcard, excluding, &explicit, *location, env)
                }
                Column::Value(value) => self.add_column_element(owner, value, ctx, env),
            }
        }
    }

    /// Alias, else the last step of a path column.
    fn column_name(&self, column: &ColumnValue) -> Option<SmolStr> {
        if let Some(alias) = &column.alias {
            return Some(alias.clone());
        }
        let rid = column.value.as_ref_id()?;
        self.model
            .reference(rid)
            .path
            .last()
            .map(|step| step.id.clone())
    }

    fn expand_wildcard(
        &mut self,
        owner: ArtifactId,
        source: &WildcardSource,
        excluding: &[SmolStr],
        explicit: &FxHashSet<SmolStr>,
        location: Location,
        env: &Env,
    ) {
        // name -> (provider, element) in source order
        let mut candidates: IndexMap<SmolStr, Vec<(SmolStr, ArtifactId)>> = IndexMap::new();
        let providers: Vec<ArtifactId> = match source {
            WildcardSource::Aliases(aliases) => aliases.clone(),
            WildcardSource::Structure(structure) => structure.iter().copied().collect(),
        };
        for provider in providers {
            let Some(structure) = self.effective_struct(provider) else {
                continue;
            };
            let provider_name = self.model.artifact(provider).name.clone();
            let elements = self
                .model
                .artifact(structure)
                .elements
                .clone()
                .unwrap_or_default();
            for (name, element) in elements {
                candidates
                    .entry(name)
                    .or_default()
                    .push((provider_name.clone(), element));
            }
        }

        for (name, providers) in candidates {
            if excluding.contains(&name) || explicit.contains(&name) {
                continue;
            }
            if providers.len() > 1 {
                let params = MessageParams::new()
                    .name(name.clone())
                    .names(providers.into_iter().map(|(p, _)| p));
                self.report("wildcard-ambiguous", location, env.user, params);
                continue;
            }
            if self.model.element(owner, &name).is_some() {
                continue;
            }
            let mut element = Artifact::new(ArtifactKind::Element, name.clone(), location);
            element.origin = Some(providers[0].1);
            element.inferred = Some(Inferred::Wildcard);
            let id = self.model.push_artifact(element);
            self.model
                .attach_member(owner, MemberGroup::Elements, name, id);
        }
    }

    fn add_column_element(
        &mut self,
        owner: ArtifactId,
        column: &ColumnValue,
        ctx: ExpectedContext,
        env: &Env,
    ) {
        let resolved = self.resolve_expr(&column.value, ctx, env);
        let Some(name) = self.column_name(column) else {
            self.report("query-req-name", column.location, env.user, MessageParams::new());
            return;
        };
        if self.model.element(owner, &name).is_some() {
            let params = MessageParams::new().art(owner).name(name);
            self.report("duplicate-definition", column.location, env.user, params);
            return;
        }

        let mut element = Artifact::new(ArtifactKind::Element, name.clone(), column.location);
        element.origin = resolved;
        if column.key {
            element.key = Some(Flag::new(true, Some(column.location)));
        }
        if column.is_virtual {
            element.is_virtual = Some(Flag::new(true, Some(column.location)));
        }
        element.annotations = column.annotations.clone();
        if !matches!(column.value, Expr::Ref(_)) {
            element.value = Some(column.value.clone());
        }
        let nested = column.expand.as_ref();
        if nested.is_some() {
            element.expanded = true;
            element.inferred = Some(Inferred::Expand);
            element.elements = Some(IndexMap::new());
        }
        let id = self.model.push_artifact(element);
        self.model
            .attach_member(owner, MemberGroup::Elements, name, id);

        if let Some(columns) = nested {
            let base = match resolved {
                Some(base) => self.effective_struct(base),
                None => None,
            };
            let nested_env = env.with_base(base);
            self.populate_columns(
                id,
                columns,
                WildcardSource::Structure(base),
                &[],
                ExpectedContext::Expand,
                &nested_env,
            );
        }
    }
}

