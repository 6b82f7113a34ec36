//! Queries of view-like entities (`as select from` / `as projection on`).

use indexmap::IndexMap;
use smol_str::SmolStr;

use super::annotation::Annotation;
use super::artifact::Members;
use super::expr::Expr;
use super::ids::ArtifactId;
use crate::base::Location;

/// A select list entry.
#[derive(Clone, Debug)]
pub enum Column {
    /// `*`
    Wildcard(Location),
    Value(ColumnValue),
}

/// A select item: `key a.b as x @anno { ... }`.
#[derive(Clone, Debug)]
pub struct ColumnValue {
    pub value: Expr,
    pub alias: Option<SmolStr>,
    pub key: bool,
    pub is_virtual: bool,
    /// Nested projection `{ ... }` on an association or structure.
    pub expand: Option<Vec<Column>>,
    pub annotations: IndexMap<SmolStr, Annotation>,
    pub location: Location,
}

impl ColumnValue {
    pub fn new(value: Expr, location: Location) -> Self {
        Self {
            value,
            alias: None,
            key: false,
            is_virtual: false,
            expand: None,
            annotations: IndexMap::new(),
            location,
        }
    }
}

/// The query of an entity.
#[derive(Clone, Debug)]
pub struct Query {
    /// Table alias artifacts, in `from` order.
    pub from: Vec<ArtifactId>,
    pub mixins: Members,
    /// `None` for a projection without select list (implicit `*`).
    pub columns: Option<Vec<Column>>,
    pub excluding: Vec<(SmolStr, Location)>,
    pub where_: Option<Expr>,
    pub group_by: Vec<Expr>,
    pub having: Option<Expr>,
    pub order_by: Vec<Expr>,
    pub is_projection: bool,
    pub location: Location,
}

impl Query {
    pub fn new(location: Location, is_projection: bool) -> Self {
        Self {
            from: Vec::new(),
            mixins: Members::new(),
            columns: None,
            excluding: Vec::new(),
            where_: None,
            group_by: Vec::new(),
            having: None,
            order_by: Vec::new(),
            is_projection,
            location,
        }
    }

    /// True if the select list contains (or implies) `*`.
    pub fn has_wildcard(&self) -> bool {
        match &self.columns {
            None => true,
            Some(columns) => columns.iter().any(|c| matches!(c, Column::Wildcard(_))),
        }
    }

    pub fn is_excluded(&self, name: &str) -> bool {
        self.excluding.iter().any(|(n, _)| n == name)
    }
}
