//! Programmatic model construction.
//!
//! [`ModelBuilder`] produces the unresolved skeleton the engine works on:
//! main artifacts registered by absolute name, members attached to their
//! parents, references parsed from `A.B:c.d` notation and extensions queued
//! per source. It also seeds the `cds` builtin types and the `$` variables.
//!
//! ```
//! use cds::hir::{AnnoValue, ModelBuilder};
//!
//! let mut b = ModelBuilder::new();
//! b.source("db.cds");
//! let e = b.entity("E").id();
//! b.element(e, "id").ty("Integer").key();
//! b.annotate("E").anno("title", AnnoValue::string("Books"));
//! let model = b.build();
//! assert!(model.definition("E").is_some());
//! ```

use smol_str::SmolStr;

use super::annotation::{AnnoValue, Annotation, anno_name};
use super::artifact::{Artifact, ArtifactKind, Cardinality, Generated, Inferred, MemberGroup, Prop};
use super::expr::{Expr, Literal};
use super::extension::{Extension, ExtensionKind, ExtensionTarget, MemberExtension};
use super::ids::{ArtifactId, ExtensionId, RefId};
use super::model::Model;
use super::query::{Column, ColumnValue, Query};
use super::reference::{RefScope, Reference, StepArg};
use super::source::Using;
use crate::base::{Location, SourceId};

/// Builtin types in namespace `cds`.
pub const BUILTIN_TYPES: &[&str] = &[
    "String",
    "LargeString",
    "Binary",
    "LargeBinary",
    "Integer",
    "UInt8",
    "Int16",
    "Int32",
    "Int64",
    "Integer64",
    "Decimal",
    "DecimalFloat",
    "Double",
    "Boolean",
    "Date",
    "Time",
    "DateTime",
    "Timestamp",
    "UUID",
    "Map",
    "Association",
    "Composition",
];

/// `$` variables and their elements. `$session` accepts any element.
const MAGIC_VARIABLES: &[(&str, &[&str])] = &[
    ("$now", &[]),
    ("$at", &["from", "to"]),
    ("$valid", &["from", "to"]),
    ("$user", &["id", "locale", "tenant"]),
    ("$tenant", &[]),
    ("$session", &[]),
];

/// Builds a [`Model`] the way the define phase would.
#[derive(Debug)]
pub struct ModelBuilder {
    model: Model,
    current: Option<SourceId>,
    /// Last line handed out per source.
    lines: Vec<u32>,
}

impl Default for ModelBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelBuilder {
    pub fn new() -> Self {
        let mut builder = Self {
            model: Model::new(),
            current: None,
            lines: Vec::new(),
        };
        builder.define_builtins();
        builder.define_magic_variables();
        builder
    }

    /// The model built so far.
    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn build(self) -> Model {
        self.model
    }

    fn define_builtins(&mut self) {
        let cds = self.ensure_namespace("cds");
        for name in BUILTIN_TYPES {
            let absolute = SmolStr::new(format!("cds.{name}"));
            let mut art = Artifact::new(ArtifactKind::Builtin, *name, Location::default());
            art.absolute = Some(absolute.clone());
            let id = self.model.push_artifact(art);
            self.model.register_definition(absolute, id);
            self.model.register_builtin(SmolStr::new(name), id);
            self.model
                .artifact_mut(cds)
                .sub_artifacts
                .insert(SmolStr::new(name), id);
        }
    }

    fn define_magic_variables(&mut self) {
        for (name, elements) in MAGIC_VARIABLES {
            let id = self
                .model
                .push_artifact(Artifact::new(ArtifactKind::Magic, *name, Location::default()));
            self.model.artifact_mut(id).members_mut(MemberGroup::Elements);
            for element in *elements {
                let child = self.model.push_artifact(Artifact::new(
                    ArtifactKind::Magic,
                    *element,
                    Location::default(),
                ));
                self.model
                    .attach_member(id, MemberGroup::Elements, SmolStr::new(element), child);
            }
            self.model.register_magic(SmolStr::new(name), id);
        }
    }

    // ========================================================================
    // SOURCES
    // ========================================================================

    /// Start a new source file; following definitions belong to it.
    pub fn source(&mut self, filename: &str) -> SourceId {
        let id = self.model.push_source(filename);
        self.lines.push(0);
        self.current = Some(id);
        id
    }

    /// Continue adding to an earlier source.
    pub fn switch_to(&mut self, source: SourceId) {
        self.current = Some(source);
    }

    fn current_source(&mut self) -> SourceId {
        match self.current {
            Some(id) => id,
            None => self.source("model.cds"),
        }
    }

    fn next_location(&mut self) -> Location {
        let source = self.current_source();
        let line = &mut self.lines[source.index()];
        *line += 1;
        Location::at(source, *line, 1)
    }

    /// `namespace my.bookshop;` for the current source.
    pub fn namespace(&mut self, name: &str) -> &mut Self {
        let source = self.current_source();
        self.ensure_namespace(name);
        self.model.source_mut(source).namespace = Some(SmolStr::new(name));
        self
    }

    /// `using my.bookshop.Books;`
    pub fn using(&mut self, target: &str) -> &mut Self {
        let alias = target.rsplit('.').next().unwrap_or(target).to_string();
        self.using_as(target, &alias)
    }

    /// `using my.bookshop.Books as B;`
    pub fn using_as(&mut self, target: &str, alias: &str) -> &mut Self {
        let source = self.current_source();
        let location = self.next_location();
        self.model.source_mut(source).usings.push(Using {
            alias: SmolStr::new(alias),
            target: SmolStr::new(target),
            location,
        });
        self
    }

    /// The current source depends on (`using from`) `other`.
    pub fn depends_on(&mut self, other: SourceId) -> &mut Self {
        let source = self.current_source();
        let deps = &mut self.model.source_mut(source).dependencies;
        if !deps.contains(&other) {
            deps.push(other);
        }
        self
    }

    // ========================================================================
    // DEFINITIONS
    // ========================================================================

    /// Define a main artifact in the current source (namespace-prefixed).
    pub fn define(&mut self, kind: ArtifactKind, name: &str) -> ArtDef<'_> {
        let source = self.current_source();
        let namespace = self.model.source(source).namespace.clone();
        let absolute = match &namespace {
            Some(ns) => format!("{ns}.{name}"),
            None => name.to_string(),
        };
        let id = self.define_main(kind, &absolute, None);

        let head = name.split('.').next().unwrap_or(name);
        let head_absolute = match &namespace {
            Some(ns) => format!("{ns}.{head}"),
            None => head.to_string(),
        };
        if let Some(head_id) = self.model.definition(&head_absolute) {
            self.model
                .source_mut(source)
                .artifacts
                .insert(SmolStr::new(head), head_id);
        }
        ArtDef { builder: self, id }
    }

    /// Define `name` inside a context or service block.
    pub fn define_in(&mut self, block: ArtifactId, kind: ArtifactKind, name: &str) -> ArtDef<'_> {
        let prefix = self.model.display_name(block);
        let id = self.define_main(kind, &format!("{prefix}.{name}"), Some(block));
        ArtDef { builder: self, id }
    }

    pub fn entity(&mut self, name: &str) -> ArtDef<'_> {
        self.define(ArtifactKind::Entity, name)
    }

    pub fn aspect(&mut self, name: &str) -> ArtDef<'_> {
        self.define(ArtifactKind::Aspect, name)
    }

    pub fn type_def(&mut self, name: &str) -> ArtDef<'_> {
        self.define(ArtifactKind::Type, name)
    }

    pub fn event(&mut self, name: &str) -> ArtDef<'_> {
        self.define(ArtifactKind::Event, name)
    }

    pub fn context(&mut self, name: &str) -> ArtDef<'_> {
        self.define(ArtifactKind::Context, name)
    }

    pub fn service(&mut self, name: &str) -> ArtDef<'_> {
        self.define(ArtifactKind::Service, name)
    }

    pub fn action(&mut self, name: &str) -> ArtDef<'_> {
        self.define(ArtifactKind::Action, name)
    }

    pub fn function(&mut self, name: &str) -> ArtDef<'_> {
        self.define(ArtifactKind::Function, name)
    }

    pub fn annotation_def(&mut self, name: &str) -> ArtDef<'_> {
        self.define(ArtifactKind::Annotation, name)
    }

    fn define_main(
        &mut self,
        kind: ArtifactKind,
        absolute: &str,
        block: Option<ArtifactId>,
    ) -> ArtifactId {
        let location = self.next_location();
        let name = absolute.rsplit('.').next().unwrap_or(absolute);
        let mut art = Artifact::new(kind, name, location);
        art.absolute = Some(SmolStr::new(absolute));
        art.block = block;
        if matches!(
            kind,
            ArtifactKind::Entity | ArtifactKind::Aspect | ArtifactKind::Event
        ) {
            art.members_mut(MemberGroup::Elements);
        }
        // an implicit namespace created for an earlier `a.b` hands over its children
        if let Some(previous) = self.model.definition(absolute) {
            let prev = self.model.artifact_mut(previous);
            if prev.inferred == Some(Inferred::Namespace) {
                art.sub_artifacts = std::mem::take(&mut prev.sub_artifacts);
            }
        }
        let id = self.model.push_artifact(art);
        self.model.register_definition(SmolStr::new(absolute), id);
        self.link_to_prefix(absolute, id);
        id
    }

    fn ensure_namespace(&mut self, absolute: &str) -> ArtifactId {
        if let Some(id) = self.model.definition(absolute) {
            return id;
        }
        let name = absolute.rsplit('.').next().unwrap_or(absolute);
        let mut art = Artifact::new(ArtifactKind::Namespace, name, Location::default());
        art.absolute = Some(SmolStr::new(absolute));
        art.inferred = Some(Inferred::Namespace);
        let id = self.model.push_artifact(art);
        self.model.register_definition(SmolStr::new(absolute), id);
        self.link_to_prefix(absolute, id);
        id
    }

    fn link_to_prefix(&mut self, absolute: &str, id: ArtifactId) {
        if let Some((prefix, last)) = absolute.rsplit_once('.') {
            let parent = self.ensure_namespace(prefix);
            self.model
                .artifact_mut(parent)
                .sub_artifacts
                .insert(SmolStr::new(last), id);
        }
    }

    // ========================================================================
    // MEMBERS
    // ========================================================================

    fn define_member(&mut self, parent: ArtifactId, group: MemberGroup, name: &str) -> ArtDef<'_> {
        let location = self.next_location();
        let id = self
            .model
            .push_artifact(Artifact::new(group.member_kind(), name, location));
        self.model.attach_member(parent, group, SmolStr::new(name), id);
        ArtDef { builder: self, id }
    }

    fn detached_member(&mut self, group: MemberGroup, name: &str) -> ArtifactId {
        let location = self.next_location();
        self.model
            .push_artifact(Artifact::new(group.member_kind(), name, location))
    }

    pub fn element(&mut self, parent: ArtifactId, name: &str) -> ArtDef<'_> {
        self.define_member(parent, MemberGroup::Elements, name)
    }

    pub fn param(&mut self, parent: ArtifactId, name: &str) -> ArtDef<'_> {
        self.define_member(parent, MemberGroup::Params, name)
    }

    pub fn enum_value(&mut self, parent: ArtifactId, name: &str) -> ArtDef<'_> {
        self.define_member(parent, MemberGroup::Enum, name)
    }

    /// Bound action of an entity.
    pub fn bound_action(&mut self, parent: ArtifactId, name: &str) -> ArtDef<'_> {
        self.define_member(parent, MemberGroup::Actions, name)
    }

    /// Foreign key `{ path as name }` of a managed association.
    pub fn foreign_key(&mut self, assoc: ArtifactId, name: &str, path: &str) -> ArtDef<'_> {
        let reference = self.new_reference(path);
        let mut def = self.define_member(assoc, MemberGroup::ForeignKeys, name);
        def.art().source_ref = Some(reference);
        def
    }

    // ========================================================================
    // EXPRESSIONS
    // ========================================================================

    fn new_reference(&mut self, text: &str) -> RefId {
        let location = self.next_location();
        self.model.push_reference(Reference::parse(text, location))
    }

    /// A path expression `a.b`, `$self.x`, `:param`.
    pub fn path(&mut self, text: &str) -> Expr {
        Expr::Ref(self.new_reference(text))
    }

    /// A path whose last step carries call arguments: `E(p: 1)`.
    pub fn call(&mut self, text: &str, args: Vec<(&str, Expr)>) -> Expr {
        let location = self.next_location();
        let mut reference = Reference::parse(text, location);
        if let Some(last) = reference.path.last_mut() {
            last.args = Some(
                args.into_iter()
                    .map(|(name, value)| StepArg {
                        name: SmolStr::new(name),
                        value,
                        location,
                    })
                    .collect(),
            );
        }
        Expr::Ref(self.model.push_reference(reference))
    }

    /// A path whose last step carries a filter: `assoc[x = 1]`.
    pub fn filtered(&mut self, text: &str, filter: Expr) -> Expr {
        let location = self.next_location();
        let mut reference = Reference::parse(text, location);
        if let Some(last) = reference.path.last_mut() {
            last.filter = Some(filter);
        }
        Expr::Ref(self.model.push_reference(reference))
    }

    pub fn literal(&mut self, literal: Literal) -> Expr {
        Expr::Literal(literal, self.next_location())
    }

    pub fn number(&mut self, n: i64) -> Expr {
        self.literal(Literal::Number(SmolStr::new(n.to_string())))
    }

    pub fn string(&mut self, s: &str) -> Expr {
        self.literal(Literal::String(SmolStr::new(s)))
    }

    /// `#symbol`
    pub fn enum_symbol(&mut self, name: &str) -> Expr {
        Expr::EnumSymbol(SmolStr::new(name), self.next_location())
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    /// `entity name as projection on source`
    pub fn projection(&mut self, name: &str, source: &str) -> QueryDef<'_> {
        let entity = self.entity(name).id();
        let location = self.model.artifact(entity).location;
        self.model.artifact_mut(entity).query = Some(Box::new(Query::new(location, true)));
        QueryDef {
            builder: self,
            entity,
        }
        .from(source)
    }

    /// `entity name as select from ...`; add sources with [`QueryDef::from`].
    pub fn select(&mut self, name: &str) -> QueryDef<'_> {
        let entity = self.entity(name).id();
        let location = self.model.artifact(entity).location;
        self.model.artifact_mut(entity).query = Some(Box::new(Query::new(location, false)));
        QueryDef {
            builder: self,
            entity,
        }
    }

    // ========================================================================
    // EXTENSIONS
    // ========================================================================

    /// `extend path with ...`
    pub fn extend(&mut self, path: &str) -> ExtDef<'_> {
        self.top_level_extension(ExtensionKind::Extend, path)
    }

    /// `annotate path with ...`
    pub fn annotate(&mut self, path: &str) -> ExtDef<'_> {
        self.top_level_extension(ExtensionKind::Annotate, path)
    }

    fn top_level_extension(&mut self, kind: ExtensionKind, path: &str) -> ExtDef<'_> {
        let source = self.current_source();
        let target = self.new_reference(path);
        let location = self.model.reference(target).location;
        let id = self.model.push_extension(Extension::new(
            kind,
            ExtensionTarget::Path(target),
            source,
            location,
        ));
        self.model.source_mut(source).extensions.push(id);
        ExtDef { builder: self, id }
    }

    fn annotation(&mut self, value: AnnoValue) -> Annotation {
        let location = self.next_location();
        Annotation::new(value, location)
    }
}

// ============================================================================
// ARTIFACT DEFINITION
// ============================================================================

/// Fluent setter for the properties of one artifact.
pub struct ArtDef<'a> {
    builder: &'a mut ModelBuilder,
    id: ArtifactId,
}

impl ArtDef<'_> {
    pub fn id(&self) -> ArtifactId {
        self.id
    }

    fn art(&mut self) -> &mut Artifact {
        self.builder.model.artifact_mut(self.id)
    }

    /// `: path`
    pub fn ty(mut self, path: &str) -> Self {
        let r = self.builder.new_reference(path);
        self.art().type_ref = Some(r);
        self
    }

    /// `: type of elem`
    pub fn type_of(mut self, path: &str) -> Self {
        let r = self.builder.new_reference(path);
        let reference = self.builder.model.reference_mut(r);
        reference.scope = RefScope::TypeOf;
        self.art().type_ref = Some(r);
        self
    }

    /// `: Base1, Base2 { ... }`
    pub fn includes(mut self, path: &str) -> Self {
        let r = self.builder.new_reference(path);
        self.art().includes.push(r);
        self
    }

    /// `Association to path`
    pub fn association(mut self, path: &str) -> Self {
        let r = self.builder.new_reference(path);
        self.art().target = Some(r);
        self
    }

    /// `Composition of path`
    pub fn composition(mut self, path: &str) -> Self {
        let r = self.builder.new_reference(path);
        let art = self.art();
        art.target = Some(r);
        art.is_composition = true;
        self
    }

    /// `Composition of { ... }` with a named aspect.
    pub fn composition_of_aspect(mut self, path: &str) -> Self {
        let r = self.builder.new_reference(path);
        let art = self.art();
        art.target_aspect = Some(r);
        art.is_composition = true;
        self
    }

    /// `on left = right`
    pub fn on_eq(mut self, left: &str, right: &str) -> Self {
        let l = self.builder.path(left);
        let r = self.builder.path(right);
        self.art().on = Some(eq(l, r));
        self
    }

    pub fn on(mut self, f: impl FnOnce(&mut ModelBuilder) -> Expr) -> Self {
        let expr = f(self.builder);
        self.art().on = Some(expr);
        self
    }

    /// Calculated element `= expr`.
    pub fn value(mut self, f: impl FnOnce(&mut ModelBuilder) -> Expr) -> Self {
        let expr = f(self.builder);
        self.art().value = Some(expr);
        self
    }

    /// `default expr`
    pub fn default_value(mut self, f: impl FnOnce(&mut ModelBuilder) -> Expr) -> Self {
        let expr = f(self.builder);
        let location = self.builder.next_location();
        self.art().default = Some(Prop::new(expr, Some(location)));
        self
    }

    pub fn cardinality(mut self, cardinality: Cardinality) -> Self {
        let location = self.builder.next_location();
        self.art().cardinality = Some(Prop::new(cardinality, Some(location)));
        self
    }

    pub fn key(mut self) -> Self {
        let location = self.art().location;
        self.art().key = Some(Prop::new(true, Some(location)));
        self
    }

    pub fn not_null(mut self) -> Self {
        let location = self.art().location;
        self.art().not_null = Some(Prop::new(true, Some(location)));
        self
    }

    pub fn masked(mut self) -> Self {
        let location = self.art().location;
        self.art().masked = Some(Prop::new(true, Some(location)));
        self
    }

    pub fn virtual_(mut self) -> Self {
        let location = self.art().location;
        self.art().is_virtual = Some(Prop::new(true, Some(location)));
        self
    }

    pub fn localized(mut self) -> Self {
        let location = self.art().location;
        self.art().localized = Some(Prop::new(true, Some(location)));
        self
    }

    pub fn length(mut self, length: u32) -> Self {
        let location = self.art().location;
        self.art().type_args.length = Some(Prop::new(length, Some(location)));
        self
    }

    pub fn precision(mut self, precision: u32, scale: u32) -> Self {
        let location = self.art().location;
        let args = &mut self.art().type_args;
        args.precision = Some(Prop::new(precision, Some(location)));
        args.scale = Some(Prop::new(scale, Some(location)));
        self
    }

    /// `@name: value`
    pub fn annotate(mut self, name: &str, value: AnnoValue) -> Self {
        let annotation = self.builder.annotation(value);
        self.art().annotations.insert(anno_name(name), annotation);
        self
    }

    /// `@name: path` with a path value.
    pub fn annotate_ref(mut self, name: &str, path: &str) -> Self {
        let r = self.builder.new_reference(path);
        self.annotate(name, AnnoValue::Ref(r))
    }

    pub fn doc(mut self, text: &str) -> Self {
        let location = self.builder.next_location();
        self.art().doc = Some(Prop::new(SmolStr::new(text), Some(location)));
        self
    }

    /// `many path`: the line type is a separate artifact.
    pub fn many(mut self, path: &str) -> Self {
        let location = self.builder.next_location();
        let r = self.builder.new_reference(path);
        let mut items = Artifact::new(ArtifactKind::Element, "items", location);
        items.type_ref = Some(r);
        items.parent = Some(self.id);
        let items = self.builder.model.push_artifact(items);
        self.art().items = Some(items);
        self
    }

    pub fn generated(mut self, generated: Generated) -> Self {
        self.art().generated = Some(generated);
        self
    }

    /// Move the artifact to `line:column` of its source.
    pub fn at(mut self, line: u32, column: u32) -> Self {
        let source = self.art().location.source;
        self.art().location = Location::at(source, line, column);
        self
    }
}

// ============================================================================
// QUERY DEFINITION
// ============================================================================

/// Fluent setter for the query of a view-like entity.
pub struct QueryDef<'a> {
    builder: &'a mut ModelBuilder,
    entity: ArtifactId,
}

impl QueryDef<'_> {
    pub fn id(&self) -> ArtifactId {
        self.entity
    }

    fn query(&mut self) -> &mut Query {
        let location = self.builder.model.artifact(self.entity).location;
        self.builder
            .model
            .artifact_mut(self.entity)
            .query
            .get_or_insert_with(|| Box::new(Query::new(location, false)))
    }

    fn push_column(&mut self, column: Column) {
        self.query().columns.get_or_insert_with(Vec::new).push(column);
    }

    /// Add a query source; the alias is the last path step.
    pub fn from(self, path: &str) -> Self {
        let alias = path.rsplit(['.', ':']).next().unwrap_or(path).to_string();
        self.from_as(path, &alias)
    }

    pub fn from_as(mut self, path: &str, alias: &str) -> Self {
        let location = self.builder.next_location();
        let source = self
            .builder
            .model
            .push_reference(Reference::parse(path, location));
        let mut art = Artifact::new(ArtifactKind::TableAlias, alias, location);
        art.source_ref = Some(source);
        art.parent = Some(self.entity);
        let id = self.builder.model.push_artifact(art);
        self.query().from.push(id);
        self
    }

    pub fn column(self, path: &str) -> Self {
        self.column_with(path, None, false)
    }

    pub fn column_as(self, path: &str, alias: &str) -> Self {
        self.column_with(path, Some(alias), false)
    }

    pub fn key_column(self, path: &str) -> Self {
        self.column_with(path, None, true)
    }

    fn column_with(mut self, path: &str, alias: Option<&str>, key: bool) -> Self {
        let value = self.builder.path(path);
        let location = self.builder.next_location();
        let mut column = ColumnValue::new(value, location);
        column.alias = alias.map(SmolStr::new);
        column.key = key;
        self.push_column(Column::Value(column));
        self
    }

    /// A column with an annotation `@name: value path`.
    pub fn column_annotated(mut self, path: &str, name: &str, value: AnnoValue) -> Self {
        let expr = self.builder.path(path);
        let location = self.builder.next_location();
        let mut column = ColumnValue::new(expr, location);
        column
            .annotations
            .insert(anno_name(name), Annotation::new(value, location));
        self.push_column(Column::Value(column));
        self
    }

    /// An expression column, e.g. `a + 1 as b`.
    pub fn column_expr(
        mut self,
        f: impl FnOnce(&mut ModelBuilder) -> Expr,
        alias: Option<&str>,
    ) -> Self {
        let value = f(self.builder);
        let location = self.builder.next_location();
        let mut column = ColumnValue::new(value, location);
        column.alias = alias.map(SmolStr::new);
        self.push_column(Column::Value(column));
        self
    }

    /// `path as alias { col, ... }`; `"*"` in `columns` is a wildcard.
    pub fn expand(mut self, path: &str, alias: Option<&str>, columns: &[&str]) -> Self {
        let value = self.builder.path(path);
        let location = self.builder.next_location();
        let mut nested = Vec::with_capacity(columns.len());
        for name in columns {
            let loc = self.builder.next_location();
            if *name == "*" {
                nested.push(Column::Wildcard(loc));
            } else {
                let value = self.builder.path(name);
                nested.push(Column::Value(ColumnValue::new(value, loc)));
            }
        }
        let mut column = ColumnValue::new(value, location);
        column.alias = alias.map(SmolStr::new);
        column.expand = Some(nested);
        self.push_column(Column::Value(column));
        self
    }

    pub fn wildcard(mut self) -> Self {
        let location = self.builder.next_location();
        self.push_column(Column::Wildcard(location));
        self
    }

    pub fn excluding(mut self, name: &str) -> Self {
        let location = self.builder.next_location();
        self.query().excluding.push((SmolStr::new(name), location));
        self
    }

    pub fn where_(mut self, f: impl FnOnce(&mut ModelBuilder) -> Expr) -> Self {
        let expr = f(self.builder);
        self.query().where_ = Some(expr);
        self
    }

    pub fn group_by(mut self, path: &str) -> Self {
        let expr = self.builder.path(path);
        self.query().group_by.push(expr);
        self
    }

    pub fn having(mut self, f: impl FnOnce(&mut ModelBuilder) -> Expr) -> Self {
        let expr = f(self.builder);
        self.query().having = Some(expr);
        self
    }

    pub fn order_by(mut self, path: &str) -> Self {
        let expr = self.builder.path(path);
        self.query().order_by.push(expr);
        self
    }

    /// `mixin { name: Association to target on left = right; }`
    pub fn mixin(mut self, name: &str, target: &str, left: &str, right: &str) -> Self {
        let location = self.builder.next_location();
        let target = self.builder.new_reference(target);
        let l = self.builder.path(left);
        let r = self.builder.path(right);
        let mut art = Artifact::new(ArtifactKind::Mixin, name, location);
        art.target = Some(target);
        art.on = Some(eq(l, r));
        art.parent = Some(self.entity);
        let id = self.builder.model.push_artifact(art);
        self.query().mixins.insert(SmolStr::new(name), id);
        self
    }
}

// ============================================================================
// EXTENSION DEFINITION
// ============================================================================

/// Fluent setter for an `extend`/`annotate` statement.
pub struct ExtDef<'a> {
    builder: &'a mut ModelBuilder,
    id: ExtensionId,
}

impl ExtDef<'_> {
    pub fn id(&self) -> ExtensionId {
        self.id
    }

    fn ext(&mut self) -> &mut Extension {
        self.builder.model.extension_mut(self.id)
    }

    /// `@name: value`
    pub fn anno(mut self, name: &str, value: AnnoValue) -> Self {
        let annotation = self.builder.annotation(value);
        self.ext().annotations.insert(anno_name(name), annotation);
        self
    }

    pub fn includes(mut self, path: &str) -> Self {
        let r = self.builder.new_reference(path);
        self.ext().includes.push(r);
        self
    }

    pub fn length(mut self, length: u32) -> Self {
        let location = self.ext().location;
        self.ext().type_args.length = Some(Prop::new(length, Some(location)));
        self
    }

    pub fn precision(mut self, precision: u32, scale: u32) -> Self {
        let location = self.ext().location;
        let args = &mut self.ext().type_args;
        args.precision = Some(Prop::new(precision, Some(location)));
        args.scale = Some(Prop::new(scale, Some(location)));
        self
    }

    fn define(mut self, group: MemberGroup, name: &str, f: impl FnOnce(ArtDef<'_>)) -> Self {
        let id = self.builder.detached_member(group, name);
        f(ArtDef {
            builder: &mut *self.builder,
            id,
        });
        self.ext()
            .members
            .entry(group)
            .or_default()
            .insert(SmolStr::new(name), MemberExtension::Define(id));
        self
    }

    /// New element `{ name: ... }`.
    pub fn element(self, name: &str, f: impl FnOnce(ArtDef<'_>)) -> Self {
        self.define(MemberGroup::Elements, name, f)
    }

    /// New bound action.
    pub fn action(self, name: &str, f: impl FnOnce(ArtDef<'_>)) -> Self {
        self.define(MemberGroup::Actions, name, f)
    }

    /// New enum symbol (`extend T with enum { name; }`).
    pub fn enum_value(self, name: &str) -> Self {
        self.define(MemberGroup::Enum, name, |_| {})
    }

    /// Nested extension of an existing member.
    pub fn member(mut self, group: MemberGroup, name: &str, f: impl FnOnce(ExtDef<'_>)) -> Self {
        let (kind, source) = {
            let ext = self.ext();
            (ext.kind, ext.source)
        };
        let location = self.builder.next_location();
        let nested = self.builder.model.push_extension(Extension::new(
            kind,
            ExtensionTarget::Member(SmolStr::new(name), location),
            source,
            location,
        ));
        f(ExtDef {
            builder: &mut *self.builder,
            id: nested,
        });
        self.ext()
            .members
            .entry(group)
            .or_default()
            .insert(SmolStr::new(name), MemberExtension::Extend(nested));
        self
    }

    /// `{ name @anno; }`
    pub fn annotate_element(self, name: &str, f: impl FnOnce(ExtDef<'_>)) -> Self {
        self.member(MemberGroup::Elements, name, f)
    }

    /// Move the statement to `line:column` of its source.
    pub fn at(mut self, line: u32, column: u32) -> Self {
        let source = self.ext().source;
        self.ext().location = Location::at(source, line, column);
        self
    }
}

// ============================================================================
// EXPRESSION HELPERS
// ============================================================================

/// Operator application.
pub fn op(op: &str, args: Vec<Expr>) -> Expr {
    Expr::Op {
        op: SmolStr::new(op),
        args,
        location: Location::default(),
    }
}

/// `left = right`
pub fn eq(left: Expr, right: Expr) -> Expr {
    op("=", vec![left, right])
}

/// Function call.
pub fn func(name: &str, args: Vec<Expr>) -> Expr {
    Expr::Func {
        name: SmolStr::new(name),
        args,
        location: Location::default(),
    }
}
