//! Artifacts: definitions and members of the model graph.

use indexmap::IndexMap;
use smol_str::SmolStr;

use super::annotation::Annotation;
use super::expr::Expr;
use super::ids::{ArtifactId, RefId};
use super::query::Query;
use crate::base::Location;

/// Ordered member dictionary (insertion order is the element order).
pub type Members = IndexMap<SmolStr, ArtifactId>;

// ============================================================================
// KINDS
// ============================================================================

/// The kind of an artifact.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    // Main artifacts
    Namespace,
    Context,
    Service,
    Entity,
    Aspect,
    Type,
    Event,
    Action,
    Function,
    Annotation,
    /// `cds.String`, `cds.Association`, ...
    Builtin,
    // Members
    Element,
    Param,
    EnumValue,
    ForeignKey,
    Mixin,
    TableAlias,
    /// `$user`, `$now`, ... and their elements.
    Magic,
}

impl ArtifactKind {
    /// Returns true for kinds that appear in the model-wide definitions table.
    pub fn is_main(&self) -> bool {
        matches!(
            self,
            ArtifactKind::Namespace
                | ArtifactKind::Context
                | ArtifactKind::Service
                | ArtifactKind::Entity
                | ArtifactKind::Aspect
                | ArtifactKind::Type
                | ArtifactKind::Event
                | ArtifactKind::Action
                | ArtifactKind::Function
                | ArtifactKind::Annotation
                | ArtifactKind::Builtin
        )
    }

    /// Contexts and services open a lexical block for their nested definitions.
    pub fn is_block(&self) -> bool {
        matches!(self, ArtifactKind::Context | ArtifactKind::Service)
    }

    /// Kinds which may carry (or be extended by) elements.
    pub fn can_have_elements(&self) -> bool {
        matches!(
            self,
            ArtifactKind::Entity
                | ArtifactKind::Aspect
                | ArtifactKind::Type
                | ArtifactKind::Event
                | ArtifactKind::Element
                | ArtifactKind::Param
                | ArtifactKind::Annotation
        )
    }

    /// Kinds usable as the type of an element.
    pub fn is_type_like(&self) -> bool {
        matches!(
            self,
            ArtifactKind::Type
                | ArtifactKind::Entity
                | ArtifactKind::Aspect
                | ArtifactKind::Event
                | ArtifactKind::Builtin
                | ArtifactKind::Element
                | ArtifactKind::Annotation
        )
    }

    /// Human readable kind name for messages.
    pub fn display(&self) -> &'static str {
        match self {
            ArtifactKind::Namespace => "namespace",
            ArtifactKind::Context => "context",
            ArtifactKind::Service => "service",
            ArtifactKind::Entity => "entity",
            ArtifactKind::Aspect => "aspect",
            ArtifactKind::Type => "type",
            ArtifactKind::Event => "event",
            ArtifactKind::Action => "action",
            ArtifactKind::Function => "function",
            ArtifactKind::Annotation => "annotation",
            ArtifactKind::Builtin => "builtin",
            ArtifactKind::Element => "element",
            ArtifactKind::Param => "param",
            ArtifactKind::EnumValue => "enum",
            ArtifactKind::ForeignKey => "key",
            ArtifactKind::Mixin => "mixin",
            ArtifactKind::TableAlias => "alias",
            ArtifactKind::Magic => "variable",
        }
    }
}

/// How a property or an artifact came into being when not written by the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Inferred {
    /// Copied from an included aspect/type (derived-via-include).
    Include,
    /// Copied down by the property propagator.
    Propagated,
    /// Created for an `expand` column.
    Expand,
    /// Created for a query element coming from `*`.
    Wildcard,
    /// Namespace implicitly created for a dotted name prefix.
    Namespace,
}

/// Artifacts generated by the compiler rather than written by the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Generated {
    AutoExposed,
    Localized,
    Composition,
}

// ============================================================================
// PROPERTY VALUES
// ============================================================================

/// A property value together with its provenance.
#[derive(Clone, Debug, PartialEq)]
pub struct Prop<T> {
    pub value: T,
    pub location: Option<Location>,
    pub inferred: Option<Inferred>,
}

impl<T> Prop<T> {
    pub fn new(value: T, location: Option<Location>) -> Self {
        Self {
            value,
            location,
            inferred: None,
        }
    }

    pub fn inferred(value: T, inferred: Inferred) -> Self {
        Self {
            value,
            location: None,
            inferred: Some(inferred),
        }
    }

    pub fn is_inferred(&self) -> bool {
        self.inferred.is_some()
    }
}

/// Boolean properties: `key`, `not null`, `virtual`, `masked`, `localized`.
pub type Flag = Prop<bool>;

/// Type arguments like `String(100)` or `Decimal(10, 3)`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TypeArgs {
    pub length: Option<Prop<u32>>,
    pub precision: Option<Prop<u32>>,
    pub scale: Option<Prop<u32>>,
    pub srid: Option<Prop<u32>>,
}

impl TypeArgs {
    pub fn is_empty(&self) -> bool {
        self.length.is_none()
            && self.precision.is_none()
            && self.scale.is_none()
            && self.srid.is_none()
    }
}

/// Maximum of a cardinality: a number or `*`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CardMax {
    Number(u32),
    Many,
}

/// Association cardinality `[src, min..max]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cardinality {
    pub source_max: Option<CardMax>,
    pub target_min: Option<u32>,
    pub target_max: CardMax,
}

// ============================================================================
// ARTIFACT
// ============================================================================

/// A named node in the model graph.
#[derive(Clone, Debug)]
pub struct Artifact {
    pub kind: ArtifactKind,
    /// Local name: the last segment for definitions, the member name otherwise.
    pub name: SmolStr,
    /// Absolute name, only set for main artifacts.
    pub absolute: Option<SmolStr>,
    pub location: Location,
    /// Owning artifact for members; `None` for main artifacts.
    pub parent: Option<ArtifactId>,
    /// Enclosing context/service block of a definition.
    pub block: Option<ArtifactId>,
    /// Definitions whose absolute name continues this one (`a` → `a.b`).
    pub sub_artifacts: Members,

    pub elements: Option<Members>,
    pub actions: Option<Members>,
    pub params: Option<Members>,
    pub enum_values: Option<Members>,
    pub foreign_keys: Option<Members>,
    /// Line type of an arrayed (`many`) artifact.
    pub items: Option<ArtifactId>,
    /// `returns` of actions and functions.
    pub returns: Option<ArtifactId>,

    pub type_ref: Option<RefId>,
    pub type_args: TypeArgs,
    pub target: Option<RefId>,
    pub target_aspect: Option<RefId>,
    pub is_composition: bool,
    pub on: Option<Expr>,
    pub cardinality: Option<Prop<Cardinality>>,
    /// Calculated-element expression.
    pub value: Option<Expr>,
    pub default: Option<Prop<Expr>>,
    /// Query source of a table alias, target element of a foreign key.
    pub source_ref: Option<RefId>,

    /// Weak back-reference to the artifact this one was derived from.
    pub origin: Option<ArtifactId>,
    pub includes: Vec<RefId>,
    pub query: Option<Box<Query>>,

    /// Annotation assignments keyed by `@`-prefixed name.
    pub annotations: IndexMap<SmolStr, Annotation>,
    pub doc: Option<Prop<SmolStr>>,
    pub key: Option<Flag>,
    pub not_null: Option<Flag>,
    pub is_virtual: Option<Flag>,
    pub masked: Option<Flag>,
    pub localized: Option<Flag>,

    pub inferred: Option<Inferred>,
    pub generated: Option<Generated>,
    /// The artifact is a locally re-projected shape (`expand` column).
    pub expanded: bool,
}

impl Artifact {
    pub fn new(kind: ArtifactKind, name: impl Into<SmolStr>, location: Location) -> Self {
        Self {
            kind,
            name: name.into(),
            absolute: None,
            location,
            parent: None,
            block: None,
            sub_artifacts: Members::new(),
            elements: None,
            actions: None,
            params: None,
            enum_values: None,
            foreign_keys: None,
            items: None,
            returns: None,
            type_ref: None,
            type_args: TypeArgs::default(),
            target: None,
            target_aspect: None,
            is_composition: false,
            on: None,
            cardinality: None,
            value: None,
            default: None,
            source_ref: None,
            origin: None,
            includes: Vec::new(),
            query: None,
            annotations: IndexMap::new(),
            doc: None,
            key: None,
            not_null: None,
            is_virtual: None,
            masked: None,
            localized: None,
            inferred: None,
            generated: None,
            expanded: false,
        }
    }

    /// The member dictionary of the given group, if the artifact has one.
    pub fn members(&self, group: MemberGroup) -> Option<&Members> {
        match group {
            MemberGroup::Elements => self.elements.as_ref(),
            MemberGroup::Actions => self.actions.as_ref(),
            MemberGroup::Params => self.params.as_ref(),
            MemberGroup::Enum => self.enum_values.as_ref(),
            MemberGroup::ForeignKeys => self.foreign_keys.as_ref(),
        }
    }

    /// The member dictionary of the given group, created on demand.
    pub fn members_mut(&mut self, group: MemberGroup) -> &mut Members {
        let slot = match group {
            MemberGroup::Elements => &mut self.elements,
            MemberGroup::Actions => &mut self.actions,
            MemberGroup::Params => &mut self.params,
            MemberGroup::Enum => &mut self.enum_values,
            MemberGroup::ForeignKeys => &mut self.foreign_keys,
        };
        slot.get_or_insert_with(Members::new)
    }

    pub fn is_key(&self) -> bool {
        self.key.as_ref().is_some_and(|k| k.value)
    }

    /// Derived-via-include marker.
    pub fn is_included(&self) -> bool {
        self.inferred == Some(Inferred::Include)
    }

    pub fn is_generated(&self) -> bool {
        self.generated.is_some()
    }

    /// Association or composition written with an explicit target.
    pub fn has_target(&self) -> bool {
        self.target.is_some() || self.target_aspect.is_some()
    }

    /// Association without foreign keys but with an `on` condition.
    pub fn is_unmanaged(&self) -> bool {
        self.on.is_some()
    }
}

/// The member dictionaries an artifact can carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MemberGroup {
    Elements,
    Actions,
    Params,
    Enum,
    ForeignKeys,
}

impl MemberGroup {
    pub const ALL: [MemberGroup; 5] = [
        MemberGroup::Elements,
        MemberGroup::Actions,
        MemberGroup::Params,
        MemberGroup::Enum,
        MemberGroup::ForeignKeys,
    ];

    pub fn member_kind(&self) -> ArtifactKind {
        match self {
            MemberGroup::Elements => ArtifactKind::Element,
            MemberGroup::Actions => ArtifactKind::Action,
            MemberGroup::Params => ArtifactKind::Param,
            MemberGroup::Enum => ArtifactKind::EnumValue,
            MemberGroup::ForeignKeys => ArtifactKind::ForeignKey,
        }
    }
}
