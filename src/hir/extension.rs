//! Pending `extend` / `annotate` statements.

use indexmap::IndexMap;
use smol_str::SmolStr;

use super::annotation::Annotation;
use super::artifact::{MemberGroup, TypeArgs};
use super::ids::{ArtifactId, ExtensionId, RefId};
use crate::base::{Location, SourceId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExtensionKind {
    Extend,
    Annotate,
}

impl ExtensionKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            ExtensionKind::Extend => "extend",
            ExtensionKind::Annotate => "annotate",
        }
    }
}

/// What an extension is written against.
#[derive(Clone, Debug, PartialEq)]
pub enum ExtensionTarget {
    /// Top-level statement: `extend my.E:elem with ...`.
    Path(RefId),
    /// Nested statement inside another extension: `annotate E with { elem @A; }`.
    Member(SmolStr, Location),
}

/// A member inside an extension body.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemberExtension {
    /// A new member; the artifact has no parent until the extension is applied.
    Define(ArtifactId),
    /// Extension of an existing member.
    Extend(ExtensionId),
}

#[derive(Clone, Debug)]
pub struct Extension {
    pub kind: ExtensionKind,
    pub target: ExtensionTarget,
    pub source: SourceId,
    pub location: Location,
    pub annotations: IndexMap<SmolStr, Annotation>,
    pub members: IndexMap<MemberGroup, IndexMap<SmolStr, MemberExtension>>,
    pub includes: Vec<RefId>,
    pub type_args: TypeArgs,
    pub(crate) consumed: bool,
}

impl Extension {
    pub fn new(
        kind: ExtensionKind,
        target: ExtensionTarget,
        source: SourceId,
        location: Location,
    ) -> Self {
        Self {
            kind,
            target,
            source,
            location,
            annotations: IndexMap::new(),
            members: IndexMap::new(),
            includes: Vec::new(),
            type_args: TypeArgs::default(),
            consumed: false,
        }
    }

    pub fn is_consumed(&self) -> bool {
        self.consumed
    }

    /// Members of a group, in statement order.
    pub fn members_of(&self, group: MemberGroup) -> impl Iterator<Item = (&SmolStr, &MemberExtension)> {
        self.members.get(&group).into_iter().flat_map(|m| m.iter())
    }

    /// True if the extension adds new members (not only annotates existing ones).
    pub fn defines_members(&self) -> bool {
        self.members
            .values()
            .flat_map(|m| m.values())
            .any(|m| matches!(m, MemberExtension::Define(_)))
    }
}
