//! The model arena.
//!
//! All artifacts, references and extensions are stored in vectors and
//! addressed by index ([`ArtifactId`], [`RefId`], [`ExtensionId`]). This is
//! the single source of truth; every other structure refers into it.

use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use smol_str::SmolStr;

use super::annotation::Annotation;
use super::artifact::{Artifact, ArtifactKind, MemberGroup};
use super::extension::Extension;
use super::ids::{ArtifactId, ExtensionId, RefId};
use super::reference::Reference;
use super::source::Source;
use crate::base::SourceId;

/// A CDS model: definitions, their members and the pending extensions.
#[derive(Clone, Debug, Default)]
pub struct Model {
    artifacts: Vec<Artifact>,
    refs: Vec<Reference>,
    extensions: Vec<Extension>,
    sources: Vec<Source>,
    /// Absolute name → main artifact (IndexMap keeps definition order).
    definitions: IndexMap<SmolStr, ArtifactId>,
    /// `$user`, `$now`, ...
    magic: IndexMap<SmolStr, ArtifactId>,
    /// Unqualified builtin names: `String` → `cds.String`.
    builtins: IndexMap<SmolStr, ArtifactId>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // ARENA ACCESS
    // ========================================================================

    pub fn artifact(&self, id: ArtifactId) -> &Artifact {
        &self.artifacts[id.index()]
    }

    pub fn artifact_mut(&mut self, id: ArtifactId) -> &mut Artifact {
        &mut self.artifacts[id.index()]
    }

    pub fn get_artifact(&self, id: ArtifactId) -> Option<&Artifact> {
        self.artifacts.get(id.index())
    }

    pub fn push_artifact(&mut self, artifact: Artifact) -> ArtifactId {
        let id = ArtifactId::from_index(self.artifacts.len());
        self.artifacts.push(artifact);
        id
    }

    /// Number of artifacts, including members and generated ones.
    pub fn artifact_count(&self) -> usize {
        self.artifacts.len()
    }

    /// All artifact ids in creation order.
    pub fn artifact_ids(&self) -> impl Iterator<Item = ArtifactId> + use<> {
        (0..self.artifacts.len()).map(ArtifactId::from_index)
    }

    pub fn reference(&self, id: RefId) -> &Reference {
        &self.refs[id.index()]
    }

    pub fn reference_mut(&mut self, id: RefId) -> &mut Reference {
        &mut self.refs[id.index()]
    }

    pub fn push_reference(&mut self, reference: Reference) -> RefId {
        let id = RefId::from_index(self.refs.len());
        self.refs.push(reference);
        id
    }

    pub fn reference_count(&self) -> usize {
        self.refs.len()
    }

    pub fn extension(&self, id: ExtensionId) -> &Extension {
        &self.extensions[id.index()]
    }

    pub fn extension_mut(&mut self, id: ExtensionId) -> &mut Extension {
        &mut self.extensions[id.index()]
    }

    pub fn push_extension(&mut self, extension: Extension) -> ExtensionId {
        let id = ExtensionId::from_index(self.extensions.len());
        self.extensions.push(extension);
        id
    }

    pub fn extension_ids(&self) -> impl Iterator<Item = ExtensionId> + use<> {
        (0..self.extensions.len()).map(ExtensionId::from_index)
    }

    pub fn source(&self, id: SourceId) -> &Source {
        &self.sources[id.index()]
    }

    pub fn source_mut(&mut self, id: SourceId) -> &mut Source {
        &mut self.sources[id.index()]
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn push_source(&mut self, filename: &str) -> SourceId {
        let id = SourceId::new(self.sources.len() as u32);
        self.sources.push(Source::new(id, filename));
        id
    }

    // ========================================================================
    // NAME TABLES
    // ========================================================================

    /// Look up a main artifact by absolute name.
    pub fn definition(&self, name: &str) -> Option<ArtifactId> {
        self.definitions.get(name).copied()
    }

    pub fn definitions(&self) -> impl Iterator<Item = (&SmolStr, ArtifactId)> {
        self.definitions.iter().map(|(n, id)| (n, *id))
    }

    pub(crate) fn register_definition(&mut self, name: SmolStr, id: ArtifactId) {
        self.definitions.insert(name, id);
    }

    pub fn magic(&self, name: &str) -> Option<ArtifactId> {
        self.magic.get(name).copied()
    }

    pub fn magic_variables(&self) -> impl Iterator<Item = (&SmolStr, ArtifactId)> {
        self.magic.iter().map(|(n, id)| (n, *id))
    }

    pub(crate) fn register_magic(&mut self, name: SmolStr, id: ArtifactId) {
        self.magic.insert(name, id);
    }

    pub fn builtin(&self, short_name: &str) -> Option<ArtifactId> {
        self.builtins.get(short_name).copied()
    }

    pub fn builtins(&self) -> impl Iterator<Item = (&SmolStr, ArtifactId)> {
        self.builtins.iter().map(|(n, id)| (n, *id))
    }

    pub(crate) fn register_builtin(&mut self, short_name: SmolStr, id: ArtifactId) {
        self.builtins.insert(short_name, id);
    }

    // ========================================================================
    // NAVIGATION
    // ========================================================================

    /// The main artifact owning `id` (itself for main artifacts).
    pub fn main_of(&self, id: ArtifactId) -> ArtifactId {
        let mut current = id;
        // bounded walk: a parent cycle is reported by `check_invariants`
        for _ in 0..self.artifacts.len() {
            match self.artifact(current).parent {
                Some(parent) => current = parent,
                None => return current,
            }
        }
        current
    }

    /// Member `name` of group `group` of artifact `id`.
    pub fn member(&self, id: ArtifactId, group: MemberGroup, name: &str) -> Option<ArtifactId> {
        self.artifact(id)
            .members(group)
            .and_then(|m| m.get(name))
            .copied()
    }

    /// Element `name` of `id` (own elements only).
    pub fn element(&self, id: ArtifactId, name: &str) -> Option<ArtifactId> {
        self.member(id, MemberGroup::Elements, name)
    }

    /// Attach `child` as member `name` of `parent`.
    pub(crate) fn attach_member(
        &mut self,
        parent: ArtifactId,
        group: MemberGroup,
        name: SmolStr,
        child: ArtifactId,
    ) {
        self.artifact_mut(child).parent = Some(parent);
        self.artifact_mut(parent).members_mut(group).insert(name, child);
    }

    /// The resolved `type` of an artifact.
    pub fn type_of(&self, id: ArtifactId) -> Option<ArtifactId> {
        self.artifact(id)
            .type_ref
            .and_then(|r| self.reference(r).artifact())
    }

    /// The resolved association target of an artifact.
    pub fn target_of(&self, id: ArtifactId) -> Option<ArtifactId> {
        let art = self.artifact(id);
        art.target
            .or(art.target_aspect)
            .and_then(|r| self.reference(r).artifact())
    }

    pub fn annotation(&self, id: ArtifactId, name: &str) -> Option<&Annotation> {
        self.artifact(id).annotations.get(name)
    }

    /// Name used in messages: `my.E`, `my.E:struct.elem`, `my.E:act(p)`.
    pub fn display_name(&self, id: ArtifactId) -> String {
        let art = self.artifact(id);
        if let Some(absolute) = &art.absolute {
            return absolute.to_string();
        }
        let Some(parent) = art.parent else {
            return art.name.to_string();
        };
        let parent_art = self.artifact(parent);
        let parent_name = self.display_name(parent);
        match art.kind {
            ArtifactKind::Param => format!("{}({})", parent_name, art.name),
            _ if parent_art.kind == ArtifactKind::Magic => format!("{}.{}", parent_name, art.name),
            _ if parent_art.absolute.is_some() => format!("{}:{}", parent_name, art.name),
            _ => format!("{}.{}", parent_name, art.name),
        }
    }

    // ========================================================================
    // INVARIANTS
    // ========================================================================

    /// Check the structural invariants the define phase must establish.
    ///
    /// Returns a description of the first violation.
    pub fn check_invariants(&self) -> Result<(), String> {
        let mut owned: FxHashSet<ArtifactId> = FxHashSet::default();
        for id in self.artifact_ids() {
            let art = self.artifact(id);
            if let Some(parent) = art.parent {
                if self.get_artifact(parent).is_none() {
                    return Err(format!("{} has dangling parent {}", id, parent));
                }
            }
            if self.artifact(self.main_of(id)).parent.is_some() {
                return Err(format!("parent chain of {} does not reach a main artifact", id));
            }
            for group in MemberGroup::ALL {
                for (name, &member) in art.members(group).into_iter().flatten() {
                    let Some(child) = self.get_artifact(member) else {
                        return Err(format!("{}.{} is a dangling member index", id, name));
                    };
                    if child.parent != Some(id) {
                        return Err(format!(
                            "member {} of {} has a different parent",
                            name,
                            self.display_name(id)
                        ));
                    }
                    if !owned.insert(member) {
                        return Err(format!(
                            "{} is member of more than one dictionary",
                            self.display_name(member)
                        ));
                    }
                }
            }
            for r in art.type_ref.iter().chain(&art.target).chain(&art.includes) {
                if r.index() >= self.refs.len() {
                    return Err(format!("{} has a dangling reference {}", id, r));
                }
            }
        }
        Ok(())
    }
}
