//! Tri-state visiting flags.
//!
//! One flag per artifact, indexed by arena index. Transitions are monotonic:
//! `Untouched -> InProgress -> Done`, never back.

use crate::hir::ArtifactId;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Status {
    #[default]
    Untouched,
    InProgress,
    Done,
}

/// A visited set for depth-first walks over artifacts.
#[derive(Clone, Debug, Default)]
pub struct StatusFlags {
    flags: Vec<Status>,
}

impl StatusFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: ArtifactId) -> Status {
        self.flags.get(id.index()).copied().unwrap_or_default()
    }

    /// Mark `id` in progress. Returns `false` if it was already touched,
    /// i.e. the caller re-entered a node on the current path or a finished one.
    pub fn begin(&mut self, id: ArtifactId) -> bool {
        let index = id.index();
        if index >= self.flags.len() {
            self.flags.resize(index + 1, Status::Untouched);
        }
        if self.flags[index] != Status::Untouched {
            return false;
        }
        self.flags[index] = Status::InProgress;
        true
    }

    pub fn finish(&mut self, id: ArtifactId) {
        let index = id.index();
        if index >= self.flags.len() {
            self.flags.resize(index + 1, Status::Untouched);
        }
        self.flags[index] = Status::Done;
    }

    pub fn is_done(&self, id: ArtifactId) -> bool {
        self.get(id) == Status::Done
    }

    pub fn is_in_progress(&self, id: ArtifactId) -> bool {
        self.get(id) == Status::InProgress
    }
}
