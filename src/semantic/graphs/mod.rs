//! Dependency graphs between artifacts and between sources.
//!
//! Edges are recorded while references are resolved; [`cycles`] finds the
//! strongly connected components, [`layers`] orders sources by them.

pub mod cycles;
pub mod layers;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::base::Location;
use crate::hir::ArtifactId;

pub use cycles::{CycleReport, Sccs, detect_cycles, tarjan};
pub use layers::{Layer, Layers, set_layers};

/// A dependency `from -> to`.
///
/// Edges without location are "silent": structural membership edges which
/// never produce a diagnostic of their own.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Edge {
    pub from: ArtifactId,
    pub to: ArtifactId,
    pub location: Option<Location>,
}

impl Edge {
    pub fn is_silent(&self) -> bool {
        self.location.is_none()
    }
}

/// Artifact dependency edges, deduplicated.
#[derive(Clone, Debug, Default)]
pub struct DependencyGraph {
    edges: Vec<Edge>,
    outgoing: FxHashMap<ArtifactId, Vec<usize>>,
    seen: FxHashSet<(ArtifactId, ArtifactId, Option<Location>)>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an edge; returns `false` for a duplicate.
    pub fn add(&mut self, edge: Edge) -> bool {
        if !self.seen.insert((edge.from, edge.to, edge.location)) {
            return false;
        }
        self.outgoing
            .entry(edge.from)
            .or_default()
            .push(self.edges.len());
        self.edges.push(edge);
        true
    }

    /// Membership edge `parent -> member`.
    pub fn add_silent(&mut self, from: ArtifactId, to: ArtifactId) -> bool {
        self.add(Edge {
            from,
            to,
            location: None,
        })
    }

    /// Reference edge `user -> referenced` at `location`.
    pub fn add_located(&mut self, from: ArtifactId, to: ArtifactId, location: Location) -> bool {
        self.add(Edge {
            from,
            to,
            location: Some(location),
        })
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn outgoing(&self, from: ArtifactId) -> impl Iterator<Item = &Edge> {
        self.outgoing
            .get(&from)
            .into_iter()
            .flatten()
            .map(|&i| &self.edges[i])
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}
