//! Layering of sources.
//!
//! Sources that depend on each other (an SCC of the `using` graph) form one
//! layer. Layers are numbered in SCC emission order, so a source always has
//! a strictly higher number than every source it depends on.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use super::cycles::tarjan;
use crate::base::SourceId;
use crate::hir::Source;

/// The layer of one source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Layer {
    /// Identity of the layer: the SCC root.
    pub representative: SourceId,
    pub number: u32,
}

#[derive(Clone, Debug, Default)]
pub struct Layers {
    layers: Vec<Layer>,
    /// Representative → all representatives it transitively depends on.
    extends: FxHashMap<SourceId, FxHashSet<SourceId>>,
}

impl Layers {
    pub fn layer(&self, source: SourceId) -> Layer {
        self.layers.get(source.index()).copied().unwrap_or(Layer {
            representative: source,
            number: 0,
        })
    }

    pub fn number(&self, source: SourceId) -> u32 {
        self.layer(source).number
    }

    pub fn representative(&self, source: SourceId) -> SourceId {
        self.layer(source).representative
    }

    pub fn same_layer(&self, a: SourceId, b: SourceId) -> bool {
        self.representative(a) == self.representative(b)
    }

    /// True if the layer of `by` (transitively) depends on the layer of `lower`.
    pub fn is_dominated(&self, lower: SourceId, by: SourceId) -> bool {
        let lower = self.representative(lower);
        let by = self.representative(by);
        lower != by && self.extends.get(&by).is_some_and(|set| set.contains(&lower))
    }

    /// Neither layer depends on the other.
    pub fn are_unrelated(&self, a: SourceId, b: SourceId) -> bool {
        !self.same_layer(a, b) && !self.is_dominated(a, b) && !self.is_dominated(b, a)
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

/// Compute the layers of `sources` from their dependency lists.
pub fn set_layers(sources: &[Source]) -> Layers {
    let sccs = tarjan(sources.len(), |n| {
        sources[n].dependencies.iter().map(|d| d.index()).collect()
    });

    let mut layers = vec![
        Layer {
            representative: SourceId::new(0),
            number: 0,
        };
        sources.len()
    ];
    let mut extends: FxHashMap<SourceId, FxHashSet<SourceId>> = FxHashMap::default();

    for (position, component) in sccs.components.iter().enumerate() {
        let Some(&root) = component.last() else {
            continue;
        };
        let representative = SourceId::new(root as u32);
        let mut reach: FxHashSet<SourceId> = FxHashSet::default();
        for &member in component {
            layers[member] = Layer {
                representative,
                number: position as u32 + 1,
            };
            for dep in &sources[member].dependencies {
                if dep.index() >= sources.len() {
                    continue;
                }
                let dep_rep = SourceId::new(sccs.representative[dep.index()] as u32);
                if dep_rep == representative {
                    continue;
                }
                // components reachable from here were emitted earlier
                reach.insert(dep_rep);
                if let Some(inherited) = extends.get(&dep_rep) {
                    reach.extend(inherited.iter().copied());
                }
            }
        }
        extends.insert(representative, reach);
    }

    debug!(
        "[LAYERS] {} source(s) in {} layer(s)",
        sources.len(),
        sccs.components.len()
    );
    Layers { layers, extends }
}
