//! Cycle detection with an iterative Tarjan SCC walk.
//!
//! The walk keeps its call frames on an explicit stack, so deep or
//! pathological models cannot overflow the native stack.

use rustc_hash::FxHashSet;
use tracing::debug;

use super::{DependencyGraph, Edge};
use crate::hir::ArtifactId;

/// Strongly connected components of a graph over nodes `0..n`.
#[derive(Clone, Debug, Default)]
pub struct Sccs {
    /// Representative (root node) of each node's component.
    pub representative: Vec<usize>,
    /// Low-link per node; equal for all members of a component.
    pub lowlink: Vec<usize>,
    /// Components in emission order: a component is emitted after every
    /// component reachable from it.
    pub components: Vec<Vec<usize>>,
}

impl Sccs {
    /// O(1) "same component" test.
    pub fn same_component(&self, a: usize, b: usize) -> bool {
        self.lowlink[a] == self.lowlink[b]
    }

    /// Emission position of the component containing `node`.
    pub fn component_index(&self, node: usize) -> Option<usize> {
        let rep = self.representative[node];
        self.components
            .iter()
            .position(|c| c.last() == Some(&rep))
    }
}

struct Frame {
    node: usize,
    successors: Vec<usize>,
    next: usize,
}

/// Tarjan's algorithm without recursion.
pub fn tarjan(node_count: usize, successors: impl Fn(usize) -> Vec<usize>) -> Sccs {
    let mut index: Vec<Option<usize>> = vec![None; node_count];
    let mut lowlink = vec![0; node_count];
    let mut on_stack = vec![false; node_count];
    let mut representative: Vec<usize> = (0..node_count).collect();
    let mut stack: Vec<usize> = Vec::new();
    let mut components: Vec<Vec<usize>> = Vec::new();
    let mut work: Vec<Frame> = Vec::new();
    let mut counter = 0;

    for start in 0..node_count {
        if index[start].is_some() {
            continue;
        }
        index[start] = Some(counter);
        lowlink[start] = counter;
        counter += 1;
        stack.push(start);
        on_stack[start] = true;
        work.push(Frame {
            node: start,
            successors: successors(start),
            next: 0,
        });

        while let Some(frame) = work.last_mut() {
            let v = frame.node;
            if frame.next < frame.successors.len() {
                let w = frame.successors[frame.next];
                frame.next += 1;
                if w >= node_count {
                    continue;
                }
                match index[w] {
                    None => {
                        index[w] = Some(counter);
                        lowlink[w] = counter;
                        counter += 1;
                        stack.push(w);
                        on_stack[w] = true;
                        work.push(Frame {
                            node: w,
                            successors: successors(w),
                            next: 0,
                        });
                    }
                    Some(wi) if on_stack[w] => lowlink[v] = lowlink[v].min(wi),
                    Some(_) => {}
                }
                continue;
            }

            work.pop();
            if let Some(parent) = work.last() {
                let p = parent.node;
                lowlink[p] = lowlink[p].min(lowlink[v]);
            }
            if Some(lowlink[v]) == index[v] {
                let mut component = Vec::new();
                while let Some(w) = stack.pop() {
                    on_stack[w] = false;
                    representative[w] = v;
                    lowlink[w] = lowlink[v];
                    component.push(w);
                    if w == v {
                        break;
                    }
                }
                // the representative is the last member
                component.reverse();
                if let Some(pos) = component.iter().position(|&n| n == v) {
                    let last = component.len() - 1;
                    component.swap(pos, last);
                }
                components.push(component);
            }
        }
    }

    Sccs {
        representative,
        lowlink,
        components,
    }
}

/// What [`detect_cycles`] reports.
#[derive(Debug)]
pub enum CycleReport<'a> {
    /// A located edge between two members of one component.
    Edge(&'a Edge),
    /// A cyclic component whose edges are all silent.
    Component(Vec<ArtifactId>),
}

/// Report every located edge whose endpoints lie in the same strongly
/// connected component. Returns the number of cyclic components.
pub fn detect_cycles(
    node_count: usize,
    graph: &DependencyGraph,
    mut on_cycle: impl FnMut(CycleReport<'_>),
) -> usize {
    let sccs = tarjan(node_count, |n| {
        graph
            .outgoing(ArtifactId::from_index(n))
            .map(|e| e.to.index())
            .collect()
    });

    let mut cyclic = 0;
    for component in &sccs.components {
        let members: FxHashSet<usize> = component.iter().copied().collect();
        let internal: Vec<&Edge> = component
            .iter()
            .flat_map(|&n| graph.outgoing(ArtifactId::from_index(n)))
            .filter(|e| members.contains(&e.to.index()))
            .collect();
        // a single node is only cyclic with a self edge
        if internal.is_empty() {
            continue;
        }
        cyclic += 1;
        let mut located = false;
        for edge in internal.iter().filter(|e| !e.is_silent()) {
            located = true;
            on_cycle(CycleReport::Edge(edge));
        }
        if !located {
            on_cycle(CycleReport::Component(
                component.iter().map(|&n| ArtifactId::from_index(n)).collect(),
            ));
        }
    }
    debug!("[CYCLES] {} cyclic component(s)", cyclic);
    cyclic
}
