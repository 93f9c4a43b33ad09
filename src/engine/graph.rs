//! System dependency graph and execution ordering.
//!
//! Systems refer to each other by name. This module resolves those names into
//! edges between registration indices and produces a topological order.
//!
//! ## Edge semantics
//! * `pre_deps` and `deps` of `S` each contribute an edge `D -> S`.
//! * `post_deps` of `S` each contribute an edge `S -> D`.
//! * Duplicate edges collapse.
//!
//! ## Ordering
//! Kahn's algorithm with a min-heap of ready nodes keyed by registration
//! index. Among systems with no ordering constraint between them, the one
//! registered first runs first, so the order is a pure function of the
//! registration sequence.
//!
//! ## Cycles
//! When Kahn's algorithm stalls, every unemitted node still has at least one
//! unemitted predecessor. Walking predecessor links from the lowest unemitted
//! node must therefore revisit a node, and the revisited stretch is a cycle.
//! The cycle is reported by name in edge order.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::engine::error::DependencyError;
use crate::engine::systems::SystemDescriptor;


/// How unknown dependency names are treated while building the graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// Every name must resolve; used by finalization.
    Strict,
    /// Unknown names are skipped; used for the cycle check at registration,
    /// when later systems may not exist yet.
    Partial,
}

/// Directed graph over systems, indexed by registration order.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    names: Vec<String>,
    successors: Vec<Vec<usize>>,
    predecessors: Vec<Vec<usize>>,
}

impl DependencyGraph {
    /// Builds the graph for `descriptors`, in registration order.
    ///
    /// ## Errors
    /// `UnresolvedDependency` under [`Resolution::Strict`] when a name does
    /// not match any descriptor.
    pub fn build<'a, I>(descriptors: I, resolution: Resolution) -> Result<Self, DependencyError>
    where
        I: IntoIterator<Item = &'a SystemDescriptor>,
    {
        let descriptors: Vec<&SystemDescriptor> = descriptors.into_iter().collect();
        let names: Vec<String> = descriptors.iter().map(|d| d.name.clone()).collect();
        let n = names.len();

        let lookup = |system: &str, dependency: &str| -> Result<Option<usize>, DependencyError> {
            match names.iter().position(|name| name == dependency) {
                Some(index) => Ok(Some(index)),
                None if resolution == Resolution::Partial => Ok(None),
                None => Err(DependencyError::UnresolvedDependency {
                    system: system.to_owned(),
                    dependency: dependency.to_owned(),
                }),
            }
        };

        let mut successors = vec![Vec::new(); n];
        let mut predecessors = vec![Vec::new(); n];
        let mut add_edge = |from: usize, to: usize| {
            if !successors[from].contains(&to) {
                successors[from].push(to);
                predecessors[to].push(from);
            }
        };

        for (index, descriptor) in descriptors.iter().enumerate() {
            for dependency in descriptor.predecessors() {
                if let Some(before) = lookup(&descriptor.name, dependency)? {
                    add_edge(before, index);
                }
            }
            for dependent in descriptor.successors() {
                if let Some(after) = lookup(&descriptor.name, dependent)? {
                    add_edge(index, after);
                }
            }
        }

        for list in successors.iter_mut().chain(predecessors.iter_mut()) {
            list.sort_unstable();
        }

        Ok(Self { names, successors, predecessors })
    }

    /// Number of systems in the graph.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns `true` if the graph has no systems.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Systems that must run after `node`.
    pub fn successors(&self, node: usize) -> &[usize] {
        &self.successors[node]
    }

    /// Systems that must run before `node`.
    pub fn predecessors(&self, node: usize) -> &[usize] {
        &self.predecessors[node]
    }

    /// Stable topological order of all systems.
    ///
    /// ## Errors
    /// `Cycle` naming the systems on one cycle, first name repeated last.
    pub fn topological_order(&self) -> Result<Vec<usize>, DependencyError> {
        let n = self.len();
        let mut in_degree: Vec<usize> = self.predecessors.iter().map(Vec::len).collect();
        let mut ready: BinaryHeap<Reverse<usize>> = (0..n)
            .filter(|&node| in_degree[node] == 0)
            .map(Reverse)
            .collect();

        let mut order = Vec::with_capacity(n);
        while let Some(Reverse(node)) = ready.pop() {
            order.push(node);
            for &next in &self.successors[node] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    ready.push(Reverse(next));
                }
            }
        }

        if order.len() == n {
            return Ok(order);
        }

        let mut emitted = vec![false; n];
        for &node in &order {
            emitted[node] = true;
        }
        Err(DependencyError::Cycle { path: self.cycle_path(&emitted) })
    }

    fn cycle_path(&self, emitted: &[bool]) -> Vec<String> {
        let Some(start) = emitted.iter().position(|done| !done) else {
            return Vec::new();
        };

        let mut walk = vec![start];
        let mut seen_at = vec![usize::MAX; self.len()];
        seen_at[start] = 0;
        let mut node = start;
        loop {
            // an unemitted node always has an unemitted predecessor
            let Some(&prev) = self.predecessors[node].iter().find(|&&p| !emitted[p]) else {
                return Vec::new();
            };
            if seen_at[prev] != usize::MAX {
                let mut cycle: Vec<usize> = walk[seen_at[prev]..].to_vec();
                cycle.reverse();
                let mut path: Vec<String> = cycle.iter().map(|&i| self.names[i].clone()).collect();
                path.push(path[0].clone());
                return path;
            }
            seen_at[prev] = walk.len();
            walk.push(prev);
            node = prev;
        }
    }
}
