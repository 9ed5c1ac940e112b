//! Pass 7: dependency ordering over the call graph.
//!
//! Kahn's algorithm with a smallest-id-first tie break, so the produced
//! order is deterministic for a given tree. A cycle — direct or mutual
//! recursion — fails ordering outright: no fixpoint cost inference is
//! attempted for recursive functions.

use std::collections::{BTreeMap, BTreeSet};

use tally_types::ast::NodeId;

/// A set of precedence edges: `(a, b)` means `a` must precede `b`.
#[derive(Debug, Default)]
pub(crate) struct CallGraph {
    pub nodes: BTreeSet<NodeId>,
    pub edges: BTreeSet<(NodeId, NodeId)>,
}

impl CallGraph {
    pub fn add_node(&mut self, node: NodeId) {
        self.nodes.insert(node);
    }

    pub fn add_edge(&mut self, before: NodeId, after: NodeId) {
        self.nodes.insert(before);
        self.nodes.insert(after);
        self.edges.insert((before, after));
    }
}

/// Order the graph's nodes so every edge `(a, b)` has `index(a) < index(b)`.
///
/// On a cycle, returns the participating nodes (everything left with an
/// unsatisfied predecessor) instead of a partial order.
pub(crate) fn toposort(graph: &CallGraph) -> Result<Vec<NodeId>, Vec<NodeId>> {
    let mut indegree: BTreeMap<NodeId, usize> =
        graph.nodes.iter().map(|&n| (n, 0)).collect();
    for (_, after) in &graph.edges {
        if let Some(d) = indegree.get_mut(after) {
            *d += 1;
        }
    }
    let mut ready: BTreeSet<NodeId> = indegree
        .iter()
        .filter(|(_, &d)| d == 0)
        .map(|(&n, _)| n)
        .collect();
    let mut order = Vec::with_capacity(graph.nodes.len());
    while let Some(&node) = ready.iter().next() {
        ready.remove(&node);
        order.push(node);
        for &(before, after) in &graph.edges {
            if before != node {
                continue;
            }
            if let Some(d) = indegree.get_mut(&after) {
                *d -= 1;
                if *d == 0 {
                    ready.insert(after);
                }
            }
        }
    }
    if order.len() == graph.nodes.len() {
        Ok(order)
    } else {
        let placed: BTreeSet<NodeId> = order.into_iter().collect();
        Err(graph
            .nodes
            .iter()
            .copied()
            .filter(|n| !placed.contains(n))
            .collect())
    }
}
