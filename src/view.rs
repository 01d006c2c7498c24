//! Per-request working view of the road network.
//!
//! A request never copies the adjacency structure. It borrows the shared
//! `RoadNetwork` and owns only a removal bitset, one bit per node; traversal
//! consults the bitset instead of a mutated graph. Removing a node
//! implicitly removes its incident arcs, because no traversal will cross an
//! endpoint whose bit is set.

use crate::graph::{NodeId, RoadNetwork};

/// Node-removal mask over a borrowed base graph. Exclusively owned by the
/// request that built it; dropped at response time.
#[derive(Debug)]
pub struct GraphView<'g> {
    graph: &'g RoadNetwork,
    removed: Vec<u64>,
    removed_count: usize,
}

impl<'g> GraphView<'g> {
    /// View with nothing removed; behaviorally identical to the base graph.
    pub fn full(graph: &'g RoadNetwork) -> Self {
        let words = graph.node_count().div_ceil(64);
        Self {
            graph,
            removed: vec![0u64; words],
            removed_count: 0,
        }
    }

    pub fn graph(&self) -> &'g RoadNetwork {
        self.graph
    }

    /// Mark a node removed. Returns whether the bit was newly set.
    pub fn remove(&mut self, node: NodeId) -> bool {
        let word = node as usize / 64;
        let bit = 1u64 << (node as usize % 64);
        if self.removed[word] & bit != 0 {
            return false;
        }
        self.removed[word] |= bit;
        self.removed_count += 1;
        true
    }

    /// Whether a node is still present in the view.
    pub fn contains(&self, node: NodeId) -> bool {
        let word = node as usize / 64;
        self.removed[word] & (1u64 << (node as usize % 64)) == 0
    }

    pub fn removed_count(&self) -> usize {
        self.removed_count
    }

    /// Nodes remaining in the view.
    pub fn node_count(&self) -> usize {
        self.graph.node_count() - self.removed_count
    }

    pub fn is_empty(&self) -> bool {
        self.node_count() == 0
    }

    /// Arcs with both endpoints present. O(arcs); used by diagnostics and
    /// tests, not by the search itself.
    pub fn active_arc_count(&self) -> usize {
        self.graph
            .node_indices()
            .filter(|&n| self.contains(n))
            .map(|n| {
                self.graph
                    .neighbors(n)
                    .filter(|&(to, _)| self.contains(to))
                    .count()
            })
            .sum()
    }

    /// Outgoing arcs of `node` whose target is still present.
    pub fn neighbors(&self, node: NodeId) -> impl Iterator<Item = (NodeId, f64)> + '_ {
        self.graph
            .neighbors(node)
            .filter(move |&(to, _)| self.contains(to))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::undirected_arcs;

    fn line_network() -> RoadNetwork {
        let nodes = vec![
            (1, (0.0, 0.0)),
            (2, (1.0, 0.0)),
            (3, (2.0, 0.0)),
            (4, (3.0, 0.0)),
        ];
        let arcs = undirected_arcs(&nodes, &[(1, 2, 1.0), (2, 3, 1.0), (3, 4, 1.0)]);
        RoadNetwork::from_parts(32610, nodes, arcs).unwrap()
    }

    #[test]
    fn test_full_view_matches_base_counts() {
        let net = line_network();
        let view = GraphView::full(&net);
        assert_eq!(view.node_count(), net.node_count());
        assert_eq!(view.active_arc_count(), net.arc_count());
        assert!(net.node_indices().all(|n| view.contains(n)));
    }

    #[test]
    fn test_remove_drops_incident_arcs() {
        let net = line_network();
        let mut view = GraphView::full(&net);
        assert!(view.remove(1));
        assert!(!view.remove(1), "second removal is a no-op");

        assert_eq!(view.removed_count(), 1);
        assert_eq!(view.node_count(), 3);
        assert!(!view.contains(1));
        // Arcs 0->1, 1->0, 1->2, 2->1 all vanish with node 1; 2 of 6 remain.
        assert_eq!(view.active_arc_count(), 2);
        assert_eq!(view.neighbors(0).count(), 0);
        assert_eq!(view.neighbors(2).collect::<Vec<_>>(), vec![(3, 1.0)]);
    }

    #[test]
    fn test_view_can_empty_out() {
        let net = line_network();
        let mut view = GraphView::full(&net);
        for n in net.node_indices() {
            view.remove(n);
        }
        assert!(view.is_empty());
        assert_eq!(view.active_arc_count(), 0);
    }
}
