//! Spatial index for snapping metric points to road nodes.
//!
//! Built once over the base graph at startup and shared by all requests.
//! Queries are filtered by the request's working view, so a node removed by
//! an exclusion zone can never be returned. Equidistant candidates resolve
//! to the smallest node id on both the R-tree path and the exhaustive-scan
//! path, keeping results reproducible across runs and implementations.

use rstar::{PointDistance, RTree, RTreeObject, AABB};

use crate::graph::{NodeId, RoadNetwork};
use crate::view::GraphView;

/// Metric node position carried in the R-tree.
#[derive(Clone, Copy, Debug, PartialEq)]
struct IndexedPoint {
    coords: [f64; 2],
    node: NodeId,
}

impl RTreeObject for IndexedPoint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.coords)
    }
}

impl PointDistance for IndexedPoint {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.coords[0] - point[0];
        let dy = self.coords[1] - point[1];
        dx * dx + dy * dy
    }

    fn contains_point(&self, point: &[f64; 2]) -> bool {
        self.coords == *point
    }
}

/// Nearest-node resolver over the base graph's coordinate index.
pub struct NodeLocator {
    tree: RTree<IndexedPoint>,
}

impl NodeLocator {
    /// Bulk-load the index from every base node.
    pub fn build(graph: &RoadNetwork) -> Self {
        let points = graph
            .node_indices()
            .map(|node| {
                let (x, y) = graph.coord(node);
                IndexedPoint {
                    coords: [x, y],
                    node,
                }
            })
            .collect();
        Self {
            tree: RTree::bulk_load(points),
        }
    }

    /// Nearest view-member node to a metric point, `None` when the view has
    /// no nodes left. Ties resolve to the smallest node id.
    pub fn nearest(&self, point: (f64, f64), view: &GraphView<'_>) -> Option<NodeId> {
        let query = [point.0, point.1];
        let mut best: Option<(f64, NodeId)> = None;

        for (candidate, d2) in self.tree.nearest_neighbor_iter_with_distance_2(&query) {
            match best {
                Some((best_d2, best_node)) => {
                    if d2 > best_d2 {
                        break;
                    }
                    if view.contains(candidate.node) && candidate.node < best_node {
                        best = Some((best_d2, candidate.node));
                    }
                }
                None => {
                    if view.contains(candidate.node) {
                        best = Some((d2, candidate.node));
                    }
                }
            }
        }

        best.map(|(_, node)| node)
    }

    /// Exhaustive-scan resolver over ascending node ids. Same contract as
    /// `nearest`; kept as the correctness oracle the index is checked
    /// against.
    pub fn nearest_scan(
        graph: &RoadNetwork,
        point: (f64, f64),
        view: &GraphView<'_>,
    ) -> Option<NodeId> {
        let mut best: Option<(f64, NodeId)> = None;
        for node in graph.node_indices() {
            if !view.contains(node) {
                continue;
            }
            let (x, y) = graph.coord(node);
            let dx = x - point.0;
            let dy = y - point.1;
            let d2 = dx * dx + dy * dy;
            // Strict less-than keeps the lowest id among equidistant nodes.
            if best.map_or(true, |(bd2, _)| d2 < bd2) {
                best = Some((d2, node));
            }
        }
        best.map(|(_, node)| node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::undirected_arcs;

    fn grid_network() -> RoadNetwork {
        // 2x2 unit grid, ids assigned row-major.
        let nodes = vec![
            (10, (0.0, 0.0)),
            (11, (1.0, 0.0)),
            (12, (0.0, 1.0)),
            (13, (1.0, 1.0)),
        ];
        let arcs = undirected_arcs(
            &nodes,
            &[(10, 11, 1.0), (10, 12, 1.0), (11, 13, 1.0), (12, 13, 1.0)],
        );
        RoadNetwork::from_parts(32610, nodes, arcs).unwrap()
    }

    #[test]
    fn test_nearest_basic() {
        let net = grid_network();
        let locator = NodeLocator::build(&net);
        let view = GraphView::full(&net);
        assert_eq!(locator.nearest((0.1, 0.2), &view), Some(0));
        assert_eq!(locator.nearest((0.9, 0.95), &view), Some(3));
    }

    #[test]
    fn test_nearest_respects_view() {
        let net = grid_network();
        let locator = NodeLocator::build(&net);
        let mut view = GraphView::full(&net);
        view.remove(0);
        let got = locator.nearest((0.1, 0.2), &view).unwrap();
        assert_ne!(got, 0);
        assert!(view.contains(got));
    }

    #[test]
    fn test_nearest_empty_view() {
        let net = grid_network();
        let locator = NodeLocator::build(&net);
        let mut view = GraphView::full(&net);
        for n in net.node_indices() {
            view.remove(n);
        }
        assert_eq!(locator.nearest((0.5, 0.5), &view), None);
        assert_eq!(NodeLocator::nearest_scan(&net, (0.5, 0.5), &view), None);
    }

    #[test]
    fn test_tie_breaks_to_lowest_id() {
        // The grid centre is equidistant from all four nodes.
        let net = grid_network();
        let locator = NodeLocator::build(&net);
        let view = GraphView::full(&net);
        assert_eq!(locator.nearest((0.5, 0.5), &view), Some(0));
        assert_eq!(NodeLocator::nearest_scan(&net, (0.5, 0.5), &view), Some(0));

        let mut partial = GraphView::full(&net);
        partial.remove(0);
        assert_eq!(locator.nearest((0.5, 0.5), &partial), Some(1));
        assert_eq!(
            NodeLocator::nearest_scan(&net, (0.5, 0.5), &partial),
            Some(1)
        );
    }

    #[test]
    fn test_index_agrees_with_scan() {
        let net = grid_network();
        let locator = NodeLocator::build(&net);
        let view = GraphView::full(&net);
        for &p in &[(0.2, 0.1), (1.4, -0.3), (0.6, 0.8), (-2.0, 5.0)] {
            assert_eq!(
                locator.nearest(p, &view),
                NodeLocator::nearest_scan(&net, p, &view),
                "disagreement at {p:?}"
            );
        }
    }
}
