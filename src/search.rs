//! Shortest-path search over a working view.
//!
//! Plain single-source Dijkstra on non-negative weights: a binary heap of
//! `(cost, node)` with stale-entry skipping, dense distance and parent
//! arrays indexed by node id. Weight non-negativity is enforced when the
//! artifact loads, so the search itself has no precondition checks.
//!
//! Three query shapes:
//! - `shortest_path`: full path with parent reconstruction;
//! - `shortest_path_cost`: settles the target and stops, no parents;
//! - `nearest_target`: cost-only probe per candidate (in parallel), then
//!   one full-path run for the winner only.
//!
//! Pop order is deterministic: equal costs break by ascending node id, so
//! identical requests produce identical paths on every run and platform.

use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::graph::NodeId;
use crate::view::GraphView;

/// A found path: visited nodes in order, and the summed arc cost.
#[derive(Clone, Debug, PartialEq)]
pub struct Route {
    pub nodes: Vec<NodeId>,
    pub cost: f64,
}

/// Winning candidate of a nearest-of-many-targets search.
#[derive(Clone, Debug)]
pub struct NearestTarget {
    pub node: NodeId,
    pub route: Route,
}

/// Heap entry ordered as a min-heap on cost, then ascending node id.
#[derive(Copy, Clone, Debug)]
struct QueueEntry {
    cost: f64,
    node: NodeId,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so the max-heap pops the cheapest entry; node id pins the
        // order between equal costs.
        other
            .cost
            .partial_cmp(&self.cost)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.node.cmp(&self.node))
    }
}

/// Shortest path from `source` to `target` in the view, or `None` when the
/// target is unreachable. That is an expected outcome, not an error.
///
/// `source == target` short-circuits to a single-node zero-cost route
/// without running the search.
pub fn shortest_path(view: &GraphView<'_>, source: NodeId, target: NodeId) -> Option<Route> {
    if !view.contains(source) || !view.contains(target) {
        return None;
    }
    if source == target {
        return Some(Route {
            nodes: vec![source],
            cost: 0.0,
        });
    }

    let n = view.graph().node_count();
    let mut dist = vec![f64::INFINITY; n];
    let mut parent = vec![u32::MAX; n];
    let mut heap = BinaryHeap::new();

    dist[source as usize] = 0.0;
    heap.push(QueueEntry {
        cost: 0.0,
        node: source,
    });

    while let Some(QueueEntry { cost, node }) = heap.pop() {
        if cost > dist[node as usize] {
            continue; // stale entry
        }
        if node == target {
            return Some(Route {
                nodes: reconstruct(&parent, source, target),
                cost,
            });
        }

        for (next, weight) in view.neighbors(node) {
            let next_cost = cost + weight;
            if next_cost < dist[next as usize] {
                dist[next as usize] = next_cost;
                parent[next as usize] = node;
                heap.push(QueueEntry {
                    cost: next_cost,
                    node: next,
                });
            }
        }
    }

    None
}

/// Cost of the shortest path only. Identical search to `shortest_path`
/// minus parent tracking and path materialization.
pub fn shortest_path_cost(view: &GraphView<'_>, source: NodeId, target: NodeId) -> Option<f64> {
    if !view.contains(source) || !view.contains(target) {
        return None;
    }
    if source == target {
        return Some(0.0);
    }

    let n = view.graph().node_count();
    let mut dist = vec![f64::INFINITY; n];
    let mut heap = BinaryHeap::new();

    dist[source as usize] = 0.0;
    heap.push(QueueEntry {
        cost: 0.0,
        node: source,
    });

    while let Some(QueueEntry { cost, node }) = heap.pop() {
        if cost > dist[node as usize] {
            continue;
        }
        if node == target {
            return Some(cost);
        }
        for (next, weight) in view.neighbors(node) {
            let next_cost = cost + weight;
            if next_cost < dist[next as usize] {
                dist[next as usize] = next_cost;
                heap.push(QueueEntry {
                    cost: next_cost,
                    node: next,
                });
            }
        }
    }

    None
}

/// Cheapest-to-reach candidate among `candidates`, or `None` when none is
/// reachable. Cost ties break by position in the candidate slice, so the
/// caller's candidate order is part of the contract.
///
/// The per-candidate probes are independent and read-only, so they run in
/// parallel; the selection below is sequential and order-stable, keeping
/// the result identical to a serial scan.
pub fn nearest_target(
    view: &GraphView<'_>,
    source: NodeId,
    candidates: &[NodeId],
) -> Option<NearestTarget> {
    let costs: Vec<Option<f64>> = candidates
        .par_iter()
        .map(|&candidate| shortest_path_cost(view, source, candidate))
        .collect();

    let mut best: Option<(usize, f64)> = None;
    for (i, cost) in costs.iter().enumerate() {
        if let Some(cost) = *cost {
            // Strictly-less keeps the earliest candidate among equal costs.
            if best.map_or(true, |(_, best_cost)| cost < best_cost) {
                best = Some((i, cost));
            }
        }
    }

    let (winner, _) = best?;
    let node = candidates[winner];
    // Only the winner's path is materialized.
    let route = shortest_path(view, source, node)?;
    Some(NearestTarget { node, route })
}

/// Walk parent pointers back from the target.
fn reconstruct(parent: &[u32], source: NodeId, target: NodeId) -> Vec<NodeId> {
    let mut nodes = vec![target];
    let mut current = target;
    while current != source {
        current = parent[current as usize];
        nodes.push(current);
    }
    nodes.reverse();
    nodes
}
