//! Polygonal zone constraints.
//!
//! Exclusion polygons prune the working view: a node whose coordinate lies
//! strictly inside any exclusion polygon is removed for the duration of the
//! request (boundary contact does not count). Target polygons, used by the
//! nearest-safe-zone mode, each resolve to candidate destination nodes under
//! one of two explicit policies.
//!
//! Rings that cannot form a polygon (fewer than three distinct vertices
//! after reprojection) are skipped with a diagnostic, never a failure,
//! matching the tolerance of the rest of the request path.

use geo::{Centroid, Contains, Coord, LineString, Point, Polygon};

use crate::graph::{NodeId, RoadNetwork};
use crate::proj::Projection;
use crate::spatial::NodeLocator;
use crate::view::GraphView;

/// How a target zone maps to candidate destination nodes.
///
/// The two policies are not equivalent and are never mixed: `Centroid`
/// bounds the downstream cost queries by the number of zones, `Containment`
/// by the number of interior nodes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TargetPolicy {
    /// One representative node per zone: the nearest view node to the zone's
    /// centroid, whether or not the centroid itself falls inside the zone.
    /// The representative is the best entry point to the zone.
    #[default]
    Centroid,
    /// Every view node strictly inside the zone is a candidate.
    Containment,
}

/// Validated, reprojected exclusion and target polygons for one request.
#[derive(Debug, Default)]
pub struct ZoneSet {
    exclusions: Vec<Polygon<f64>>,
    targets: Vec<Polygon<f64>>,
}

impl ZoneSet {
    /// Reproject and validate request rings (geographic lon/lat vertices).
    /// Invalid rings are dropped here; nothing downstream sees them.
    pub fn from_rings(
        exclusions: &[Vec<(f64, f64)>],
        targets: &[Vec<(f64, f64)>],
        proj: &Projection,
    ) -> Self {
        Self {
            exclusions: valid_polygons(exclusions, proj, "exclusion"),
            targets: valid_polygons(targets, proj, "target"),
        }
    }

    /// Test-only constructor taking polygons already in metric space,
    /// bypassing reprojection so exact boundary cases stay exact.
    #[cfg(test)]
    pub(crate) fn from_metric(exclusions: Vec<Polygon<f64>>, targets: Vec<Polygon<f64>>) -> Self {
        Self {
            exclusions,
            targets,
        }
    }

    pub fn exclusion_count(&self) -> usize {
        self.exclusions.len()
    }

    pub fn target_count(&self) -> usize {
        self.targets.len()
    }

    /// Build the working view: base graph minus every node strictly inside
    /// an exclusion polygon. With no polygons the view is returned untouched
    /// and is behaviorally identical to the base graph.
    pub fn exclusion_view<'g>(&self, graph: &'g RoadNetwork) -> GraphView<'g> {
        let mut view = GraphView::full(graph);
        if self.exclusions.is_empty() {
            return view;
        }

        for node in graph.node_indices() {
            let (x, y) = graph.coord(node);
            let point = Point::new(x, y);
            if self.exclusions.iter().any(|poly| poly.contains(&point)) {
                view.remove(node);
            }
        }

        tracing::debug!(
            polygons = self.exclusions.len(),
            removed = view.removed_count(),
            "applied exclusion zones"
        );
        view
    }

    /// Candidate destination nodes for the target zones, in a fixed order:
    /// zone order under `Centroid`, ascending node id under `Containment`.
    /// Zones that resolve to nothing are skipped with a diagnostic.
    pub fn target_candidates(
        &self,
        view: &GraphView<'_>,
        locator: &NodeLocator,
        policy: TargetPolicy,
    ) -> Vec<NodeId> {
        let mut candidates = Vec::new();
        match policy {
            TargetPolicy::Centroid => {
                for (i, poly) in self.targets.iter().enumerate() {
                    let Some(centroid) = poly.centroid() else {
                        tracing::warn!(zone = i, "target zone has no centroid, skipping");
                        continue;
                    };
                    match locator.nearest((centroid.x(), centroid.y()), view) {
                        Some(node) if !candidates.contains(&node) => candidates.push(node),
                        Some(_) => {} // another zone already nominated this node
                        None => {
                            tracing::warn!(zone = i, "no reachable node near target zone");
                        }
                    }
                }
            }
            TargetPolicy::Containment => {
                let graph = view.graph();
                for node in graph.node_indices() {
                    if !view.contains(node) {
                        continue;
                    }
                    let (x, y) = graph.coord(node);
                    let point = Point::new(x, y);
                    if self.targets.iter().any(|poly| poly.contains(&point)) {
                        candidates.push(node);
                    }
                }
            }
        }
        candidates
    }
}

/// Reproject rings and keep only the ones that still form a polygon.
fn valid_polygons(rings: &[Vec<(f64, f64)>], proj: &Projection, kind: &str) -> Vec<Polygon<f64>> {
    let mut polygons = Vec::with_capacity(rings.len());
    for (i, ring) in rings.iter().enumerate() {
        let mut coords: Vec<Coord<f64>> = ring
            .iter()
            .map(|&(lon, lat)| {
                let (x, y) = proj.to_metric(lon, lat);
                Coord { x, y }
            })
            .collect();

        // Callers may close the ring explicitly; Polygon::new closes it
        // again, so strip the duplicate before counting vertices.
        if coords.len() > 1 && coords.first() == coords.last() {
            coords.pop();
        }

        if coords.len() < 3 {
            tracing::warn!(
                kind,
                ring = i,
                vertices = coords.len(),
                "skipping degenerate polygon"
            );
            continue;
        }

        polygons.push(Polygon::new(LineString::new(coords), Vec::new()));
    }
    polygons
}
