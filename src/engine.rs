//! Request orchestration.
//!
//! One engine instance owns the shared read-only request-path state: the
//! road network, its spatial index, and the projection pair derived from the
//! artifact header. Each request walks the same strict sequence
//! (reproject, prune, resolve, search, reproject back) and every step can
//! short-circuit into an ordinary "not found" outcome. The engine is also
//! the single place where internal faults become boundary errors; nothing
//! below it maps conditions to responses.

use crate::error::{ArtifactError, EngineError, ProjError};
use crate::graph::RoadNetwork;
use crate::proj::Projection;
use crate::search;
use crate::spatial::NodeLocator;
use crate::view::GraphView;
use crate::zones::{TargetPolicy, ZoneSet};

/// Mode A query: fixed destination, optional exclusion zones. Coordinates
/// are geographic (lon, lat); polygon rings are vertex lists in the same
/// order the API receives them.
#[derive(Clone, Debug)]
pub struct PathQuery {
    pub start: (f64, f64),
    pub end: (f64, f64),
    pub exclusions: Vec<Vec<(f64, f64)>>,
}

/// Mode B query: at least one target zone instead of a fixed destination.
#[derive(Clone, Debug)]
pub struct SafePathQuery {
    pub start: (f64, f64),
    pub safe_zones: Vec<Vec<(f64, f64)>>,
    pub exclusions: Vec<Vec<(f64, f64)>>,
    pub policy: TargetPolicy,
}

/// Fully computed outcome of a routing request. `NotFound` is a normal
/// response with a human-readable reason, never an error.
#[derive(Clone, Debug, PartialEq)]
pub enum RouteOutcome {
    Found {
        /// Path in geographic (lon, lat) coordinates.
        path: Vec<(f64, f64)>,
        cost: f64,
        message: String,
    },
    NotFound {
        message: String,
    },
}

/// Shared per-process routing state; cheap to reference from every request.
pub struct RouteEngine {
    graph: RoadNetwork,
    locator: NodeLocator,
    proj: Projection,
}

impl RouteEngine {
    /// Wrap a loaded network: build the spatial index and the projection
    /// pair recorded in the artifact header. A bad header is fatal.
    pub fn new(graph: RoadNetwork) -> Result<Self, ProjError> {
        let proj = Projection::new(graph.crs_epsg())?;
        let locator = NodeLocator::build(&graph);
        Ok(Self {
            graph,
            locator,
            proj,
        })
    }

    /// Load the artifact and wrap it. Startup path only.
    pub fn load<P: AsRef<std::path::Path>>(path: P) -> Result<Self, EngineLoadError> {
        let graph = RoadNetwork::load(path)?;
        Ok(Self::new(graph)?)
    }

    pub fn graph(&self) -> &RoadNetwork {
        &self.graph
    }

    /// Mode A: shortest path between two fixed points.
    pub fn find_path(&self, query: &PathQuery) -> Result<RouteOutcome, EngineError> {
        validate_point("start_point", query.start)?;
        validate_point("end_point", query.end)?;

        let start_m = self.proj.to_metric(query.start.0, query.start.1);
        let end_m = self.proj.to_metric(query.end.0, query.end.1);

        let zones = ZoneSet::from_rings(&query.exclusions, &[], &self.proj);
        let view = zones.exclusion_view(&self.graph);

        let Some(start_node) = self.locator.nearest(start_m, &view) else {
            return Ok(no_node_outcome());
        };
        let Some(end_node) = self.locator.nearest(end_m, &view) else {
            return Ok(no_node_outcome());
        };

        if start_node == end_node {
            let coord = self.graph.coord(start_node);
            return Ok(RouteOutcome::Found {
                path: vec![self.proj.to_geo(coord.0, coord.1)],
                cost: 0.0,
                message: "start and end resolve to the same road node".into(),
            });
        }

        match search::shortest_path(&view, start_node, end_node) {
            Some(route) => {
                tracing::debug!(
                    nodes = route.nodes.len(),
                    cost = route.cost,
                    "path computed"
                );
                Ok(self.found(route, "shortest path computed"))
            }
            None => Ok(RouteOutcome::NotFound {
                message: "no path between the selected points in the accessible area".into(),
            }),
        }
    }

    /// Mode B: nearest reachable target zone.
    pub fn find_safe_path(&self, query: &SafePathQuery) -> Result<RouteOutcome, EngineError> {
        if query.safe_zones.is_empty() {
            return Err(EngineError::InvalidRequest(
                "at least one safe zone is required".into(),
            ));
        }
        validate_point("start_point", query.start)?;

        let start_m = self.proj.to_metric(query.start.0, query.start.1);

        let zones = ZoneSet::from_rings(&query.exclusions, &query.safe_zones, &self.proj);
        let view = zones.exclusion_view(&self.graph);

        let Some(start_node) = self.locator.nearest(start_m, &view) else {
            return Ok(no_node_outcome());
        };

        let candidates = zones.target_candidates(&view, &self.locator, query.policy);
        if candidates.is_empty() {
            return Ok(RouteOutcome::NotFound {
                message: "no safe zone resolves to a usable road node".into(),
            });
        }

        match search::nearest_target(&view, start_node, &candidates) {
            Some(found) => {
                tracing::debug!(
                    target = found.node,
                    cost = found.route.cost,
                    candidates = candidates.len(),
                    "nearest safe zone selected"
                );
                Ok(self.found(found.route, "path to nearest safe zone computed"))
            }
            None => Ok(RouteOutcome::NotFound {
                message: "no safe zone is reachable from the start point".into(),
            }),
        }
    }

    /// Reproject a metric route back to geographic coordinates.
    fn found(&self, route: search::Route, message: &str) -> RouteOutcome {
        let path = route
            .nodes
            .iter()
            .map(|&node| {
                let (x, y) = self.graph.coord(node);
                self.proj.to_geo(x, y)
            })
            .collect();
        RouteOutcome::Found {
            path,
            cost: route.cost,
            message: message.into(),
        }
    }

    /// Per-request working view for the given exclusion rings. Exposed for
    /// tooling and tests; request handling goes through `find_*`.
    pub fn exclusion_view(&self, exclusions: &[Vec<(f64, f64)>]) -> GraphView<'_> {
        ZoneSet::from_rings(exclusions, &[], &self.proj).exclusion_view(&self.graph)
    }
}

/// Startup-only load failure: artifact or CRS configuration.
#[derive(Debug, thiserror::Error)]
pub enum EngineLoadError {
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    #[error(transparent)]
    Proj(#[from] ProjError),
}

fn validate_point(field: &str, (lon, lat): (f64, f64)) -> Result<(), EngineError> {
    if !lon.is_finite() || !lat.is_finite() || lat.abs() > 90.0 || lon.abs() > 180.0 {
        return Err(EngineError::InvalidRequest(format!(
            "{field} is not a usable lon/lat coordinate"
        )));
    }
    Ok(())
}

fn no_node_outcome() -> RouteOutcome {
    RouteOutcome::NotFound {
        message: "no routable node near the requested points in the accessible area".into(),
    }
}
