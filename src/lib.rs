//! Constrained routing over a precomputed road network.
//!
//! The network is built offline and shipped as a single immutable artifact.
//! Each request derives a private working view by removing the nodes inside
//! caller-supplied exclusion polygons, then runs a shortest-path or
//! nearest-safe-zone search on that view. The base graph, its spatial
//! index, and the projection pair are shared read-only across requests.

pub mod engine;
pub mod error;
pub mod graph;
pub mod proj;
pub mod search;
pub mod server;
pub mod spatial;
pub mod view;
pub mod zones;

pub use engine::{PathQuery, RouteEngine, RouteOutcome, SafePathQuery};
pub use error::{ArtifactError, EngineError, ProjError};
pub use graph::{NodeId, RoadNetwork};
pub use proj::Projection;
pub use view::GraphView;
pub use zones::TargetPolicy;
