//! Error types for the routing service.
//!
//! Library-level code uses typed errors; the CLI and HTTP boundary wrap them
//! with `anyhow` context. "No path" and "no nearby node" are not errors
//! anywhere in this crate; they are ordinary `path_found = false` responses.

use std::path::PathBuf;
use thiserror::Error;

/// Failures while loading the precomputed network artifact.
///
/// All of these are fatal at startup: the process must not serve requests on
/// a missing or partially valid graph.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("failed to read artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode artifact {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: bincode::Error,
    },

    #[error("failed to write artifact {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: bincode::Error,
    },

    #[error("node count mismatch: {ids} ids but {coords} coordinates")]
    NodeCountMismatch { ids: usize, coords: usize },

    #[error("arc {arc} references missing node {node}")]
    DanglingArc { arc: usize, node: u32 },

    #[error("arc {arc} has invalid weight {weight} (must be finite and >= 0)")]
    BadWeight { arc: usize, weight: f64 },
}

/// Failures establishing the geographic <-> metric CRS pair.
///
/// The pair is fixed once at startup from the artifact header; a bad code is
/// a fatal configuration error, never a per-request failure.
#[derive(Debug, Error)]
pub enum ProjError {
    #[error("unsupported CRS EPSG:{0}: expected a UTM zone (32601-32660 north, 32701-32760 south)")]
    UnsupportedCrs(u32),
}

/// Request-scoped failures surfaced by the orchestrator.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Structurally invalid request, rejected before any graph work.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Unexpected internal fault. Logged with context at the boundary and
    /// surfaced to the client as a generic server error.
    #[error("internal error: {0}")]
    Internal(String),
}
