//! Immutable road network store.
//!
//! The network is produced offline and shipped as a single bincode blob:
//! external node ids, projected metric coordinates, and a directed arc list.
//! `load` rebuilds the arc list into CSR adjacency and validates every arc;
//! anything structurally wrong is fatal because every request depends on
//! this data. After load the store is shared as `Arc<RoadNetwork>` by all
//! concurrent requests, read-only and lock-free.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use crate::error::ArtifactError;

/// Dense internal node index. Arcs, views, and search state are all indexed
/// by this, never by the external id.
pub type NodeId = u32;

/// On-disk artifact layout. The arc list is directed; the offline builder
/// emits two arcs for a two-way road segment.
#[derive(Debug, Serialize, Deserialize)]
struct NetworkBlob {
    /// EPSG code of the projected CRS the coordinates are expressed in.
    /// The server derives its transform pair from this, so requests are
    /// guaranteed to use the exact inverse of the build-time projection.
    crs_epsg: u32,
    node_ids: Vec<i64>,
    coords: Vec<(f64, f64)>,
    arcs: Vec<(u32, u32, f64)>,
}

/// The full immutable network: node coordinate index plus CSR adjacency.
#[derive(Debug)]
pub struct RoadNetwork {
    crs_epsg: u32,
    node_ids: Vec<i64>,
    coords: Vec<(f64, f64)>,
    offsets: Vec<u32>,
    targets: Vec<u32>,
    weights: Vec<f64>,
}

impl RoadNetwork {
    /// Build a network from parts, validating arc endpoints and weights.
    ///
    /// This is the constructor both `load` and the offline builder go
    /// through, so a network that exists in memory has always passed the
    /// same checks as one read from disk.
    pub fn from_parts(
        crs_epsg: u32,
        nodes: Vec<(i64, (f64, f64))>,
        arcs: Vec<(u32, u32, f64)>,
    ) -> Result<Self, ArtifactError> {
        let n = nodes.len();
        let mut node_ids = Vec::with_capacity(n);
        let mut coords = Vec::with_capacity(n);
        for (id, coord) in nodes {
            node_ids.push(id);
            coords.push(coord);
        }

        for (i, &(from, to, weight)) in arcs.iter().enumerate() {
            if from as usize >= n {
                return Err(ArtifactError::DanglingArc { arc: i, node: from });
            }
            if to as usize >= n {
                return Err(ArtifactError::DanglingArc { arc: i, node: to });
            }
            if !weight.is_finite() || weight < 0.0 {
                return Err(ArtifactError::BadWeight { arc: i, weight });
            }
        }

        // Counting sort into CSR, preserving ascending target order per
        // source so traversal order is reproducible.
        let mut counts = vec![0u32; n + 1];
        for &(from, _, _) in &arcs {
            counts[from as usize + 1] += 1;
        }
        let mut offsets = counts;
        for i in 0..n {
            offsets[i + 1] += offsets[i];
        }

        let mut sorted: Vec<&(u32, u32, f64)> = arcs.iter().collect();
        sorted.sort_by_key(|&&(from, to, _)| (from, to));

        let mut targets = Vec::with_capacity(arcs.len());
        let mut weights = Vec::with_capacity(arcs.len());
        for &(_, to, weight) in sorted {
            targets.push(to);
            weights.push(weight);
        }

        Ok(Self {
            crs_epsg,
            node_ids,
            coords,
            offsets,
            targets,
            weights,
        })
    }

    /// Read and validate the artifact. Executed once at startup; any failure
    /// here means the process must not begin serving.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ArtifactError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let blob: NetworkBlob =
            bincode::deserialize_from(BufReader::new(file)).map_err(|source| {
                ArtifactError::Decode {
                    path: path.to_path_buf(),
                    source,
                }
            })?;

        if blob.node_ids.len() != blob.coords.len() {
            return Err(ArtifactError::NodeCountMismatch {
                ids: blob.node_ids.len(),
                coords: blob.coords.len(),
            });
        }

        let nodes = blob
            .node_ids
            .into_iter()
            .zip(blob.coords)
            .collect::<Vec<_>>();
        Self::from_parts(blob.crs_epsg, nodes, blob.arcs)
    }

    /// Serialize back into the artifact format (offline builder and tests).
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ArtifactError> {
        let path = path.as_ref();
        let blob = NetworkBlob {
            crs_epsg: self.crs_epsg,
            node_ids: self.node_ids.clone(),
            coords: self.coords.clone(),
            arcs: self.arc_list(),
        };
        let file = File::create(path).map_err(|source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        bincode::serialize_into(BufWriter::new(file), &blob).map_err(|source| {
            ArtifactError::Encode {
                path: path.to_path_buf(),
                source,
            }
        })
    }

    pub fn crs_epsg(&self) -> u32 {
        self.crs_epsg
    }

    pub fn node_count(&self) -> usize {
        self.node_ids.len()
    }

    pub fn arc_count(&self) -> usize {
        self.targets.len()
    }

    /// Metric coordinate of a node.
    pub fn coord(&self, node: NodeId) -> (f64, f64) {
        self.coords[node as usize]
    }

    /// External id the offline pipeline assigned to a node.
    pub fn external_id(&self, node: NodeId) -> i64 {
        self.node_ids[node as usize]
    }

    /// Internal node for an external id. Linear in the node count; only used
    /// by tooling and tests, never on the request path.
    pub fn node_by_external_id(&self, id: i64) -> Option<NodeId> {
        self.node_ids.iter().position(|&n| n == id).map(|i| i as u32)
    }

    /// All nodes in ascending id order, the fixed iteration order every
    /// deterministic tie-break in the crate is defined against.
    pub fn node_indices(&self) -> impl Iterator<Item = NodeId> + '_ {
        0..self.node_ids.len() as u32
    }

    /// Outgoing arcs of a node as `(target, weight)`.
    pub fn neighbors(&self, node: NodeId) -> impl Iterator<Item = (NodeId, f64)> + '_ {
        let start = self.offsets[node as usize] as usize;
        let end = self.offsets[node as usize + 1] as usize;
        self.targets[start..end]
            .iter()
            .copied()
            .zip(self.weights[start..end].iter().copied())
    }

    /// Rebuild the directed arc list from CSR (artifact serialization).
    fn arc_list(&self) -> Vec<(u32, u32, f64)> {
        let mut arcs = Vec::with_capacity(self.targets.len());
        for node in self.node_indices() {
            for (to, weight) in self.neighbors(node) {
                arcs.push((node, to, weight));
            }
        }
        arcs
    }
}

/// Convenience for tests and small builders: expand undirected edges on
/// external ids into the directed arc list `from_parts` expects.
pub fn undirected_arcs(
    nodes: &[(i64, (f64, f64))],
    edges: &[(i64, i64, f64)],
) -> Vec<(u32, u32, f64)> {
    let index: HashMap<i64, u32> = nodes
        .iter()
        .enumerate()
        .map(|(i, &(id, _))| (id, i as u32))
        .collect();
    let mut arcs = Vec::with_capacity(edges.len() * 2);
    for &(a, b, w) in edges {
        let (ia, ib) = (index[&a], index[&b]);
        arcs.push((ia, ib, w));
        arcs.push((ib, ia, w));
    }
    arcs
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn small_network() -> RoadNetwork {
        let nodes = vec![
            (100, (0.0, 0.0)),
            (200, (1.0, 0.0)),
            (300, (1.0, 1.0)),
        ];
        let arcs = undirected_arcs(&nodes, &[(100, 200, 1.0), (200, 300, 2.5)]);
        RoadNetwork::from_parts(32610, nodes, arcs).unwrap()
    }

    #[test]
    fn test_counts_and_lookup() {
        let net = small_network();
        assert_eq!(net.node_count(), 3);
        assert_eq!(net.arc_count(), 4);
        assert_eq!(net.coord(2), (1.0, 1.0));
        assert_eq!(net.external_id(1), 200);
        assert_eq!(net.node_by_external_id(300), Some(2));
        assert_eq!(net.node_by_external_id(999), None);
    }

    #[test]
    fn test_neighbors_sorted_by_target() {
        let nodes = vec![(1, (0.0, 0.0)), (2, (1.0, 0.0)), (3, (2.0, 0.0))];
        let arcs = vec![(0, 2, 5.0), (0, 1, 1.0)];
        let net = RoadNetwork::from_parts(32610, nodes, arcs).unwrap();
        let out: Vec<_> = net.neighbors(0).collect();
        assert_eq!(out, vec![(1, 1.0), (2, 5.0)]);
    }

    #[test]
    fn test_rejects_dangling_arc() {
        let nodes = vec![(1, (0.0, 0.0)), (2, (1.0, 0.0))];
        let err = RoadNetwork::from_parts(32610, nodes, vec![(0, 7, 1.0)]).unwrap_err();
        assert!(matches!(err, ArtifactError::DanglingArc { node: 7, .. }));
    }

    #[test]
    fn test_rejects_bad_weights() {
        let nodes = vec![(1, (0.0, 0.0)), (2, (1.0, 0.0))];
        for bad in [-1.0, f64::NAN, f64::INFINITY] {
            let err = RoadNetwork::from_parts(32610, nodes.clone(), vec![(0, 1, bad)])
                .unwrap_err();
            assert!(matches!(err, ArtifactError::BadWeight { .. }), "{bad}");
        }
    }

    #[test]
    fn test_save_load_round_trip() {
        let net = small_network();
        let tmp = NamedTempFile::new().unwrap();
        net.save(tmp.path()).unwrap();

        let loaded = RoadNetwork::load(tmp.path()).unwrap();
        assert_eq!(loaded.crs_epsg(), 32610);
        assert_eq!(loaded.node_count(), net.node_count());
        assert_eq!(loaded.arc_count(), net.arc_count());
        for node in net.node_indices() {
            assert_eq!(loaded.coord(node), net.coord(node));
            assert_eq!(
                loaded.neighbors(node).collect::<Vec<_>>(),
                net.neighbors(node).collect::<Vec<_>>()
            );
        }
    }

    #[test]
    fn test_load_rejects_garbage() {
        let tmp = NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), b"not a network artifact").unwrap();
        assert!(matches!(
            RoadNetwork::load(tmp.path()),
            Err(ArtifactError::Decode { .. })
        ));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            RoadNetwork::load("/nonexistent/road.net"),
            Err(ArtifactError::Io { .. })
        ));
    }
}
