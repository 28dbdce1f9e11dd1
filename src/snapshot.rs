// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Snapshots store a built [Graph] as a JSON document, so that raw OSM data
//! only needs to be processed once.
//!
//! The document has two top-level fields:
//! - `graph`: mapping from point id to a list of `{"node": id, "dist": meters}` edges,
//! - `coordinateIndex`: mapping from point id to `{"lat": degrees, "lon": degrees}`.
//!
//! `nodeMap` is accepted as an alias of `coordinateIndex` when loading.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{earth_distance, Coordinate, Edge, Graph, Point, PointId};

/// Error which can occur when reading or writing a snapshot.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] io::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    /// A node of the graph has no entry in the coordinate index.
    #[error("node {0} has no coordinates")]
    MissingCoordinate(PointId),

    /// An edge points to a node which does not exist.
    #[error("edge {from} -> {to} points to an unknown node")]
    UnknownEdgeTarget { from: PointId, to: PointId },

    /// An edge has a negative or non-finite cost.
    #[error("edge {from} -> {to} has an invalid cost: {cost}")]
    InvalidCost { from: PointId, to: PointId, cost: f64 },

    /// An edge cost differs from the great-circle distance between its endpoints.
    #[error("edge {from} -> {to} costs {cost}, but its endpoints are {expected} m apart")]
    CostMismatch {
        from: PointId,
        to: PointId,
        cost: f64,
        expected: f64,
    },

    /// An edge has no counterpart with the same cost in the opposite direction.
    #[error("edge {from} -> {to} has no reverse edge")]
    MissingReverseEdge { from: PointId, to: PointId },
}

/// Relative tolerance used when comparing edge costs against point distances.
const COST_TOLERANCE: f64 = 1e-9;

fn costs_match(a: f64, b: f64) -> bool {
    (a - b).abs() <= COST_TOLERANCE * a.abs().max(b.abs()).max(1.0)
}

/// Encoding of the snapshot file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SnapshotFormat {
    /// Plain JSON.
    #[default]
    Json,

    /// JSON with [gzip](https://en.wikipedia.org/wiki/Gzip) compression.
    JsonGz,
}

impl SnapshotFormat {
    /// Guesses the format from a file name - `.gz` files are assumed to be gzip-compressed.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        match path.as_ref().extension() {
            Some(ext) if ext.eq_ignore_ascii_case("gz") => Self::JsonGz,
            _ => Self::Json,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct EdgeRecord {
    node: PointId,
    dist: f64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Document {
    graph: BTreeMap<PointId, Vec<EdgeRecord>>,

    #[serde(alias = "nodeMap")]
    coordinate_index: BTreeMap<PointId, Coordinate>,
}

impl Document {
    fn from_graph(g: &Graph) -> Self {
        let graph = g
            .iter()
            .map(|point| {
                let edges = g
                    .get_edges(point.id)
                    .iter()
                    .map(|e| EdgeRecord {
                        node: e.to,
                        dist: e.cost,
                    })
                    .collect();
                (point.id, edges)
            })
            .collect();

        let coordinate_index = g.iter().map(|p| (p.id, p.coordinate())).collect();

        Self {
            graph,
            coordinate_index,
        }
    }

    fn into_graph(self) -> Result<Graph, Error> {
        let mut g = Graph::default();

        // Points without an adjacency list are isolated nodes
        for (id, c) in self.coordinate_index {
            g.set_node(Point::new(id, c.lat, c.lon));
        }

        for (from, edges) in self.graph {
            let from_c = g.coordinate(from).ok_or(Error::MissingCoordinate(from))?;

            for EdgeRecord { node: to, dist } in edges {
                let to_c = g
                    .coordinate(to)
                    .ok_or(Error::UnknownEdgeTarget { from, to })?;
                if !dist.is_finite() || dist < 0.0 {
                    return Err(Error::InvalidCost {
                        from,
                        to,
                        cost: dist,
                    });
                }

                // Cheaper edges would make the A* heuristic overestimate
                let expected = earth_distance(from_c, to_c);
                if !costs_match(dist, expected) {
                    return Err(Error::CostMismatch {
                        from,
                        to,
                        cost: dist,
                        expected,
                    });
                }

                g.push_edge(from, Edge { to, cost: dist });
            }
        }

        for point in g.iter() {
            for edge in g.get_edges(point.id) {
                let has_reverse = g
                    .get_edges(edge.to)
                    .iter()
                    .any(|back| back.to == point.id && costs_match(back.cost, edge.cost));
                if !has_reverse {
                    return Err(Error::MissingReverseEdge {
                        from: point.id,
                        to: edge.to,
                    });
                }
            }
        }

        Ok(g)
    }
}

/// Writes a [Graph] snapshot into the provided writer.
pub fn dump<W: Write>(g: &Graph, format: SnapshotFormat, writer: W) -> Result<(), Error> {
    let doc = Document::from_graph(g);
    match format {
        SnapshotFormat::Json => {
            let mut w = BufWriter::new(writer);
            serde_json::to_writer(&mut w, &doc)?;
            w.flush()?;
        }

        SnapshotFormat::JsonGz => {
            let mut e = flate2::write::GzEncoder::new(writer, flate2::Compression::default());
            serde_json::to_writer(&mut e, &doc)?;
            e.finish()?;
        }
    }
    Ok(())
}

/// Reads a [Graph] snapshot from the provided reader.
///
/// Every node referenced by the `graph` field must have an entry in the coordinate index.
/// Every edge must cost the great-circle distance between its endpoints and must have
/// a twin in the opposite direction. Coordinate index entries without adjacency lists
/// become isolated nodes.
pub fn load<R: io::Read>(format: SnapshotFormat, reader: R) -> Result<Graph, Error> {
    let doc: Document = match format {
        SnapshotFormat::Json => serde_json::from_reader(io::BufReader::new(reader))?,
        SnapshotFormat::JsonGz => {
            let d = flate2::read::MultiGzDecoder::new(reader);
            serde_json::from_reader(io::BufReader::new(d))?
        }
    };
    doc.into_graph()
}

/// Writes a [Graph] snapshot to a file, with the format guessed by [SnapshotFormat::from_path].
pub fn dump_to_file<P: AsRef<Path>>(g: &Graph, path: P) -> Result<(), Error> {
    let path = path.as_ref();
    log::info!(
        "writing snapshot of {} nodes to {}",
        g.len(),
        path.display()
    );
    let f = File::create(path)?;
    dump(g, SnapshotFormat::from_path(path), f)
}

/// Reads a [Graph] snapshot from a file, with the format guessed by [SnapshotFormat::from_path].
pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Graph, Error> {
    let path = path.as_ref();
    log::info!("loading snapshot {}", path.display());
    let f = File::open(path)?;
    let g = load(SnapshotFormat::from_path(path), f)?;
    log::debug!("loaded {} nodes and {} edges", g.len(), g.edge_count());
    Ok(g)
}
