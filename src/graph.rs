// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::{earth_distance, Coordinate, Edge, Point, PointId};
use std::collections::btree_map::{BTreeMap, Entry};

/// Error returned when snapping a position onto a graph is impossible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LocateError {
    /// There are no points to choose from.
    #[error("no points to snap to")]
    EmptyIndex,
}

/// Objects which can find the [Point] closest to an arbitrary position.
pub trait NearestNode {
    fn find_nearest_node(&self, at: Coordinate) -> Result<Point, LocateError>;
}

/// Represents a road network as a set of [Points](Point)
/// and undirected [Edges](Edge) between them.
///
/// Every point is stored together with its outgoing edges, so every node of
/// the graph always has a coordinate. Graphs are read-only outside of this crate;
/// use [osm](crate::osm) readers or [snapshots](crate::snapshot) to create them.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Graph(BTreeMap<PointId, (Point, Vec<Edge>)>);

impl Graph {
    /// Returns the number of nodes in the graph.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns an iterator over all [Points](Point) in the graph, in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Point> {
        self.0.values().map(|(point, _)| point)
    }

    /// Returns the total number of (directed) edges in the graph.
    /// Every road segment is counted twice, once in every direction.
    pub fn edge_count(&self) -> usize {
        self.0.values().map(|(_, edges)| edges.len()).sum()
    }

    /// Retrieves a [Point] with the provided id.
    pub fn get_node(&self, id: PointId) -> Option<Point> {
        self.0.get(&id).map(|&(point, _)| point)
    }

    /// Retrieves the position of a point with the provided id.
    pub fn coordinate(&self, id: PointId) -> Option<Coordinate> {
        self.0.get(&id).map(|(point, _)| point.coordinate())
    }

    /// Returns true if a point with the provided id exists in the graph.
    pub fn contains(&self, id: PointId) -> bool {
        self.0.contains_key(&id)
    }

    /// Gets all [Edges](Edge) from a node with a given id.
    ///
    /// Duplicate edges (the same road segment used by multiple ways) are preserved.
    pub fn get_edges(&self, from_id: PointId) -> &[Edge] {
        self.0
            .get(&from_id)
            .map(|(_, e)| e.as_slice())
            .unwrap_or_default()
    }

    /// Gets the cost of the cheapest [Edge] from one node to another.
    /// If such an edge doesn't exist, returns [f64::INFINITY].
    pub fn get_edge(&self, from_id: PointId, to_id: PointId) -> f64 {
        self.get_edges(from_id)
            .iter()
            .filter(|edge| edge.to == to_id)
            .map(|edge| edge.cost)
            .fold(f64::INFINITY, f64::min)
    }

    /// Finds the closest [Point] to the given position.
    ///
    /// This function requires computing the distance to every [Point] in the graph,
    /// and is not suitable for large graphs - see [KDTree](crate::KDTree).
    /// Ties are resolved in favor of the point with the smallest id.
    pub fn find_nearest_node(&self, at: Coordinate) -> Result<Point, LocateError> {
        let mut best: Option<(f64, Point)> = None;
        for point in self.iter() {
            let dist = earth_distance(at, point.coordinate());
            if best.map_or(true, |(best_dist, _)| dist < best_dist) {
                best = Some((dist, *point));
            }
        }
        best.map(|(_, point)| point).ok_or(LocateError::EmptyIndex)
    }

    /// Creates a [Point] with `point.id`, without any edges.
    /// If the point already exists, only its position is updated.
    pub(crate) fn set_node(&mut self, point: Point) {
        match self.0.entry(point.id) {
            Entry::Vacant(e) => {
                e.insert((point, Vec::default()));
            }
            Entry::Occupied(mut e) => {
                debug_assert!(e.get().1.is_empty(), "moving a connected point");
                e.get_mut().0 = point;
            }
        }
    }

    /// Appends an [Edge] from a node with a given id.
    /// Does nothing if `from_id` does not exist.
    pub(crate) fn push_edge(&mut self, from_id: PointId, edge: Edge) {
        if let Some((_, edges)) = self.0.get_mut(&from_id) {
            edges.push(edge);
        }
    }

    /// Connects two existing points with a pair of edges with
    /// cost equal to the distance between them. Returns the cost, or `None`
    /// if any of the points doesn't exist.
    pub(crate) fn connect(&mut self, a: PointId, b: PointId) -> Option<f64> {
        let cost = earth_distance(self.coordinate(a)?, self.coordinate(b)?);
        self.push_edge(a, Edge { to: b, cost });
        self.push_edge(b, Edge { to: a, cost });
        Some(cost)
    }
}

impl NearestNode for Graph {
    fn find_nearest_node(&self, at: Coordinate) -> Result<Point, LocateError> {
        Graph::find_nearest_node(self, at)
    }
}
