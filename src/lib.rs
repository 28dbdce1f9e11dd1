// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Simple routing over [OpenStreetMap](https://www.openstreetmap.org/) data
//! fetched from the [Overpass API](https://wiki.openstreetmap.org/wiki/Overpass_API).
//!
//! Raw points and ways are converted into an undirected graph weighted by
//! great-circle distance, query positions are snapped onto the nearest graph node,
//! and A* finds the shortest path between them. Built graphs can be dumped into
//! [snapshots](crate::snapshot) and reloaded without re-reading the raw data.
//!
//! # Example
//!
//! ```no_run
//! let osm_options = overroute::osm::Options {
//!     file_format: overroute::osm::FileFormat::Unknown,
//!     bbox: [0.0; 4],
//! };
//! let g = overroute::osm::graph_from_file(&osm_options, "path/to/interpreter.json")
//!     .expect("failed to load interpreter.json");
//!
//! let route = overroute::plan_route(
//!     &g,
//!     &g,
//!     overroute::Coordinate::new(27.6710, 85.4298),
//!     overroute::Coordinate::new(27.6766, 85.4354),
//!     overroute::DEFAULT_STEP_LIMIT,
//! )
//! .expect("failed to find route");
//!
//! println!("Route: {:?} ({} m)", route.nodes, route.cost);
//! ```

mod astar;
mod distance;
mod graph;
mod kd;
pub mod osm;
pub mod overpass;
mod route;
pub mod snapshot;

pub use astar::{find_route, route_cost, AStarError, DEFAULT_STEP_LIMIT};
pub use distance::{earth_distance, EARTH_RADIUS};
pub use graph::{Graph, LocateError, NearestNode};
pub use kd::KDTree;
pub use route::{plan_route, Route, RouteError};

/// Identifier of a [Point], as used by OpenStreetMap.
///
/// Identifiers may be negative (locally created, not yet uploaded data),
/// but never zero - readers skip features with a zero id.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct PointId(pub i64);

impl std::fmt::Display for PointId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl From<i64> for PointId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// A position on Earth, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Returns true if both the latitude and longitude are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }
}

/// Represents an element of the [Graph] - a named position on Earth.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub id: PointId,
    pub lat: f64,
    pub lon: f64,
}

impl Point {
    pub const fn new(id: PointId, lat: f64, lon: f64) -> Self {
        Self { id, lat, lon }
    }

    #[inline]
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lon)
    }
}

/// Represents a connection from a specific [Point] to its neighbor.
///
/// Every edge has a twin in the opposite direction with the same `cost`,
/// which is the great-circle distance between the two points, in meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub to: PointId,
    pub cost: f64,
}
