// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use serde_json::json;

use crate::{
    find_route, route_cost, AStarError, Coordinate, Graph, LocateError, NearestNode, PointId,
};

/// Error conditions which may occur during [plan_route].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    #[error("snapping failed: {0}")]
    Locate(#[from] LocateError),

    #[error(transparent)]
    Search(#[from] AStarError),
}

/// Shortest path between two positions, as found by [plan_route].
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    /// Ids of the traversed points, from the start to the end.
    pub nodes: Vec<PointId>,

    /// Positions of the traversed points, in the same order as [Route::nodes].
    pub coordinates: Vec<Coordinate>,

    /// Total length of the route, in meters.
    pub cost: f64,
}

impl Route {
    /// Renders the route as a GeoJSON FeatureCollection with a single LineString feature.
    /// Positions follow the GeoJSON `[lon, lat]` order.
    pub fn to_geojson(&self) -> serde_json::Value {
        let coordinates: Vec<[f64; 2]> = self.coordinates.iter().map(|c| [c.lon, c.lat]).collect();
        json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": {
                    "cost": self.cost,
                    "nodes": self.nodes,
                },
                "geometry": {
                    "type": "LineString",
                    "coordinates": coordinates,
                },
            }],
        })
    }
}

/// Finds the shortest route between two arbitrary positions.
///
/// Both positions are snapped onto the nearest point of the graph with the provided
/// `locator` (usually the [Graph] itself or a [KDTree](crate::KDTree) built over it),
/// and [find_route] searches for the path between them.
pub fn plan_route<L: NearestNode + ?Sized>(
    g: &Graph,
    locator: &L,
    start: Coordinate,
    end: Coordinate,
    step_limit: usize,
) -> Result<Route, RouteError> {
    let start_node = locator.find_nearest_node(start)?;
    let end_node = locator.find_nearest_node(end)?;
    log::debug!(
        "snapped {:?} to {} and {:?} to {}",
        start,
        start_node.id,
        end,
        end_node.id
    );

    let nodes = find_route(g, start_node.id, end_node.id, step_limit)?;
    let coordinates = nodes
        .iter()
        .map(|&id| g.coordinate(id).ok_or(AStarError::UnknownNode(id)))
        .collect::<Result<Vec<_>, _>>()?;
    // find_route only walks existing edges
    let cost = route_cost(g, &nodes).ok_or(AStarError::NoPathFound)?;

    log::debug!("found route of {} nodes, {:.0} m", nodes.len(), cost);
    Ok(Route {
        nodes,
        coordinates,
        cost,
    })
}
