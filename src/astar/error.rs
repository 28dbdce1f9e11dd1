// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::PointId;

/// Recommended number of allowed node expansions in [find_route](crate::find_route)
/// before [AStarError::StepLimitExceeded] is returned.
pub const DEFAULT_STEP_LIMIT: usize = 1_000_000;

/// Error conditions which may occur during [find_route](crate::find_route).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AStarError {
    /// The start or end nodes don't exist in a graph.
    #[error("unknown node: {0}")]
    UnknownNode(PointId),

    /// All nodes reachable from the start were expanded without reaching the end.
    /// This is an expected outcome when the two nodes lie in disconnected parts of the graph.
    #[error("no path found")]
    NoPathFound,

    /// Route search has exceeded its limit of steps.
    /// Either the nodes are really far apart, or no route exists.
    ///
    /// Concluding that no route exists requires traversing the whole connected
    /// component of the start node, which can result in a denial-of-service.
    /// The step limit protects against resource exhaustion.
    #[error("step limit exceeded")]
    StepLimitExceeded,
}
