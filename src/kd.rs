// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::{earth_distance, Coordinate, Graph, LocateError, NearestNode, Point};

/// KDTree implements the [k-d tree data structure](https://en.wikipedia.org/wiki/K-d_tree),
/// which can be used to speed up nearest-neighbor search for large datasets. Practice shows
/// that [Graph::find_nearest_node] takes significantly more time than
/// [crate::find_route] on metropolitan-sized graphs. A k-d tree
/// can help with that, trading memory usage for CPU time.
///
/// This implementation assumes euclidean geometry, even though the default distance function
/// used is [earth_distance]. This results in undefined behavior when points
/// are close to the ante meridian (180°/-180° longitude) or poles (90°/-90° latitude),
/// or when the data spans multiple continents.
#[derive(Debug, Clone)]
pub struct KDTree {
    pivot: Point,
    left: Option<Box<KDTree>>,
    right: Option<Box<KDTree>>,
}

impl KDTree {
    /// Finds the closest [Point] to the given position.
    pub fn find_nearest_node(&self, at: Coordinate) -> Point {
        self.find_nearest_node_impl(at, false).0
    }

    fn find_nearest_node_impl(&self, at: Coordinate, lon_divides: bool) -> (Point, f64) {
        // Start by assuming that pivot is the closest
        let mut best = self.pivot;
        let mut best_dist = earth_distance(at, best.coordinate());

        // Select which branch to recurse into first
        let first_left = if lon_divides {
            at.lon < best.lon
        } else {
            at.lat < best.lat
        };
        let (first, second) = if first_left {
            (&self.left, &self.right)
        } else {
            (&self.right, &self.left)
        };

        if let Some(ref branch) = first {
            let (alt, alt_dist) = branch.find_nearest_node_impl(at, !lon_divides);
            if alt_dist < best_dist {
                best = alt;
                best_dist = alt_dist;
            }
        }

        if let Some(ref branch) = second {
            // A closer point is possible in the second branch if and only if
            // the splitting axis is closer than the current best candidate.
            let axis = if lon_divides {
                Coordinate::new(at.lat, self.pivot.lon)
            } else {
                Coordinate::new(self.pivot.lat, at.lon)
            };

            if earth_distance(at, axis) < best_dist {
                let (alt, alt_dist) = branch.find_nearest_node_impl(at, !lon_divides);
                if alt_dist < best_dist {
                    best = alt;
                    best_dist = alt_dist;
                }
            }
        }

        (best, best_dist)
    }

    /// Builds a k-d tree over all points of a [Graph].
    pub fn from_graph(g: &Graph) -> Result<Self, LocateError> {
        Self::from_iter(g.iter().copied())
    }

    /// Builds a k-d tree from an iterable of [Points](Point).
    /// Points with non-finite coordinates are skipped.
    pub fn from_iter<I: IntoIterator<Item = Point>>(points: I) -> Result<Self, LocateError> {
        let mut points = points
            .into_iter()
            .filter(|p| p.coordinate().is_finite())
            .collect::<Vec<_>>();
        Self::build(points.as_mut_slice())
    }

    /// Builds a k-d tree from a mutable slice of [Points](Point). Points will be reordered
    /// in the slice to facilitate building the tree.
    ///
    /// All points must have finite coordinates.
    pub fn build(points: &mut [Point]) -> Result<Self, LocateError> {
        debug_assert!(points.iter().all(|p| p.coordinate().is_finite()));
        let tree = Self::build_impl(points, false).ok_or(LocateError::EmptyIndex)?;
        log::debug!("built k-d tree over {} points", points.len());
        Ok(tree)
    }

    fn build_impl(points: &mut [Point], lon_divides: bool) -> Option<Self> {
        match points.len() {
            0 => None,
            1 => Some(Self {
                pivot: points[0],
                left: None,
                right: None,
            }),
            _ => {
                if lon_divides {
                    points.sort_by(|a, b| a.lon.total_cmp(&b.lon));
                } else {
                    points.sort_by(|a, b| a.lat.total_cmp(&b.lat));
                }
                let median = points.len() / 2;
                let pivot = points[median];
                let (left, right_and_pivot) = points.split_at_mut(median);
                let right = &mut right_and_pivot[1..];
                Some(Self {
                    pivot,
                    left: Self::build_impl(left, !lon_divides).map(Box::new),
                    right: Self::build_impl(right, !lon_divides).map(Box::new),
                })
            }
        }
    }
}

impl NearestNode for KDTree {
    fn find_nearest_node(&self, at: Coordinate) -> Result<Point, LocateError> {
        Ok(KDTree::find_nearest_node(self, at))
    }
}
