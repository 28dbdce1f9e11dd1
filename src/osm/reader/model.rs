// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::{Point, PointId};
use std::collections::HashMap;

/// Represents an [OSM way](https://wiki.openstreetmap.org/wiki/Way) - a polyline
/// over [Points](Point). Every two consecutive nodes form a traversable segment.
///
/// Tags are not interpreted, only carried over from the input.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Way {
    pub id: i64,
    pub nodes: Vec<PointId>,
    pub tags: HashMap<String, String>,
}

/// Union over all [OSM features/elements](https://wiki.openstreetmap.org/wiki/Elements)
/// relevant for routing. Other element types are skipped by the readers.
#[derive(Debug, Clone, PartialEq)]
pub enum Feature {
    Node(Point),
    Way(Way),
}
