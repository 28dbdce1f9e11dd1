// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Reader for the [Overpass JSON](https://wiki.openstreetmap.org/wiki/OSM_JSON) format,
//! as returned by `[out:json]` queries.

use std::collections::HashMap;
use std::io;

use serde::Deserialize;

use super::model;
use crate::{Point, PointId};

#[derive(Debug, Deserialize)]
struct Document {
    elements: Vec<Element>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum Element {
    Node {
        id: i64,
        lat: Option<f64>,
        lon: Option<f64>,
    },
    Way {
        id: i64,
        #[serde(default)]
        nodes: Vec<i64>,
        #[serde(default)]
        tags: HashMap<String, String>,
    },
    #[serde(other)]
    Other,
}

/// Reader yields osm [Features](model::Feature) from a parsed Overpass JSON document.
///
/// The whole document is parsed upfront; Overpass places ways before nodes
/// (`out body; >; out skel qt;`), so there is little to gain from streaming.
pub(super) struct Reader {
    elements: std::vec::IntoIter<Element>,
}

impl Reader {
    pub(super) fn from_io<R: io::Read>(reader: R) -> Result<Self, serde_json::Error> {
        let doc: Document = serde_json::from_reader(reader)?;
        Ok(Self::new(doc))
    }

    pub(super) fn from_buffer(data: &[u8]) -> Result<Self, serde_json::Error> {
        let doc: Document = serde_json::from_slice(data)?;
        Ok(Self::new(doc))
    }

    fn new(doc: Document) -> Self {
        Self {
            elements: doc.elements.into_iter(),
        }
    }
}

impl Iterator for Reader {
    type Item = model::Feature;

    fn next(&mut self) -> Option<Self::Item> {
        for element in self.elements.by_ref() {
            if let Some(f) = convert(element) {
                return Some(f);
            }
        }
        None
    }
}

fn convert(element: Element) -> Option<model::Feature> {
    match element {
        Element::Node { id, lat, lon } => match (lat, lon) {
            (Some(lat), Some(lon)) if id != 0 && lat.is_finite() && lon.is_finite() => {
                Some(model::Feature::Node(Point::new(PointId(id), lat, lon)))
            }
            _ => {
                log::trace!("skipping node {id} without a valid position");
                None
            }
        },

        Element::Way { id, nodes, tags } if id != 0 => Some(model::Feature::Way(model::Way {
            id,
            nodes: nodes.into_iter().map(PointId).collect(),
            tags,
        })),

        Element::Way { .. } | Element::Other => None,
    }
}
