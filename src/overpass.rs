// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Generation of [Overpass QL](https://wiki.openstreetmap.org/wiki/Overpass_API/Overpass_QL)
//! queries requesting the road network of an area, in a form directly consumable
//! by [osm::graph_from_io](crate::osm::graph_from_io).

use std::fmt;

/// Area around Kathmandu and Bhaktapur, used when no bounding box is given.
pub const DEFAULT_BBOX: [f64; 4] = [85.1, 27.6, 85.5, 27.9];

/// Overpass query for all ways carrying a specific tag within a bounding box,
/// together with all nodes they reference.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// Area to query. In order: left (min lon), bottom (min lat), right (max lon), top (max lat),
    /// same as [osm::Options::bbox](crate::osm::Options::bbox).
    pub bbox: [f64; 4],

    /// Tag key which ways must have, e.g. "highway".
    pub way_filter: String,
}

impl Default for Query {
    fn default() -> Self {
        Self {
            bbox: DEFAULT_BBOX,
            way_filter: "highway".to_string(),
        }
    }
}

impl Query {
    pub fn new(bbox: [f64; 4]) -> Self {
        Self {
            bbox,
            ..Default::default()
        }
    }

    /// Renders the query as Overpass QL text.
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [left, bottom, right, top] = self.bbox;

        f.write_str("[out:json];(way[\"")?;
        for c in self.way_filter.chars() {
            if c == '"' || c == '\\' {
                f.write_str("\\")?;
            }
            write!(f, "{}", c)?;
        }
        // Overpass expects (south,west,north,east)
        write!(
            f,
            "\"]({},{},{},{}););out body;>;out skel qt;",
            bottom, left, top, right
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_default() {
        assert_eq!(
            Query::default().render(),
            "[out:json];(way[\"highway\"](27.6,85.1,27.9,85.5););out body;>;out skel qt;"
        );
    }

    #[test]
    fn render_custom() {
        let q = Query {
            bbox: [20.95, 52.2, 21.05, 52.25],
            way_filter: "railway".to_string(),
        };
        assert_eq!(
            q.render(),
            "[out:json];(way[\"railway\"](52.2,20.95,52.25,21.05););out body;>;out skel qt;"
        );
    }

    #[test]
    fn render_escapes_filter() {
        let q = Query {
            bbox: [0.0, -1.5, 1.0, 0.5],
            way_filter: "a\"b".to_string(),
        };
        assert_eq!(
            q.render(),
            "[out:json];(way[\"a\\\"b\"](-1.5,0,0.5,1););out body;>;out skel qt;"
        );
    }
}
