// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::{Graph, Point, PointId};

use super::{model, Options};

/// Helper object used for storing state related to converting [OSM features](super::model::Feature)
/// into a [Graph].
///
/// Features may arrive in any order. Ways are buffered, and edges are only
/// created in [GraphBuilder::finish], once all points are known.
pub(super) struct GraphBuilder<'a> {
    g: Graph,
    options: &'a Options,
    ways: Vec<Vec<PointId>>,
    ignore_bbox: bool,
    skipped_points: usize,
}

impl<'a> GraphBuilder<'a> {
    /// Create a new, empty graph builder.
    pub(super) fn new(options: &'a Options) -> Self {
        let ignore_bbox =
            options.bbox.iter().all(|&x| x == 0.0) || options.bbox.iter().any(|x| !x.is_finite());
        if !ignore_bbox {
            log::debug!("restricting points to bbox {:?}", options.bbox);
        }

        Self {
            g: Graph::default(),
            options,
            ways: Vec::default(),
            ignore_bbox,
            skipped_points: 0,
        }
    }

    /// Add all features from the provided iterator.
    pub(super) fn add_features<I, E>(&mut self, features: I) -> Result<(), E>
    where
        I: IntoIterator<Item = Result<model::Feature, E>>,
    {
        for f in features {
            self.add_feature(f?);
        }
        Ok(())
    }

    pub(super) fn add_feature(&mut self, f: model::Feature) {
        match f {
            model::Feature::Node(n) => self.add_node(n),
            model::Feature::Way(w) => self.add_way(w),
        }
    }

    fn add_node(&mut self, n: Point) {
        // Non-finite positions can't produce meaningful edge costs
        if n.coordinate().is_finite() && self.is_in_bbox(&n) {
            self.g.set_node(n);
        } else {
            self.skipped_points += 1;
        }
    }

    fn is_in_bbox(&self, n: &Point) -> bool {
        if self.ignore_bbox {
            return true;
        }
        let [min_lon, min_lat, max_lon, max_lat] = self.options.bbox;
        n.lat >= min_lat && n.lat <= max_lat && n.lon >= min_lon && n.lon <= max_lon
    }

    fn add_way(&mut self, w: model::Way) {
        if w.nodes.len() < 2 {
            log::trace!("way {} has less than 2 nodes - skipping", w.id);
            return;
        }
        self.ways.push(w.nodes);
    }

    /// Connects consecutive nodes of all added ways and returns the built [Graph].
    ///
    /// Segments referencing points which were never added (or were outside of the
    /// bounding box) are dropped.
    pub(super) fn finish(mut self) -> Graph {
        let mut segments: usize = 0;
        let mut dropped: usize = 0;

        for nodes in &self.ways {
            for pair in nodes.windows(2) {
                segments += 1;
                if self.g.connect(pair[0], pair[1]).is_none() {
                    log::trace!("dropping segment {} - {}: unknown point", pair[0], pair[1]);
                    dropped += 1;
                }
            }
        }

        log::debug!(
            "built graph with {} nodes and {} edges from {} ways; \
             skipped {} points, dropped {} of {} segments",
            self.g.len(),
            self.g.edge_count(),
            self.ways.len(),
            self.skipped_points,
            dropped,
            segments,
        );

        self.ways.clear();
        self.g
    }
}
