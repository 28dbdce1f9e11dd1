// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Loading of raw OpenStreetMap data (Overpass JSON or OSM XML) into a [Graph](crate::Graph).

mod reader;

pub use reader::{
    build_graph, graph_from_buffer, graph_from_file, graph_from_io, Feature, FileFormat, Options,
    Way,
};

/// Error which can occur when loading raw OSM data.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("xml: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("unrecognized file format (expected Overpass JSON or OSM XML)")]
    UnknownFormat,
}
