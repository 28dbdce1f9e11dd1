// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::fs::File;
use std::io::{self, BufRead};
use std::path::Path;

use graph_builder::GraphBuilder;

use super::Error;
use crate::{Graph, Point};

mod graph_builder;
mod json;
mod model;
mod xml;

pub use model::{Feature, Way};

/// Format of the input OSM file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileFormat {
    /// Unknown format - guess the format based on the content
    #[default]
    Unknown,

    /// Force uncompressed [Overpass JSON](https://wiki.openstreetmap.org/wiki/OSM_JSON)
    Json,

    /// Force [Overpass JSON](https://wiki.openstreetmap.org/wiki/OSM_JSON)
    /// with [gzip](https://en.wikipedia.org/wiki/Gzip) compression
    JsonGz,

    /// Force [Overpass JSON](https://wiki.openstreetmap.org/wiki/OSM_JSON)
    /// with [bzip2](https://en.wikipedia.org/wiki/Bzip2) compression
    JsonBz2,

    /// Force uncompressed [OSM XML](https://wiki.openstreetmap.org/wiki/OSM_XML)
    Xml,

    /// Force [OSM XML](https://wiki.openstreetmap.org/wiki/OSM_XML)
    /// with [gzip](https://en.wikipedia.org/wiki/Gzip) compression
    XmlGz,

    /// Force [OSM XML](https://wiki.openstreetmap.org/wiki/OSM_XML)
    /// with [bzip2](https://en.wikipedia.org/wiki/Bzip2) compression
    XmlBz2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Compression {
    None,
    Gzip,
    Bzip2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Syntax {
    Json,
    Xml,
}

impl FileFormat {
    fn compression(self) -> Option<Compression> {
        match self {
            Self::Unknown => None,
            Self::Json | Self::Xml => Some(Compression::None),
            Self::JsonGz | Self::XmlGz => Some(Compression::Gzip),
            Self::JsonBz2 | Self::XmlBz2 => Some(Compression::Bzip2),
        }
    }

    fn syntax(self) -> Option<Syntax> {
        match self {
            Self::Unknown => None,
            Self::Json | Self::JsonGz | Self::JsonBz2 => Some(Syntax::Json),
            Self::Xml | Self::XmlGz | Self::XmlBz2 => Some(Syntax::Xml),
        }
    }
}

/// Additional controls for interpreting OSM data as a routing [Graph].
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Format of the input data.
    pub file_format: FileFormat,

    /// Filter points by a specific bounding box. In order: left (min lon), bottom (min lat),
    /// right (max lon), top (max lat). Ignored if all values are set to zero, or at least one
    /// of them is not finite. Way segments touching points outside the box are dropped.
    pub bbox: [f64; 4],
}

/// Builds a [Graph] from already loaded points and ways.
///
/// Every point with a finite position becomes a node, even if no way references it.
/// Every two consecutive nodes of a way are connected in both directions, unless any
/// of them is missing from `points` - such segments are silently dropped.
pub fn build_graph<P, W>(points: P, ways: W) -> Graph
where
    P: IntoIterator<Item = Point>,
    W: IntoIterator<Item = Way>,
{
    let options = Options::default();
    let mut b = GraphBuilder::new(&options);
    points
        .into_iter()
        .for_each(|p| b.add_feature(Feature::Node(p)));
    ways.into_iter().for_each(|w| b.add_feature(Feature::Way(w)));
    b.finish()
}

/// Parse OSM features from a reader into a [Graph] as per the provided [Options].
///
/// The provided stream will be automatically wrapped in a buffered reader when needed.
pub fn graph_from_io<R: io::Read>(options: &Options, reader: R) -> Result<Graph, Error> {
    let mut b = io::BufReader::new(reader);
    let compression = match options.file_format.compression() {
        Some(c) => c,
        None => sniff_compression(b.fill_buf()?),
    };

    match compression {
        Compression::None => graph_from_decompressed(options, b),

        Compression::Gzip => {
            let d = flate2::read::MultiGzDecoder::new(b);
            graph_from_decompressed(options, io::BufReader::new(d))
        }

        Compression::Bzip2 => {
            let d = bzip2::read::MultiBzDecoder::new(b);
            graph_from_decompressed(options, io::BufReader::new(d))
        }
    }
}

/// Parse OSM features from a file at the provided path into a [Graph] as per the provided [Options].
pub fn graph_from_file<P: AsRef<Path>>(options: &Options, path: P) -> Result<Graph, Error> {
    let path = path.as_ref();
    log::info!("loading {}", path.display());
    let f = File::open(path)?;
    graph_from_io(options, f)
}

/// Parse OSM features from a static buffer into a [Graph] as per the provided [Options].
pub fn graph_from_buffer(options: &Options, data: &[u8]) -> Result<Graph, Error> {
    match options.file_format {
        // Fast paths are available for uncompressed in-memory data
        FileFormat::Json => {
            let mut b = GraphBuilder::new(options);
            json::Reader::from_buffer(data)?.for_each(|f| b.add_feature(f));
            Ok(b.finish())
        }

        FileFormat::Xml => {
            let mut b = GraphBuilder::new(options);
            b.add_features(xml::Reader::from_buffer(data))?;
            Ok(b.finish())
        }

        // Wrap the buffer in a cursor and use the IO path
        _ => graph_from_io(options, io::Cursor::new(data)),
    }
}

fn graph_from_decompressed<R: BufRead>(options: &Options, mut reader: R) -> Result<Graph, Error> {
    let syntax = match options.file_format.syntax() {
        Some(s) => s,
        None => sniff_syntax(&mut reader)?,
    };

    let mut b = GraphBuilder::new(options);
    match syntax {
        Syntax::Json => json::Reader::from_io(reader)?.for_each(|f| b.add_feature(f)),
        Syntax::Xml => b.add_features(xml::Reader::from_io(reader))?,
    }
    Ok(b.finish())
}

fn sniff_compression(head: &[u8]) -> Compression {
    if head.starts_with(&[0x1f, 0x8b]) {
        Compression::Gzip
    } else if head.starts_with(b"BZh") {
        Compression::Bzip2
    } else {
        Compression::None
    }
}

/// Guesses the syntax of a decompressed stream by its first non-whitespace byte.
/// Leading whitespace is consumed.
fn sniff_syntax<R: BufRead>(reader: &mut R) -> Result<Syntax, Error> {
    loop {
        let buf = reader.fill_buf()?;
        if buf.is_empty() {
            return Err(Error::UnknownFormat);
        }

        match buf.iter().position(|b| !b.is_ascii_whitespace()) {
            Some(idx) => {
                let first = buf[idx];
                reader.consume(idx);
                return match first {
                    b'{' => Ok(Syntax::Json),
                    b'<' => Ok(Syntax::Xml),
                    _ => Err(Error::UnknownFormat),
                };
            }
            None => {
                let len = buf.len();
                reader.consume(len);
            }
        }
    }
}

#[cfg(test)]
pub(super) mod test_data {
    use super::Way;
    use crate::{Point, PointId};
    use std::collections::HashMap;

    macro_rules! tags {
        {} => { HashMap::default() };
        {$( $k:literal : $v:literal ),+} => {
            HashMap::from_iter([ $( ($k.to_string(), $v.to_string()) ),+ ])
        };
    }

    //   -4 ── -3 ── -5 ╌╌ (-999)
    //    │     │
    //   -1 ── -2         -6        -7 ── -8
    pub(crate) fn expected_nodes() -> Vec<Point> {
        vec![
            Point::new(PointId(-1), 27.6700, 85.4200),
            Point::new(PointId(-2), 27.6700, 85.4210),
            Point::new(PointId(-3), 27.6710, 85.4210),
            Point::new(PointId(-4), 27.6710, 85.4200),
            Point::new(PointId(-5), 27.6720, 85.4220),
            Point::new(PointId(-6), 27.6800, 85.4300),
            Point::new(PointId(-7), 27.6900, 85.4400),
            Point::new(PointId(-8), 27.6901, 85.4401),
        ]
    }

    pub(crate) fn expected_ways() -> Vec<Way> {
        vec![
            Way {
                id: -100,
                nodes: vec![PointId(-1), PointId(-2), PointId(-3)],
                tags: tags! {"highway": "residential", "name": "Taumadhi Marg"},
            },
            Way {
                id: -101,
                nodes: vec![PointId(-3), PointId(-4), PointId(-1)],
                tags: tags! {"highway": "residential"},
            },
            Way {
                id: -102,
                nodes: vec![PointId(-3), PointId(-5), PointId(-999)],
                tags: tags! {"highway": "service"},
            },
            Way {
                id: -103,
                nodes: vec![PointId(-7), PointId(-8)],
                tags: tags! {"highway": "path"},
            },
            Way {
                id: -104,
                nodes: vec![PointId(-2)],
                tags: tags! {},
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniff_compression_magic() {
        assert_eq!(sniff_compression(&[0x1f, 0x8b, 0x08]), Compression::Gzip);
        assert_eq!(sniff_compression(b"BZh91AY&SY"), Compression::Bzip2);
        assert_eq!(sniff_compression(b"{\"elements\": []}"), Compression::None);
        assert_eq!(sniff_compression(b""), Compression::None);
    }

    #[test]
    fn sniff_syntax_skips_whitespace() {
        let mut r = io::Cursor::new(&b"  \n\t{\"elements\": []}"[..]);
        assert_eq!(sniff_syntax(&mut r).unwrap(), Syntax::Json);
        assert_eq!(r.fill_buf().unwrap()[0], b'{');

        let mut r = io::Cursor::new(&b"<?xml version='1.0'?><osm/>"[..]);
        assert_eq!(sniff_syntax(&mut r).unwrap(), Syntax::Xml);
    }

    #[test]
    fn sniff_syntax_unknown() {
        assert!(matches!(
            sniff_syntax(&mut io::Cursor::new(&b"   "[..])),
            Err(Error::UnknownFormat)
        ));
        assert!(matches!(
            sniff_syntax(&mut io::Cursor::new(&b"node,1,2"[..])),
            Err(Error::UnknownFormat)
        ));
    }
}
