// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Reader for the [OSM XML](https://wiki.openstreetmap.org/wiki/OSM_XML) format,
//! as returned by `[out:xml]` Overpass queries or OSM data exports.

use std::collections::HashMap;
use std::io;
use std::str::from_utf8;

use quick_xml::events::{BytesStart, Event};

use super::model;
use crate::{Point, PointId};

/// Parser is a trait for objects which can parse XML.
///
/// This trait only exists to fix the mismatch of
/// [quick_xml::Reader::read_event] when working on buffered data
/// and [quick_xml::Reader::read_event_into] when working on IO.
pub(super) trait Parser {
    fn read_event<'a>(&'a mut self) -> quick_xml::Result<Event<'a>>;
}

/// IoParser implements [Parser] over an [std::io::BufRead].
pub(super) struct IoParser<R: io::BufRead>(quick_xml::Reader<R>, Vec<u8>);

impl<R: io::BufRead> IoParser<R> {
    #[inline]
    fn new(reader: R) -> Self {
        Self(quick_xml::Reader::from_reader(reader), Vec::default())
    }
}

impl<R: io::BufRead> Parser for IoParser<R> {
    #[inline]
    fn read_event<'a>(&'a mut self) -> quick_xml::Result<Event<'a>> {
        self.1.clear();
        self.0.read_event_into(&mut self.1)
    }
}

/// BufParser implements [Parser] over a slice of bytes (`&[u8]`).
pub(super) struct BufParser<'a>(quick_xml::Reader<&'a [u8]>);

impl<'a> BufParser<'a> {
    #[inline]
    fn new(data: &'a [u8]) -> Self {
        Self(quick_xml::Reader::from_reader(data))
    }
}

impl Parser for BufParser<'_> {
    #[inline]
    fn read_event<'b>(&'b mut self) -> quick_xml::Result<Event<'b>> {
        self.0.read_event()
    }
}

/// Reader reads osm [Features](model::Feature) from an XML file.
///
/// `<relation>` elements and anything nested within them are skipped.
/// An element left open at the end of input is dropped.
pub(super) struct Reader<P: Parser> {
    parser: P,
    eof: bool,
}

impl<P: Parser> Reader<P> {
    #[inline]
    fn new(parser: P) -> Self {
        Self { parser, eof: false }
    }
}

impl<P: Parser> Iterator for Reader<P> {
    type Item = Result<model::Feature, quick_xml::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut f: Option<model::Feature> = None;

        while !self.eof {
            let event = match self.parser.read_event() {
                Ok(e) => e,
                Err(e) => {
                    self.eof = true;
                    return Some(Err(e));
                }
            };

            match event {
                Event::Empty(start) => match start.local_name().as_ref() {
                    b"node" => {
                        if let Some(n) = parse_node(&start) {
                            return Some(Ok(model::Feature::Node(n)));
                        }
                    }
                    // "way" can't be self-closing
                    b"tag" => {
                        if let Some(model::Feature::Way(ref mut w)) = f {
                            if let Some((k, v)) = parse_tag(&start) {
                                w.tags.insert(k, v);
                            }
                        }
                    }
                    b"nd" => {
                        if let Some(model::Feature::Way(ref mut w)) = f {
                            if let Some(ref_) = parse_nd(&start) {
                                w.nodes.push(ref_);
                            }
                        }
                    }
                    _ => {}
                },

                Event::Start(start) => match start.local_name().as_ref() {
                    b"node" => f = parse_node(&start).map(model::Feature::Node),
                    b"way" => f = parse_way(&start).map(model::Feature::Way),
                    // "tag" and "nd" must be self-closing
                    _ => {}
                },

                Event::End(end) => match end.local_name().as_ref() {
                    b"node" | b"way" => {
                        if let Some(f) = f.take() {
                            return Some(Ok(f));
                        }
                    }
                    _ => {}
                },

                Event::Eof => {
                    self.eof = true;
                }

                _ => {}
            }
        }

        if let Some(f) = f {
            let id = match f {
                model::Feature::Node(n) => n.id.0,
                model::Feature::Way(w) => w.id,
            };
            log::warn!("input ends inside element {id} - dropping it");
        }
        None
    }
}

impl<'a> Reader<BufParser<'a>> {
    #[inline]
    pub(super) fn from_buffer(data: &'a [u8]) -> Self {
        Self::new(BufParser::new(data))
    }
}

impl<R: io::BufRead> Reader<IoParser<R>> {
    #[inline]
    pub(super) fn from_io(reader: R) -> Self {
        Self::new(IoParser::new(reader))
    }
}

fn parse_node(start: &BytesStart<'_>) -> Option<Point> {
    let mut id: i64 = 0;
    let mut lat = f64::NAN;
    let mut lon = f64::NAN;

    for attr in start.attributes() {
        let attr = attr.ok()?;
        match attr.key.as_ref() {
            b"id" => id = from_utf8(&attr.value).ok()?.parse().ok()?,
            b"lat" => lat = from_utf8(&attr.value).ok()?.parse().ok()?,
            b"lon" => lon = from_utf8(&attr.value).ok()?.parse().ok()?,
            _ => {}
        }
    }

    if id != 0 && lat.is_finite() && lon.is_finite() {
        Some(Point::new(PointId(id), lat, lon))
    } else {
        log::trace!("skipping node {id} without a valid position");
        None
    }
}

fn parse_way(start: &BytesStart<'_>) -> Option<model::Way> {
    let mut id: i64 = 0;

    for attr in start.attributes() {
        let attr = attr.ok()?;
        if attr.key.as_ref() == b"id" {
            id = from_utf8(&attr.value).ok()?.parse().ok()?;
        }
    }

    if id != 0 {
        Some(model::Way {
            id,
            nodes: Vec::default(),
            tags: HashMap::default(),
        })
    } else {
        None
    }
}

fn parse_tag(start: &BytesStart<'_>) -> Option<(String, String)> {
    let mut k = None;
    let mut v = None;

    for attr in start.attributes() {
        let attr = attr.ok()?;
        match attr.key.as_ref() {
            b"k" => k = Some(attr.unescape_value().ok()?.into_owned()),
            b"v" => v = Some(attr.unescape_value().ok()?.into_owned()),
            _ => {}
        }
    }

    k.map(|k| (k, v.unwrap_or_default()))
}

fn parse_nd(start: &BytesStart<'_>) -> Option<PointId> {
    let mut ref_: i64 = 0;

    for attr in start.attributes() {
        let attr = attr.ok()?;
        if attr.key.as_ref() == b"ref" {
            ref_ = from_utf8(&attr.value).ok()?.parse().ok()?;
        }
    }

    if ref_ != 0 {
        Some(PointId(ref_))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_data::{expected_nodes, expected_ways};
    use super::*;

    const SIMPLE_XML: &[u8] = include_bytes!("test_fixtures/simple.osm");

    fn collect_all<I: Iterator<Item = Result<model::Feature, quick_xml::Error>>>(
        features: I,
    ) -> Result<(Vec<Point>, Vec<model::Way>), quick_xml::Error> {
        let mut nodes = Vec::default();
        let mut ways = Vec::default();

        for f in features {
            match f? {
                model::Feature::Node(n) => nodes.push(n),
                model::Feature::Way(w) => ways.push(w),
            }
        }

        Ok((nodes, ways))
    }

    fn check_against_expected<I: Iterator<Item = Result<model::Feature, quick_xml::Error>>>(
        features: I,
    ) -> Result<(), quick_xml::Error> {
        let (mut nodes, mut ways) = collect_all(features)?;
        let mut expected_nodes = expected_nodes();
        let mut expected_ways = expected_ways();

        // The XML fixture lists nodes first, as OSM exports do,
        // while the JSON one follows the Overpass order.
        nodes.sort_by_key(|n| n.id);
        ways.sort_by_key(|w| w.id);
        expected_nodes.sort_by_key(|n| n.id);
        expected_ways.sort_by_key(|w| w.id);

        assert_eq!(nodes, expected_nodes);
        assert_eq!(ways, expected_ways);
        Ok(())
    }

    #[test]
    fn parse_from_buf() -> Result<(), quick_xml::Error> {
        check_against_expected(Reader::from_buffer(SIMPLE_XML))
    }

    #[test]
    fn parse_from_io() -> Result<(), quick_xml::Error> {
        check_against_expected(Reader::from_io(io::Cursor::new(SIMPLE_XML)))
    }

    #[test]
    fn skips_relations() -> Result<(), quick_xml::Error> {
        let data = br#"<osm>
            <node id="1" lat="1.0" lon="2.0"><tag k="name" v="a"/></node>
            <relation id="5">
                <member type="node" ref="1" role="via"/>
                <tag k="type" v="restriction"/>
            </relation>
            <way id="9"><nd ref="1"/><nd ref="2"/><tag k="highway" v="path"/></way>
        </osm>"#;
        let (nodes, ways) = collect_all(Reader::from_buffer(data))?;
        assert_eq!(nodes, vec![Point::new(PointId(1), 1.0, 2.0)]);
        assert_eq!(ways.len(), 1);
        assert_eq!(ways[0].nodes, vec![PointId(1), PointId(2)]);
        assert_eq!(ways[0].tags.len(), 1);
        Ok(())
    }

    #[test]
    fn drops_unterminated_way() {
        let data = br#"<osm>
            <node id="1" lat="1.0" lon="2.0"/>
            <node id="2" lat="1.0" lon="2.1"/>
            <way id="9"><nd ref="1"/><nd ref="2"/>"#;
        let features: Vec<_> = Reader::from_buffer(data)
            .take_while(|f| f.is_ok())
            .flatten()
            .collect();
        assert_eq!(
            features,
            vec![
                model::Feature::Node(Point::new(PointId(1), 1.0, 2.0)),
                model::Feature::Node(Point::new(PointId(2), 1.0, 2.1)),
            ]
        );
    }
}
