//! Encoder for synthetic extracts used by decoder and pipeline tests.

use std::collections::HashMap;
use std::io::{self, Write};

use byteorder::{NetworkEndian, WriteBytesExt};
use flate2::Compression;
use flate2::write::ZlibEncoder;
use geo::Rect;
use osmpoi_core::ElementKind;
use prost::Message;

use super::proto::{
    Blob, BlobHeader, DenseNodes, HeaderBBox, HeaderBlock, MemberType, Node, PrimitiveBlock,
    PrimitiveGroup, Relation, StringTable, Way,
};

/// Default granularity: one unit is 100 nanodegrees.
const UNITS_PER_DEGREE: f64 = 1e7;

/// A node to encode.
#[derive(Debug, Clone, PartialEq)]
pub struct TestNode {
    /// Node id; negative ids are encoded as given.
    pub id: i64,
    /// Longitude in degrees.
    pub lon: f64,
    /// Latitude in degrees.
    pub lat: f64,
    /// Tags in insertion order.
    pub tags: Vec<(String, String)>,
}

impl TestNode {
    /// An untagged node.
    #[must_use]
    pub const fn new(id: i64, lon: f64, lat: f64) -> Self {
        Self {
            id,
            lon,
            lat,
            tags: Vec::new(),
        }
    }

    /// Add a tag.
    #[must_use]
    pub fn tag(mut self, key: &str, value: &str) -> Self {
        self.tags.push((key.to_owned(), value.to_owned()));
        self
    }
}

/// A way to encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestWay {
    /// Way id.
    pub id: i64,
    /// Node references in order.
    pub refs: Vec<i64>,
    /// Tags in insertion order.
    pub tags: Vec<(String, String)>,
}

impl TestWay {
    /// An untagged way over `refs`.
    #[must_use]
    pub fn new(id: i64, refs: &[i64]) -> Self {
        Self {
            id,
            refs: refs.to_vec(),
            tags: Vec::new(),
        }
    }

    /// Add a tag.
    #[must_use]
    pub fn tag(mut self, key: &str, value: &str) -> Self {
        self.tags.push((key.to_owned(), value.to_owned()));
        self
    }
}

/// A relation to encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestRelation {
    /// Relation id.
    pub id: i64,
    /// Members as kind, id and role.
    pub members: Vec<(ElementKind, i64, String)>,
    /// Tags in insertion order.
    pub tags: Vec<(String, String)>,
}

impl TestRelation {
    /// A relation without members or tags.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self {
            id,
            members: Vec::new(),
            tags: Vec::new(),
        }
    }

    /// Append a member.
    #[must_use]
    pub fn member(mut self, kind: ElementKind, id: i64, role: &str) -> Self {
        self.members.push((kind, id, role.to_owned()));
        self
    }

    /// Add a tag.
    #[must_use]
    pub fn tag(mut self, key: &str, value: &str) -> Self {
        self.tags.push((key.to_owned(), value.to_owned()));
        self
    }
}

#[derive(Debug, Default)]
struct Strings {
    table: Vec<String>,
    index: HashMap<String, u32>,
}

impl Strings {
    fn new() -> Self {
        let mut strings = Self::default();
        strings.id("");
        strings
    }

    fn id(&mut self, value: &str) -> u32 {
        if let Some(&id) = self.index.get(value) {
            return id;
        }
        let id = u32::try_from(self.table.len()).unwrap_or(u32::MAX);
        self.table.push(value.to_owned());
        self.index.insert(value.to_owned(), id);
        id
    }

    fn tag_ids(&mut self, tags: &[(String, String)]) -> (Vec<u32>, Vec<u32>) {
        tags.iter().map(|(k, v)| (self.id(k), self.id(v))).unzip()
    }

    fn into_table(self) -> StringTable {
        StringTable {
            s: self.table.into_iter().map(String::into_bytes).collect(),
        }
    }
}

/// Builds a PBF byte stream one block per call.
///
/// Encoding errors are deferred to [`PbfWriter::finish`] so calls chain.
#[derive(Debug)]
pub struct PbfWriter {
    zlib: bool,
    out: Vec<u8>,
    error: Option<io::Error>,
}

impl PbfWriter {
    /// Writer storing blobs uncompressed.
    #[must_use]
    pub const fn raw() -> Self {
        Self {
            zlib: false,
            out: Vec::new(),
            error: None,
        }
    }

    /// Writer storing blobs zlib-compressed.
    #[must_use]
    pub const fn zlib() -> Self {
        Self {
            zlib: true,
            out: Vec::new(),
            error: None,
        }
    }

    /// Append an `OSMHeader` blob.
    #[must_use]
    pub fn header(self, bbox: Option<Rect>) -> Self {
        let header = HeaderBlock {
            bbox: bbox.map(|rect| HeaderBBox {
                left: nanos(rect.min().x),
                right: nanos(rect.max().x),
                top: nanos(rect.max().y),
                bottom: nanos(rect.min().y),
            }),
            required_features: vec!["OsmSchema-V0.6".into(), "DenseNodes".into()],
            writingprogram: Some("osmpoi-test".into()),
        };
        self.payload("OSMHeader", &header.encode_to_vec())
    }

    /// Append a block of dense nodes.
    #[must_use]
    pub fn dense_nodes(self, nodes: &[TestNode]) -> Self {
        let mut strings = Strings::new();
        let mut dense = DenseNodes::default();
        let (mut id, mut lat, mut lon) = (0, 0, 0);
        let tagged = nodes.iter().any(|node| !node.tags.is_empty());
        for node in nodes {
            let (node_lat, node_lon) = (units(node.lat), units(node.lon));
            dense.id.push(node.id - id);
            dense.lat.push(node_lat - lat);
            dense.lon.push(node_lon - lon);
            (id, lat, lon) = (node.id, node_lat, node_lon);
            if tagged {
                for (key, value) in &node.tags {
                    dense.keys_vals.push(string_index(strings.id(key)));
                    dense.keys_vals.push(string_index(strings.id(value)));
                }
                dense.keys_vals.push(0);
            }
        }
        let group = PrimitiveGroup {
            dense: Some(dense),
            ..PrimitiveGroup::default()
        };
        self.group(strings, group)
    }

    /// Append a block of plain nodes.
    #[must_use]
    pub fn plain_nodes(self, nodes: &[TestNode]) -> Self {
        let mut strings = Strings::new();
        let nodes = nodes
            .iter()
            .map(|node| {
                let (keys, vals) = strings.tag_ids(&node.tags);
                Node {
                    id: node.id,
                    keys,
                    vals,
                    lat: units(node.lat),
                    lon: units(node.lon),
                }
            })
            .collect();
        let group = PrimitiveGroup {
            nodes,
            ..PrimitiveGroup::default()
        };
        self.group(strings, group)
    }

    /// Append a block of ways.
    #[must_use]
    pub fn ways(self, ways: &[TestWay]) -> Self {
        let mut strings = Strings::new();
        let ways = ways
            .iter()
            .map(|way| {
                let (keys, vals) = strings.tag_ids(&way.tags);
                Way {
                    id: way.id,
                    keys,
                    vals,
                    refs: deltas(way.refs.iter().copied()),
                }
            })
            .collect();
        let group = PrimitiveGroup {
            ways,
            ..PrimitiveGroup::default()
        };
        self.group(strings, group)
    }

    /// Append a block of relations.
    #[must_use]
    pub fn relations(self, relations: &[TestRelation]) -> Self {
        let mut strings = Strings::new();
        let relations = relations
            .iter()
            .map(|relation| {
                let (keys, vals) = strings.tag_ids(&relation.tags);
                Relation {
                    id: relation.id,
                    keys,
                    vals,
                    roles_sid: relation
                        .members
                        .iter()
                        .map(|(_, _, role)| string_index(strings.id(role)))
                        .collect(),
                    memids: deltas(relation.members.iter().map(|(_, id, _)| *id)),
                    types: relation
                        .members
                        .iter()
                        .map(|(kind, _, _)| i32::from(member_type(*kind)))
                        .collect(),
                }
            })
            .collect();
        let group = PrimitiveGroup {
            relations,
            ..PrimitiveGroup::default()
        };
        self.group(strings, group)
    }

    /// Append an `OSMData` blob whose zlib stream cannot be inflated.
    #[must_use]
    pub fn corrupt_data(mut self) -> Self {
        let blob = Blob {
            zlib_data: Some(vec![0x78, 0x9c, 0xff, 0xff, 0xff, 0xff]),
            raw_size: Some(64),
            ..Blob::default()
        };
        self.frame("OSMData", &blob.encode_to_vec());
        self
    }

    /// Append bytes verbatim, for example a truncated frame.
    #[must_use]
    pub fn bytes(mut self, bytes: &[u8]) -> Self {
        self.out.extend_from_slice(bytes);
        self
    }

    /// The encoded stream.
    ///
    /// # Errors
    ///
    /// Returns the first error met while encoding.
    pub fn finish(self) -> io::Result<Vec<u8>> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.out),
        }
    }

    fn group(self, strings: Strings, group: PrimitiveGroup) -> Self {
        let block = PrimitiveBlock {
            stringtable: strings.into_table(),
            primitivegroup: vec![group],
            granularity: None,
            lat_offset: None,
            lon_offset: None,
        };
        self.payload("OSMData", &block.encode_to_vec())
    }

    fn payload(mut self, kind: &str, data: &[u8]) -> Self {
        let blob = match self.compress(data) {
            Ok(blob) => blob,
            Err(err) => {
                self.error.get_or_insert(err);
                return self;
            }
        };
        self.frame(kind, &blob.encode_to_vec());
        self
    }

    fn compress(&self, data: &[u8]) -> io::Result<Blob> {
        let raw_size = Some(to_i32(data.len())?);
        if !self.zlib {
            return Ok(Blob {
                raw: Some(data.to_vec()),
                raw_size,
                ..Blob::default()
            });
        }
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data)?;
        Ok(Blob {
            zlib_data: Some(encoder.finish()?),
            raw_size,
            ..Blob::default()
        })
    }

    fn frame(&mut self, kind: &str, blob: &[u8]) {
        let result = to_i32(blob.len()).and_then(|datasize| {
            let header = BlobHeader {
                r#type: kind.to_owned(),
                indexdata: None,
                datasize,
            }
            .encode_to_vec();
            let header_len = u32::try_from(header.len())
                .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?;
            self.out.write_u32::<NetworkEndian>(header_len)?;
            self.out.extend_from_slice(&header);
            self.out.extend_from_slice(blob);
            Ok(())
        });
        if let Err(err) = result {
            self.error.get_or_insert(err);
        }
    }
}

fn to_i32(len: usize) -> io::Result<i32> {
    i32::try_from(len).map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))
}

fn string_index(id: u32) -> i32 {
    i32::try_from(id).unwrap_or(i32::MAX)
}

#[expect(
    clippy::float_arithmetic,
    clippy::cast_possible_truncation,
    reason = "test coordinates are small and rounded to whole units"
)]
fn units(degrees: f64) -> i64 {
    (degrees * UNITS_PER_DEGREE).round() as i64
}

#[expect(
    clippy::float_arithmetic,
    clippy::cast_possible_truncation,
    reason = "test coordinates are small and rounded to whole nanodegrees"
)]
fn nanos(degrees: f64) -> i64 {
    (degrees * 1e9).round() as i64
}

fn deltas(values: impl Iterator<Item = i64>) -> Vec<i64> {
    let mut previous = 0;
    values
        .map(|value| {
            let delta = value - previous;
            previous = value;
            delta
        })
        .collect()
}

const fn member_type(kind: ElementKind) -> MemberType {
    match kind {
        ElementKind::Node => MemberType::Node,
        ElementKind::Way => MemberType::Way,
        ElementKind::Relation => MemberType::Relation,
    }
}
