//! Decoding of inflated `PrimitiveBlock` and `HeaderBlock` payloads.

use geo::{Coord, Rect};
use osmpoi_core::{ElementKind, Tags};
use prost::Message;

use super::BlockDecodeError;
use super::ids::element_id;
use super::proto::{self, HeaderBlock, MemberType, PrimitiveBlock};

const NANO: f64 = 1e-9;

/// Which element groups a pass needs; other groups are skipped undecoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockFilter {
    /// Plain and dense nodes only.
    Nodes,
    /// Ways and relations only.
    WaysAndRelations,
    /// Everything.
    All,
}

impl BlockFilter {
    const fn nodes(self) -> bool {
        matches!(self, Self::Nodes | Self::All)
    }

    const fn ways_and_relations(self) -> bool {
        matches!(self, Self::WaysAndRelations | Self::All)
    }
}

/// A node with absolute id and coordinates in degrees.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedNode {
    /// Node id.
    pub id: u64,
    /// Longitude (`x`) and latitude (`y`).
    pub location: Coord,
    /// Resolved tags.
    pub tags: Tags,
}

/// A way with absolute node references in way order.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedWay {
    /// Way id.
    pub id: u64,
    /// Node ids.
    pub refs: Vec<u64>,
    /// Resolved tags.
    pub tags: Tags,
}

/// One relation member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    /// Member kind.
    pub kind: ElementKind,
    /// Member id.
    pub id: u64,
    /// Member role, possibly empty.
    pub role: String,
}

/// A relation with its ordered member list.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedRelation {
    /// Relation id.
    pub id: u64,
    /// Members in declaration order.
    pub members: Vec<Member>,
    /// Resolved tags.
    pub tags: Tags,
}

/// Elements decoded from one block, each list in stream order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedBlock {
    /// Dense and plain nodes.
    pub nodes: Vec<DecodedNode>,
    /// Ways.
    pub ways: Vec<DecodedWay>,
    /// Relations.
    pub relations: Vec<DecodedRelation>,
}

/// Decode an inflated `OSMData` payload.
///
/// Delta accumulators start from zero for every dense group. Elements with
/// negative ids are skipped.
///
/// # Errors
///
/// Any inconsistency fails the whole block: a malformed message, an
/// out-of-range string index, mismatched parallel arrays, misframed dense
/// tags, an unknown member type, or coordinate overflow.
pub fn decode_block(data: &[u8], filter: BlockFilter) -> Result<DecodedBlock, BlockDecodeError> {
    let block = PrimitiveBlock::decode(data)?;
    let context = BlockContext::new(&block);
    let mut decoded = DecodedBlock::default();

    for group in &block.primitivegroup {
        if filter.nodes() {
            for node in &group.nodes {
                if let Some(id) = element_id(ElementKind::Node, node.id) {
                    decoded.nodes.push(DecodedNode {
                        id,
                        location: context.location(node.lat, node.lon)?,
                        tags: context.tags(&node.keys, &node.vals, "node")?,
                    });
                }
            }
            if let Some(dense) = &group.dense {
                context.dense_nodes(dense, &mut decoded.nodes)?;
            }
        }
        if filter.ways_and_relations() {
            for way in &group.ways {
                if let Some(decoded_way) = context.way(way)? {
                    decoded.ways.push(decoded_way);
                }
            }
            for relation in &group.relations {
                if let Some(decoded_relation) = context.relation(relation)? {
                    decoded.relations.push(decoded_relation);
                }
            }
        }
    }
    Ok(decoded)
}

/// Decode an inflated `OSMHeader` payload into its bounding box, if any.
///
/// # Errors
///
/// Returns [`BlockDecodeError::Protobuf`] for a malformed header.
pub fn decode_header(data: &[u8]) -> Result<Option<Rect>, BlockDecodeError> {
    let header = HeaderBlock::decode(data)?;
    Ok(header.bbox.map(|bbox| {
        Rect::new(
            Coord {
                x: nano_to_degrees(bbox.left),
                y: nano_to_degrees(bbox.bottom),
            },
            Coord {
                x: nano_to_degrees(bbox.right),
                y: nano_to_degrees(bbox.top),
            },
        )
    }))
}

struct BlockContext {
    strings: Vec<String>,
    granularity: i64,
    lat_offset: i64,
    lon_offset: i64,
}

impl BlockContext {
    fn new(block: &PrimitiveBlock) -> Self {
        Self {
            strings: block
                .stringtable
                .s
                .iter()
                .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
                .collect(),
            granularity: i64::from(block.granularity()),
            lat_offset: block.lat_offset(),
            lon_offset: block.lon_offset(),
        }
    }

    fn string(&self, index: i64) -> Result<&str, BlockDecodeError> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.strings.get(i))
            .map(String::as_str)
            .ok_or(BlockDecodeError::StringIndex {
                index,
                len: self.strings.len(),
            })
    }

    fn tags(&self, keys: &[u32], vals: &[u32], what: &'static str) -> Result<Tags, BlockDecodeError> {
        if keys.len() != vals.len() {
            return Err(BlockDecodeError::LengthMismatch { what });
        }
        keys.iter()
            .zip(vals)
            .map(|(&key, &value)| {
                Ok((
                    self.string(i64::from(key))?.to_owned(),
                    self.string(i64::from(value))?.to_owned(),
                ))
            })
            .collect()
    }

    fn degrees(&self, offset: i64, value: i64) -> Result<f64, BlockDecodeError> {
        self.granularity
            .checked_mul(value)
            .and_then(|scaled| scaled.checked_add(offset))
            .map(nano_to_degrees)
            .ok_or(BlockDecodeError::CoordinateOverflow)
    }

    fn location(&self, lat: i64, lon: i64) -> Result<Coord, BlockDecodeError> {
        Ok(Coord {
            x: self.degrees(self.lon_offset, lon)?,
            y: self.degrees(self.lat_offset, lat)?,
        })
    }

    fn dense_nodes(
        &self,
        dense: &proto::DenseNodes,
        out: &mut Vec<DecodedNode>,
    ) -> Result<(), BlockDecodeError> {
        let count = dense.id.len();
        if dense.lat.len() != count || dense.lon.len() != count {
            return Err(BlockDecodeError::LengthMismatch { what: "dense node" });
        }

        let has_tags = !dense.keys_vals.is_empty();
        let mut keys_vals = dense.keys_vals.iter().copied();
        let (mut id, mut lat, mut lon) = (0_i64, 0_i64, 0_i64);
        for (node, ((&d_id, &d_lat), &d_lon)) in dense
            .id
            .iter()
            .zip(&dense.lat)
            .zip(&dense.lon)
            .enumerate()
        {
            id = accumulate(id, d_id)?;
            lat = accumulate(lat, d_lat)?;
            lon = accumulate(lon, d_lon)?;

            let mut tags = Tags::new();
            if has_tags {
                loop {
                    let key = keys_vals
                        .next()
                        .ok_or(BlockDecodeError::TruncatedDenseTags { node })?;
                    if key == 0 {
                        break;
                    }
                    let value = keys_vals
                        .next()
                        .ok_or(BlockDecodeError::TruncatedDenseTags { node })?;
                    tags.insert(
                        self.string(i64::from(key))?.to_owned(),
                        self.string(i64::from(value))?.to_owned(),
                    );
                }
            }

            if let Some(id) = element_id(ElementKind::Node, id) {
                out.push(DecodedNode {
                    id,
                    location: self.location(lat, lon)?,
                    tags,
                });
            }
        }

        let extra = keys_vals.count();
        if extra > 0 {
            return Err(BlockDecodeError::TrailingDenseTags { extra });
        }
        Ok(())
    }

    fn way(&self, way: &proto::Way) -> Result<Option<DecodedWay>, BlockDecodeError> {
        let tags = self.tags(&way.keys, &way.vals, "way tag")?;
        let mut refs = Vec::with_capacity(way.refs.len());
        let mut current = 0_i64;
        for &delta in &way.refs {
            current = accumulate(current, delta)?;
            if let Some(node) = element_id(ElementKind::Node, current) {
                refs.push(node);
            }
        }
        Ok(element_id(ElementKind::Way, way.id).map(|id| DecodedWay { id, refs, tags }))
    }

    fn relation(
        &self,
        relation: &proto::Relation,
    ) -> Result<Option<DecodedRelation>, BlockDecodeError> {
        let tags = self.tags(&relation.keys, &relation.vals, "relation tag")?;
        let count = relation.memids.len();
        if relation.roles_sid.len() != count || relation.types.len() != count {
            return Err(BlockDecodeError::LengthMismatch {
                what: "relation member",
            });
        }

        let mut members = Vec::with_capacity(count);
        let mut current = 0_i64;
        for ((&delta, &raw_type), &role) in relation
            .memids
            .iter()
            .zip(&relation.types)
            .zip(&relation.roles_sid)
        {
            current = accumulate(current, delta)?;
            let kind = match MemberType::try_from(raw_type) {
                Ok(MemberType::Node) => ElementKind::Node,
                Ok(MemberType::Way) => ElementKind::Way,
                Ok(MemberType::Relation) => ElementKind::Relation,
                Err(_) => return Err(BlockDecodeError::UnknownMemberType { value: raw_type }),
            };
            let role = self.string(i64::from(role))?.to_owned();
            if let Some(id) = element_id(kind, current) {
                members.push(Member { kind, id, role });
            }
        }
        Ok(element_id(ElementKind::Relation, relation.id)
            .map(|id| DecodedRelation { id, members, tags }))
    }
}

fn accumulate(total: i64, delta: i64) -> Result<i64, BlockDecodeError> {
    total
        .checked_add(delta)
        .ok_or(BlockDecodeError::CoordinateOverflow)
}

#[expect(
    clippy::cast_precision_loss,
    clippy::float_arithmetic,
    reason = "nanodegree offsets stay far below 2^53 and scale to degrees"
)]
fn nano_to_degrees(nanos: i64) -> f64 {
    nanos as f64 * NANO
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pbf::writer::{PbfWriter, TestNode, TestRelation, TestWay};
    use crate::pbf::{BlobKind, PbfReader};
    use proto::{DenseNodes, PrimitiveGroup, StringTable};
    use rstest::rstest;

    fn first_data_block(bytes: &[u8]) -> Vec<u8> {
        PbfReader::new(bytes)
            .map(|blob| blob.expect("framing"))
            .find(|blob| blob.kind == BlobKind::Data)
            .expect("a data blob")
            .inflate()
            .expect("inflate")
    }

    fn string_table(strings: &[&str]) -> StringTable {
        StringTable {
            s: strings.iter().map(|s| s.as_bytes().to_vec()).collect(),
        }
    }

    fn dense_block(dense: DenseNodes) -> Vec<u8> {
        PrimitiveBlock {
            stringtable: string_table(&["", "amenity", "cafe"]),
            primitivegroup: vec![PrimitiveGroup {
                dense: Some(dense),
                ..PrimitiveGroup::default()
            }],
            granularity: None,
            lat_offset: None,
            lon_offset: None,
        }
        .encode_to_vec()
    }

    #[rstest]
    fn dense_nodes_accumulate_deltas_and_split_tags() {
        let data = dense_block(DenseNodes {
            id: vec![10, 1, 5],
            lat: vec![515_000_000, 10, -20],
            lon: vec![-1_000_000, 0, 30],
            keys_vals: vec![1, 2, 0, 0, 1, 2, 0],
        });

        let block = decode_block(&data, BlockFilter::Nodes).expect("decode");

        let ids: Vec<u64> = block.nodes.iter().map(|n| n.id).collect();
        assert_eq!(ids, [10, 11, 16]);
        assert!((block.nodes[0].location.y - 51.5).abs() < 1e-9);
        assert!((block.nodes[0].location.x + 0.1).abs() < 1e-9);
        assert!((block.nodes[2].location.y - 51.499_999).abs() < 1e-9);
        assert_eq!(block.nodes[0].tags.get("amenity").map(String::as_str), Some("cafe"));
        assert!(block.nodes[1].tags.is_empty());
        assert_eq!(block.nodes[2].tags.len(), 1);
    }

    #[rstest]
    #[case(vec![1, 2, 0, 1, 2], BlockDecodeError::TruncatedDenseTags { node: 1 })]
    #[case(vec![1, 2], BlockDecodeError::TruncatedDenseTags { node: 0 })]
    #[case(vec![0, 0, 1, 2], BlockDecodeError::TrailingDenseTags { extra: 2 })]
    fn misframed_dense_tags_fail_the_block(
        #[case] keys_vals: Vec<i32>,
        #[case] expected: BlockDecodeError,
    ) {
        let data = dense_block(DenseNodes {
            id: vec![1, 1],
            lat: vec![0, 0],
            lon: vec![0, 0],
            keys_vals,
        });

        let err = decode_block(&data, BlockFilter::All).expect_err("misframed");
        assert_eq!(err.to_string(), expected.to_string());
    }

    #[rstest]
    fn out_of_range_string_index_fails_the_block() {
        let data = dense_block(DenseNodes {
            id: vec![1],
            lat: vec![0],
            lon: vec![0],
            keys_vals: vec![1, 9, 0],
        });
        assert!(matches!(
            decode_block(&data, BlockFilter::Nodes),
            Err(BlockDecodeError::StringIndex { index: 9, len: 3 })
        ));
    }

    #[rstest]
    fn offsets_and_granularity_scale_coordinates() {
        let data = PrimitiveBlock {
            stringtable: string_table(&[""]),
            primitivegroup: vec![PrimitiveGroup {
                nodes: vec![proto::Node {
                    id: 3,
                    keys: vec![],
                    vals: vec![],
                    lat: 2,
                    lon: 4,
                }],
                ..PrimitiveGroup::default()
            }],
            granularity: Some(1_000),
            lat_offset: Some(1_000_000_000),
            lon_offset: Some(-2_000_000_000),
        }
        .encode_to_vec();

        let block = decode_block(&data, BlockFilter::All).expect("decode");

        let location = block.nodes[0].location;
        assert!((location.y - 1.000_002).abs() < 1e-12);
        assert!((location.x + 1.999_996).abs() < 1e-12);
    }

    #[rstest]
    fn ways_and_relations_keep_member_order() {
        let bytes = PbfWriter::raw()
            .ways(&[TestWay::new(7, &[30, 10, 20, 30]).tag("area", "yes")])
            .relations(&[TestRelation::new(9)
                .member(ElementKind::Way, 7, "outer")
                .member(ElementKind::Node, 3, "admin_centre")
                .member(ElementKind::Relation, 2, "subarea")
                .tag("type", "boundary")])
            .finish()
            .expect("encode");
        let data = first_data_block(&bytes);

        let block = decode_block(&data, BlockFilter::WaysAndRelations).expect("decode");

        assert_eq!(block.ways[0].refs, [30, 10, 20, 30]);
        let members: Vec<(ElementKind, u64, &str)> = block.relations[0]
            .members
            .iter()
            .map(|m| (m.kind, m.id, m.role.as_str()))
            .collect();
        assert_eq!(
            members,
            [
                (ElementKind::Way, 7, "outer"),
                (ElementKind::Node, 3, "admin_centre"),
                (ElementKind::Relation, 2, "subarea"),
            ]
        );
    }

    #[rstest]
    fn filters_skip_unrequested_groups() {
        let bytes = PbfWriter::raw()
            .dense_nodes(&[TestNode::new(1, 0.0, 0.0)])
            .ways(&[TestWay::new(7, &[1])])
            .finish()
            .expect("encode");
        let blocks: Vec<Vec<u8>> = PbfReader::new(bytes.as_slice())
            .map(|blob| blob.expect("framing").inflate().expect("inflate"))
            .collect();

        let nodes_only: Vec<DecodedBlock> = blocks
            .iter()
            .map(|data| decode_block(data, BlockFilter::Nodes).expect("decode"))
            .collect();
        assert_eq!(nodes_only.iter().map(|b| b.nodes.len()).sum::<usize>(), 1);
        assert!(nodes_only.iter().all(|b| b.ways.is_empty()));
    }

    #[rstest]
    fn negative_ids_are_skipped() {
        let bytes = PbfWriter::raw()
            .dense_nodes(&[TestNode::new(-5, 0.0, 0.0), TestNode::new(6, 1.0, 1.0)])
            .finish()
            .expect("encode");
        let block = decode_block(&first_data_block(&bytes), BlockFilter::Nodes).expect("decode");
        let ids: Vec<u64> = block.nodes.iter().map(|n| n.id).collect();
        assert_eq!(ids, [6]);
    }

    #[rstest]
    fn unknown_member_type_fails_the_block() {
        let data = PrimitiveBlock {
            stringtable: string_table(&[""]),
            primitivegroup: vec![PrimitiveGroup {
                relations: vec![proto::Relation {
                    id: 1,
                    keys: vec![],
                    vals: vec![],
                    roles_sid: vec![0],
                    memids: vec![4],
                    types: vec![7],
                }],
                ..PrimitiveGroup::default()
            }],
            granularity: None,
            lat_offset: None,
            lon_offset: None,
        }
        .encode_to_vec();
        assert!(matches!(
            decode_block(&data, BlockFilter::All),
            Err(BlockDecodeError::UnknownMemberType { value: 7 })
        ));
    }

    #[rstest]
    fn header_yields_the_bounding_box() {
        let bbox = Rect::new(Coord { x: -1.5, y: 50.0 }, Coord { x: 2.0, y: 52.25 });
        let bytes = PbfWriter::raw().header(Some(bbox)).finish().expect("encode");
        let blob = PbfReader::new(bytes.as_slice())
            .next()
            .expect("header blob")
            .expect("framing");

        let decoded = decode_header(&blob.inflate().expect("inflate"))
            .expect("decode")
            .expect("bbox");

        assert!((decoded.min().x + 1.5).abs() < 1e-9);
        assert!((decoded.max().y - 52.25).abs() < 1e-9);
    }
}
