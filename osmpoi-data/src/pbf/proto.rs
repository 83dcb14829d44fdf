//! Protobuf messages of the OSM PBF format, declared with `prost` derives.
//!
//! Only the fields the indexer reads are declared; `prost` skips the rest.

/// Framing header preceding every blob.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BlobHeader {
    /// `OSMHeader` or `OSMData`.
    #[prost(string, required, tag = "1")]
    pub r#type: String,
    /// Opaque index data, unused.
    #[prost(bytes = "vec", optional, tag = "2")]
    pub indexdata: Option<Vec<u8>>,
    /// Size in bytes of the serialised [`Blob`] that follows.
    #[prost(int32, required, tag = "3")]
    pub datasize: i32,
}

/// A possibly compressed payload.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Blob {
    /// Uncompressed payload.
    #[prost(bytes = "vec", optional, tag = "1")]
    pub raw: Option<Vec<u8>>,
    /// Declared size of the payload once inflated.
    #[prost(int32, optional, tag = "2")]
    pub raw_size: Option<i32>,
    /// zlib-compressed payload.
    #[prost(bytes = "vec", optional, tag = "3")]
    pub zlib_data: Option<Vec<u8>>,
    /// LZMA-compressed payload, unsupported.
    #[prost(bytes = "vec", optional, tag = "4")]
    pub lzma_data: Option<Vec<u8>>,
    /// LZ4-compressed payload, unsupported.
    #[prost(bytes = "vec", optional, tag = "6")]
    pub lz4_data: Option<Vec<u8>>,
    /// Zstandard-compressed payload, unsupported.
    #[prost(bytes = "vec", optional, tag = "7")]
    pub zstd_data: Option<Vec<u8>>,
}

/// Contents of an `OSMHeader` blob.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct HeaderBlock {
    /// Extent of the extract.
    #[prost(message, optional, tag = "1")]
    pub bbox: Option<HeaderBBox>,
    /// Features a reader must support.
    #[prost(string, repeated, tag = "4")]
    pub required_features: Vec<String>,
    /// Program that wrote the file.
    #[prost(string, optional, tag = "16")]
    pub writingprogram: Option<String>,
}

/// Bounding box in nanodegrees.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct HeaderBBox {
    /// Western edge.
    #[prost(sint64, required, tag = "1")]
    pub left: i64,
    /// Eastern edge.
    #[prost(sint64, required, tag = "2")]
    pub right: i64,
    /// Northern edge.
    #[prost(sint64, required, tag = "3")]
    pub top: i64,
    /// Southern edge.
    #[prost(sint64, required, tag = "4")]
    pub bottom: i64,
}

/// Contents of an `OSMData` blob.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PrimitiveBlock {
    /// Strings referenced by index from the groups.
    #[prost(message, required, tag = "1")]
    pub stringtable: StringTable,
    /// Element groups.
    #[prost(message, repeated, tag = "2")]
    pub primitivegroup: Vec<PrimitiveGroup>,
    /// Coordinate resolution in nanodegrees.
    #[prost(int32, optional, tag = "17", default = "100")]
    pub granularity: Option<i32>,
    /// Latitude offset in nanodegrees.
    #[prost(int64, optional, tag = "19", default = "0")]
    pub lat_offset: Option<i64>,
    /// Longitude offset in nanodegrees.
    #[prost(int64, optional, tag = "20", default = "0")]
    pub lon_offset: Option<i64>,
}

/// Per-block string table; entry zero is always empty.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StringTable {
    /// Raw UTF-8 strings.
    #[prost(bytes = "vec", repeated, tag = "1")]
    pub s: Vec<Vec<u8>>,
}

/// Elements of a single kind.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PrimitiveGroup {
    /// Plain nodes.
    #[prost(message, repeated, tag = "1")]
    pub nodes: Vec<Node>,
    /// Columnar, delta-coded nodes.
    #[prost(message, optional, tag = "2")]
    pub dense: Option<DenseNodes>,
    /// Ways.
    #[prost(message, repeated, tag = "3")]
    pub ways: Vec<Way>,
    /// Relations.
    #[prost(message, repeated, tag = "4")]
    pub relations: Vec<Relation>,
}

/// A node with absolute id and coordinates.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Node {
    /// Node id.
    #[prost(sint64, required, tag = "1")]
    pub id: i64,
    /// Tag key string indices.
    #[prost(uint32, repeated, tag = "2", packed = "true")]
    pub keys: Vec<u32>,
    /// Tag value string indices.
    #[prost(uint32, repeated, tag = "3", packed = "true")]
    pub vals: Vec<u32>,
    /// Latitude in granularity units.
    #[prost(sint64, required, tag = "8")]
    pub lat: i64,
    /// Longitude in granularity units.
    #[prost(sint64, required, tag = "9")]
    pub lon: i64,
}

/// Columnar nodes; ids and coordinates are delta coded.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DenseNodes {
    /// Id deltas.
    #[prost(sint64, repeated, tag = "1", packed = "true")]
    pub id: Vec<i64>,
    /// Latitude deltas.
    #[prost(sint64, repeated, tag = "8", packed = "true")]
    pub lat: Vec<i64>,
    /// Longitude deltas.
    #[prost(sint64, repeated, tag = "9", packed = "true")]
    pub lon: Vec<i64>,
    /// Key/value string indices for all nodes, each node closed by `0`.
    #[prost(int32, repeated, tag = "10", packed = "true")]
    pub keys_vals: Vec<i32>,
}

/// A way; node references are delta coded.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Way {
    /// Way id.
    #[prost(int64, required, tag = "1")]
    pub id: i64,
    /// Tag key string indices.
    #[prost(uint32, repeated, tag = "2", packed = "true")]
    pub keys: Vec<u32>,
    /// Tag value string indices.
    #[prost(uint32, repeated, tag = "3", packed = "true")]
    pub vals: Vec<u32>,
    /// Node reference deltas.
    #[prost(sint64, repeated, tag = "8", packed = "true")]
    pub refs: Vec<i64>,
}

/// A relation; member ids are delta coded.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Relation {
    /// Relation id.
    #[prost(int64, required, tag = "1")]
    pub id: i64,
    /// Tag key string indices.
    #[prost(uint32, repeated, tag = "2", packed = "true")]
    pub keys: Vec<u32>,
    /// Tag value string indices.
    #[prost(uint32, repeated, tag = "3", packed = "true")]
    pub vals: Vec<u32>,
    /// Member role string indices.
    #[prost(int32, repeated, tag = "8", packed = "true")]
    pub roles_sid: Vec<i32>,
    /// Member id deltas.
    #[prost(sint64, repeated, tag = "9", packed = "true")]
    pub memids: Vec<i64>,
    /// Member kinds.
    #[prost(enumeration = "MemberType", repeated, tag = "10", packed = "true")]
    pub types: Vec<i32>,
}

/// Kind of a relation member.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum MemberType {
    /// A node member.
    Node = 0,
    /// A way member.
    Way = 1,
    /// A relation member.
    Relation = 2,
}
