//! Reading and decoding of OSM PBF extracts.
//!
//! [`PbfReader`] walks the outer framing and yields raw blobs in file order.
//! [`decode_block`] turns one inflated data blob into absolute, tag-resolved
//! nodes, ways and relations. Framing faults end the file; decode faults only
//! cost the block they occur in.

mod decode;
mod ids;
mod proto;
mod reader;
#[cfg(any(test, feature = "test-support"))]
pub mod writer;

use std::io;

use thiserror::Error;

pub use decode::{
    BlockFilter, DecodedBlock, DecodedNode, DecodedRelation, DecodedWay, Member, decode_block,
    decode_header,
};
pub use reader::{BlobKind, PbfReadError, PbfReader, RawBlob};

/// Faults confined to a single blob.
#[derive(Debug, Error)]
pub enum BlockDecodeError {
    /// The protobuf payload was malformed.
    #[error("malformed protobuf: {0}")]
    Protobuf(#[from] prost::DecodeError),
    /// zlib inflation failed.
    #[error("failed to inflate blob")]
    Inflate(#[source] io::Error),
    /// Inflation produced more than the declared or permitted size.
    #[error("blob inflates past {limit} bytes")]
    InflateLimit {
        /// Largest accepted payload.
        limit: u64,
    },
    /// The blob used a compression scheme other than raw or zlib.
    #[error("unsupported blob compression")]
    UnsupportedCompression,
    /// The inflated payload did not match its declared size.
    #[error("blob declared {declared} bytes but inflated to {actual}")]
    SizeMismatch {
        /// Size recorded in the blob.
        declared: i32,
        /// Size actually produced.
        actual: usize,
    },
    /// A string-table reference fell outside the table.
    #[error("string index {index} out of range for table of {len}")]
    StringIndex {
        /// Offending index.
        index: i64,
        /// Number of entries in the table.
        len: usize,
    },
    /// Parallel lists had different lengths.
    #[error("{what} lists differ in length")]
    LengthMismatch {
        /// Which lists disagreed.
        what: &'static str,
    },
    /// Dense tags ran out before the node's terminator.
    #[error("dense tags truncated at node {node}")]
    TruncatedDenseTags {
        /// Position of the node within the dense group.
        node: usize,
    },
    /// Dense tags continued after the last node.
    #[error("{extra} dense tag entries left after the last node")]
    TrailingDenseTags {
        /// Number of unconsumed entries.
        extra: usize,
    },
    /// A relation member carried an unknown type code.
    #[error("unknown relation member type {value}")]
    UnknownMemberType {
        /// Raw type code.
        value: i32,
    },
    /// Coordinate scaling overflowed.
    #[error("coordinate overflow")]
    CoordinateOverflow,
}
