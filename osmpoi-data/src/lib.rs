//! Extract decoding, dependency resolution and indexing for `osmpoi`.
//!
//! Responsibilities:
//! - Read PBF framing and decode blocks into absolute, tag-resolved elements.
//! - Resolve the dependencies of retained elements in two passes.
//! - Sequence whole files and hand finished records to a sink.
//! - Provide a SQLite sink and file-backed diagnostics.
//!
//! Boundaries:
//! - Classification and geometry rules live in `osmpoi-core`.
//! - Command-line parsing and logger setup live in `osmpoi-cli`.
//!
//! Invariants:
//! - Files are processed sequentially, blocks in stream order.
//! - Per-block and per-record faults never abort a file.
//! - No global mutable state; every file gets its own store session.
#![forbid(unsafe_code)]

pub mod diagnostics;
pub mod pbf;
pub mod pipeline;
pub mod resolve;
pub mod sqlite;

pub use diagnostics::FileDiagnostics;
pub use pbf::{
    BlobKind, BlockDecodeError, BlockFilter, DecodedBlock, DecodedNode, DecodedRelation,
    DecodedWay, Member, PbfReadError, PbfReader, RawBlob, decode_block, decode_header,
};
pub use pipeline::{
    BatchSubmitter, IndexConfig, IndexReport, OsmIndexError, StoreBackend, SubmitStats,
    index_file, index_path,
};
pub use resolve::{ADMIN_CENTRE_ROLE, ResolveStats, Resolver};
pub use sqlite::{SqlitePoiSink, SqliteSinkError};
