//! Facade crate for the osmpoi indexer.
//!
//! This crate re-exports the core domain types and exposes the SQLite item
//! store and the extract pipeline behind feature flags.

#![forbid(unsafe_code)]

pub use osmpoi_core::{
    Classification, Diagnostic, DiagnosticCategory, DiagnosticSink, ElementId, ElementKind,
    GeoPoint, ItemLookup, ItemStore, LogDiagnostics, MemoryItemStore, OsmRecord, PoiLevel,
    PoiRecord, PoiSink, PoiTag, RelationGeometry, ResolvedGeometry, SinkError, SinkReport,
    StoreError, StoreSession, Tags, assemble_relation, classify, name_from_tags,
};

#[cfg(feature = "store-sqlite")]
pub use osmpoi_core::SqliteItemStore;

#[cfg(feature = "pipeline")]
pub use osmpoi_data::{
    FileDiagnostics, IndexConfig, IndexReport, OsmIndexError, SqlitePoiSink, StoreBackend,
    index_file, index_path,
};

#[cfg(feature = "test-support")]
pub use osmpoi_core::test_support;
