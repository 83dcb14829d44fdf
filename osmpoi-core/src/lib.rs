//! Core domain types for the OSM point-of-interest indexer.
//!
//! Responsibilities:
//! - Classify tag sets into retained, levelled points of interest.
//! - Persist intermediate elements through the [`ItemStore`] seam.
//! - Assemble node, way and relation geometry into WKT.
//!
//! Boundaries:
//! - No PBF decoding or file handling (lives in `osmpoi-data`).
//! - Observability flows through [`DiagnosticSink`]; nothing here writes
//!   files or configures loggers.
//!
//! Invariants:
//! - Classification is pure and deterministic.
//! - Store backends behave identically for the same sequence of calls.

#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod classify;
pub mod diagnostics;
pub mod element;
pub mod geometry;
pub mod record;
pub mod sink;
pub mod store;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use classify::{Classification, classify, is_name_key, name_from_tags};
pub use diagnostics::{Diagnostic, DiagnosticCategory, DiagnosticSink, LogDiagnostics};
pub use element::{ElementId, ElementIdError, ElementKind};
pub use geometry::{
    InvalidGeometry, RelationGeometry, ResolvedGeometry, assemble_relation, assemble_way,
    node_geometry,
};
pub use record::{OsmRecord, PoiLevel, Tags};
pub use sink::{GeoPoint, PoiRecord, PoiSink, PoiTag, RejectedRecord, SinkError, SinkReport};
#[cfg(feature = "store-sqlite")]
#[cfg_attr(docsrs, doc(cfg(feature = "store-sqlite")))]
pub use store::SqliteItemStore;
pub use store::{
    DEFAULT_RETAINED_PAGE_SIZE, ItemLookup, ItemStore, MemoryItemStore, RetainedCursor,
    StoreError, StoreSession,
};
