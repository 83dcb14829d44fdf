//! Per-file storage of OSM records and the indexes the resolver builds.
//!
//! An [`ItemStore`] owns three pieces of state for one input file: the
//! records themselves, the retained-id index, and the set of node ids some
//! retained element depends on. Two interchangeable backends exist:
//! [`MemoryItemStore`] and, behind the `store-sqlite` feature,
//! [`SqliteItemStore`].

mod memory;
mod session;
#[cfg(feature = "store-sqlite")]
mod sqlite;

use std::path::PathBuf;

use thiserror::Error;

use crate::{ElementId, OsmRecord};

pub use memory::MemoryItemStore;
pub use session::{RetainedCursor, StoreSession};
#[cfg(feature = "store-sqlite")]
pub use sqlite::SqliteItemStore;

/// Default number of retained ids returned per page.
pub const DEFAULT_RETAINED_PAGE_SIZE: usize = 100;

/// Errors raised by store backends.
///
/// A missing record is not an error; lookups return `Ok(None)`.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Preparing the on-disk location failed.
    #[error("failed to prepare item store at {path:?}")]
    Io {
        /// Location of the store.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The store was used after [`ItemStore::close`].
    #[error("item store used after close")]
    Closed,
    /// A SQLite operation failed.
    #[cfg(feature = "store-sqlite")]
    #[error("item store {operation} failed")]
    Sqlite {
        /// Operation being performed.
        operation: &'static str,
        /// Source error returned by `rusqlite`.
        #[source]
        source: rusqlite::Error,
    },
    /// Encoding a record for storage failed.
    #[cfg(feature = "serde")]
    #[error("failed to encode {id}")]
    Encode {
        /// Record being encoded.
        id: ElementId,
        /// Source error returned by `bincode`.
        #[source]
        source: bincode::Error,
    },
    /// Decoding a stored value failed.
    #[cfg(feature = "serde")]
    #[error("failed to decode stored value for {key}")]
    Decode {
        /// Key of the corrupt entry.
        key: String,
        /// Source error returned by `bincode`.
        #[source]
        source: bincode::Error,
    },
    /// A stored key did not hold a valid element identifier.
    #[error("stored key {key} does not hold an element identifier")]
    InvalidKey {
        /// Offending key.
        key: String,
    },
}

/// Read access to stored records.
pub trait ItemLookup {
    /// Fetch the record for `id`, or `None` when it was never stored.
    fn retrieve(&self, id: ElementId) -> Result<Option<OsmRecord>, StoreError>;
}

impl<T: ItemLookup + ?Sized> ItemLookup for &T {
    fn retrieve(&self, id: ElementId) -> Result<Option<OsmRecord>, StoreError> {
        (**self).retrieve(id)
    }
}

/// Storage backend for one input file.
///
/// Writes may be buffered; [`ItemStore::flush`] makes every prior write
/// visible to [`ItemStore::retained_page`]. Lookups through
/// [`ItemLookup::retrieve`] and [`ItemStore::contains_node_ids`] always see
/// buffered writes.
///
/// # Examples
///
/// ```
/// use osmpoi_core::{ElementId, ItemLookup, ItemStore, MemoryItemStore, OsmRecord};
///
/// # fn main() -> Result<(), osmpoi_core::StoreError> {
/// let mut store = MemoryItemStore::default();
/// store.store(vec![OsmRecord::new(ElementId::way(7))])?;
/// store.store_retained(&[ElementId::way(7)])?;
/// store.flush()?;
/// assert!(store.retrieve(ElementId::way(7))?.is_some());
/// assert_eq!(store.retained_page(None, 10)?, [ElementId::way(7)]);
/// # Ok(())
/// # }
/// ```
pub trait ItemStore: ItemLookup {
    /// Store records, replacing any with the same identifier.
    fn store(&mut self, records: Vec<OsmRecord>) -> Result<(), StoreError>;

    /// Add identifiers to the retained-id index.
    fn store_retained(&mut self, ids: &[ElementId]) -> Result<(), StoreError>;

    /// Return up to `limit` retained ids ordered after `after`.
    ///
    /// Pass `None` for the first page and the last id of the previous page
    /// afterwards. An empty page signals that enumeration is complete.
    fn retained_page(
        &mut self,
        after: Option<ElementId>,
        limit: usize,
    ) -> Result<Vec<ElementId>, StoreError>;

    /// Add node ids to the dependency membership set.
    fn store_node_ids(&mut self, ids: &[u64]) -> Result<(), StoreError>;

    /// Return the subset of `ids` present in the membership set, in input
    /// order.
    fn contains_node_ids(&self, ids: &[u64]) -> Result<Vec<u64>, StoreError>;

    /// Persist buffered writes.
    fn flush(&mut self) -> Result<(), StoreError>;

    /// Discard all state. The store must not be used afterwards.
    fn close(&mut self) -> Result<(), StoreError>;
}
