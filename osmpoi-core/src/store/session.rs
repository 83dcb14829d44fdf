//! Per-file store session with lookup accounting.

use std::cell::Cell;
use std::collections::HashSet;
use std::fmt;

use crate::{Diagnostic, DiagnosticSink, ElementId, OsmRecord};

use super::{ItemLookup, ItemStore, StoreError};

/// A store backend scoped to one input file.
///
/// The session counts lookups that find nothing and reports each one as a
/// [`Diagnostic::FailedLookup`]. It can also keep the node-id membership set
/// in memory while records live in a disk-backed backend, which keeps the
/// second pass's membership checks off the disk.
pub struct StoreSession<'a> {
    backend: Box<dyn ItemStore + 'a>,
    node_ids: Option<HashSet<u64>>,
    diagnostics: &'a dyn DiagnosticSink,
    failed_lookups: Cell<u64>,
}

impl fmt::Debug for StoreSession<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreSession")
            .field("nodes_in_memory", &self.node_ids.is_some())
            .field("failed_lookups", &self.failed_lookups.get())
            .finish_non_exhaustive()
    }
}

impl<'a> StoreSession<'a> {
    /// Open a session over `backend`.
    pub fn new(backend: Box<dyn ItemStore + 'a>, diagnostics: &'a dyn DiagnosticSink) -> Self {
        Self {
            backend,
            node_ids: None,
            diagnostics,
            failed_lookups: Cell::new(0),
        }
    }

    /// Keep the node-id membership set in memory instead of the backend.
    #[must_use]
    pub fn with_node_ids_in_memory(mut self) -> Self {
        self.node_ids = Some(HashSet::new());
        self
    }

    /// Number of lookups that found nothing so far.
    #[must_use]
    pub fn failed_lookups(&self) -> u64 {
        self.failed_lookups.get()
    }
}

impl ItemLookup for StoreSession<'_> {
    fn retrieve(&self, id: ElementId) -> Result<Option<OsmRecord>, StoreError> {
        let record = self.backend.retrieve(id)?;
        if record.is_none() {
            self.failed_lookups.set(self.failed_lookups.get() + 1);
            self.diagnostics.record(&Diagnostic::FailedLookup { id });
        }
        Ok(record)
    }
}

impl ItemStore for StoreSession<'_> {
    fn store(&mut self, records: Vec<OsmRecord>) -> Result<(), StoreError> {
        self.backend.store(records)
    }

    fn store_retained(&mut self, ids: &[ElementId]) -> Result<(), StoreError> {
        self.backend.store_retained(ids)
    }

    fn retained_page(
        &mut self,
        after: Option<ElementId>,
        limit: usize,
    ) -> Result<Vec<ElementId>, StoreError> {
        self.backend.retained_page(after, limit)
    }

    fn store_node_ids(&mut self, ids: &[u64]) -> Result<(), StoreError> {
        match &mut self.node_ids {
            Some(set) => {
                set.extend(ids.iter().copied());
                Ok(())
            }
            None => self.backend.store_node_ids(ids),
        }
    }

    fn contains_node_ids(&self, ids: &[u64]) -> Result<Vec<u64>, StoreError> {
        match &self.node_ids {
            Some(set) => Ok(ids.iter().copied().filter(|id| set.contains(id)).collect()),
            None => self.backend.contains_node_ids(ids),
        }
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        self.backend.flush()
    }

    fn close(&mut self) -> Result<(), StoreError> {
        if let Some(set) = &mut self.node_ids {
            set.clear();
        }
        self.backend.close()
    }
}

/// Resumable enumeration of the retained-id index.
///
/// # Examples
///
/// ```
/// use osmpoi_core::{ElementId, ItemStore, MemoryItemStore, RetainedCursor};
///
/// # fn main() -> Result<(), osmpoi_core::StoreError> {
/// let mut store = MemoryItemStore::default();
/// store.store_retained(&[ElementId::node(1), ElementId::node(2), ElementId::node(3)])?;
///
/// let mut cursor = RetainedCursor::new(2);
/// let mut seen = Vec::new();
/// loop {
///     let page = cursor.next_page(&mut store)?;
///     if page.is_empty() {
///         break;
///     }
///     seen.extend(page);
/// }
/// assert_eq!(seen.len(), 3);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RetainedCursor {
    after: Option<ElementId>,
    page_size: usize,
    exhausted: bool,
}

impl RetainedCursor {
    /// Start a fresh enumeration returning `page_size` ids per page.
    #[must_use]
    pub fn new(page_size: usize) -> Self {
        Self {
            after: None,
            page_size: page_size.max(1),
            exhausted: false,
        }
    }

    /// Fetch the next page; an empty page means enumeration is complete.
    pub fn next_page<S>(&mut self, store: &mut S) -> Result<Vec<ElementId>, StoreError>
    where
        S: ItemStore + ?Sized,
    {
        if self.exhausted {
            return Ok(Vec::new());
        }
        let page = store.retained_page(self.after, self.page_size)?;
        match page.last() {
            Some(last) => self.after = Some(*last),
            None => self.exhausted = true,
        }
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryItemStore;
    use crate::test_support::RecordingDiagnostics;
    use rstest::rstest;

    #[rstest]
    fn failed_lookups_are_counted_and_reported() {
        let diagnostics = RecordingDiagnostics::default();
        let session = StoreSession::new(Box::new(MemoryItemStore::default()), &diagnostics);

        let found = session.retrieve(ElementId::node(4)).expect("lookup");

        assert!(found.is_none());
        assert_eq!(session.failed_lookups(), 1);
        assert_eq!(
            diagnostics.events(),
            [Diagnostic::FailedLookup {
                id: ElementId::node(4)
            }]
        );
    }

    #[rstest]
    #[case(false)]
    #[case(true)]
    fn membership_checks_preserve_input_order(#[case] in_memory: bool) {
        let diagnostics = RecordingDiagnostics::default();
        let mut session = StoreSession::new(Box::new(MemoryItemStore::default()), &diagnostics);
        if in_memory {
            session = session.with_node_ids_in_memory();
        }
        session.store_node_ids(&[5, 1, 3]).expect("store ids");

        let present = session
            .contains_node_ids(&[1, 2, 3, 4, 5])
            .expect("contains");

        assert_eq!(present, [1, 3, 5]);
    }
}
