//! In-memory item store backed by standard collections.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::ops::Bound;

use crate::{ElementId, OsmRecord};

use super::{ItemLookup, ItemStore, StoreError};

/// Item store that keeps everything in process memory.
#[derive(Debug, Default)]
pub struct MemoryItemStore {
    items: HashMap<ElementId, OsmRecord>,
    retained: BTreeSet<ElementId>,
    node_ids: HashSet<u64>,
}

impl MemoryItemStore {
    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether no records are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl ItemLookup for MemoryItemStore {
    fn retrieve(&self, id: ElementId) -> Result<Option<OsmRecord>, StoreError> {
        Ok(self.items.get(&id).cloned())
    }
}

impl ItemStore for MemoryItemStore {
    fn store(&mut self, records: Vec<OsmRecord>) -> Result<(), StoreError> {
        self.items
            .extend(records.into_iter().map(|record| (record.id, record)));
        Ok(())
    }

    fn store_retained(&mut self, ids: &[ElementId]) -> Result<(), StoreError> {
        self.retained.extend(ids.iter().copied());
        Ok(())
    }

    fn retained_page(
        &mut self,
        after: Option<ElementId>,
        limit: usize,
    ) -> Result<Vec<ElementId>, StoreError> {
        let lower = after.map_or(Bound::Unbounded, Bound::Excluded);
        Ok(self
            .retained
            .range((lower, Bound::Unbounded))
            .take(limit)
            .copied()
            .collect())
    }

    fn store_node_ids(&mut self, ids: &[u64]) -> Result<(), StoreError> {
        self.node_ids.extend(ids.iter().copied());
        Ok(())
    }

    fn contains_node_ids(&self, ids: &[u64]) -> Result<Vec<u64>, StoreError> {
        Ok(ids
            .iter()
            .copied()
            .filter(|id| self.node_ids.contains(id))
            .collect())
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        Ok(())
    }

    fn close(&mut self) -> Result<(), StoreError> {
        self.items.clear();
        self.retained.clear();
        self.node_ids.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn store() -> MemoryItemStore {
        let mut store = MemoryItemStore::default();
        let ids: Vec<_> = (1..=5).map(ElementId::way).collect();
        store
            .store(ids.iter().copied().map(OsmRecord::new).collect())
            .expect("store records");
        store.store_retained(&ids).expect("store retained");
        store
    }

    #[rstest]
    fn pages_resume_after_the_cursor(mut store: MemoryItemStore) {
        let first = store.retained_page(None, 2).expect("first page");
        assert_eq!(first, [ElementId::way(1), ElementId::way(2)]);

        let second = store
            .retained_page(first.last().copied(), 2)
            .expect("second page");
        assert_eq!(second, [ElementId::way(3), ElementId::way(4)]);

        let third = store
            .retained_page(second.last().copied(), 2)
            .expect("third page");
        assert_eq!(third, [ElementId::way(5)]);

        let done = store
            .retained_page(third.last().copied(), 2)
            .expect("final page");
        assert!(done.is_empty());
    }

    #[rstest]
    fn close_discards_everything(mut store: MemoryItemStore) {
        store.store_node_ids(&[9]).expect("store node ids");
        store.close().expect("close");
        assert!(store.is_empty());
        assert!(store.retained_page(None, 10).expect("page").is_empty());
        assert!(store.contains_node_ids(&[9]).expect("contains").is_empty());
    }
}
