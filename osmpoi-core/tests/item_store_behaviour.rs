//! Both store backends answer the same call sequence identically.

use std::collections::BTreeSet;

use geo::Coord;
use osmpoi_core::{
    ElementId, ItemLookup, ItemStore, MemoryItemStore, OsmRecord, PoiLevel, RetainedCursor,
    SqliteItemStore,
};
use rstest::rstest;
use tempfile::TempDir;

enum Backend {
    Memory,
    Sqlite,
}

fn open(backend: &Backend, dir: &TempDir) -> Box<dyn ItemStore> {
    match backend {
        Backend::Memory => Box::new(MemoryItemStore::default()),
        // A low threshold exercises automatic flushing mid-sequence.
        Backend::Sqlite => Box::new(
            SqliteItemStore::open(dir.path().join("items.db"), 3).expect("open sqlite store"),
        ),
    }
}

fn retained_node(id: u64) -> OsmRecord {
    let mut record = OsmRecord::new(ElementId::node(id));
    record.level = Some(PoiLevel::Notable);
    record.name = Some(format!("Node {id}"));
    record.location = Some(Coord { x: 1.5, y: -2.25 });
    record
}

#[rstest]
#[case::memory(Backend::Memory)]
#[case::sqlite(Backend::Sqlite)]
fn records_round_trip_through_the_store(#[case] backend: Backend) {
    let dir = TempDir::new().expect("temp dir");
    let mut store = open(&backend, &dir);
    let mut way = OsmRecord::new(ElementId::way(9));
    way.node_ids = vec![1, 2, 3];

    store
        .store(vec![retained_node(1), way.clone()])
        .expect("store records");

    assert_eq!(
        store.retrieve(ElementId::node(1)).expect("lookup"),
        Some(retained_node(1))
    );
    assert_eq!(store.retrieve(ElementId::way(9)).expect("lookup"), Some(way));
    assert_eq!(store.retrieve(ElementId::relation(9)).expect("lookup"), None);
}

#[rstest]
#[case::memory(Backend::Memory)]
#[case::sqlite(Backend::Sqlite)]
fn cursor_visits_every_retained_id_once(#[case] backend: Backend) {
    let dir = TempDir::new().expect("temp dir");
    let mut store = open(&backend, &dir);
    let ids: Vec<ElementId> = (1..=7)
        .map(ElementId::node)
        .chain((1..=4).map(ElementId::way))
        .chain(std::iter::once(ElementId::relation(2)))
        .collect();
    store.store_retained(&ids).expect("store retained");
    store.store_retained(&ids[..2]).expect("duplicates are ignored");
    store.flush().expect("flush");

    let mut cursor = RetainedCursor::new(5);
    let mut seen = Vec::new();
    loop {
        let page = cursor.next_page(&mut *store).expect("page");
        if page.is_empty() {
            break;
        }
        assert!(page.len() <= 5);
        seen.extend(page);
    }

    assert_eq!(seen.len(), ids.len());
    let unique: BTreeSet<_> = seen.into_iter().collect();
    assert_eq!(unique, ids.into_iter().collect());
}

#[rstest]
#[case::memory(Backend::Memory)]
#[case::sqlite(Backend::Sqlite)]
fn node_membership_is_answered_in_input_order(#[case] backend: Backend) {
    let dir = TempDir::new().expect("temp dir");
    let mut store = open(&backend, &dir);
    store.store_node_ids(&[40, 10, 30]).expect("store ids");
    store.store_node_ids(&[20]).expect("store ids");

    let present = store
        .contains_node_ids(&[50, 40, 30, 20, 10, 0])
        .expect("membership");

    assert_eq!(present, [40, 30, 20, 10]);
}

#[rstest]
#[case::memory(Backend::Memory)]
#[case::sqlite(Backend::Sqlite)]
fn later_writes_replace_earlier_ones(#[case] backend: Backend) {
    let dir = TempDir::new().expect("temp dir");
    let mut store = open(&backend, &dir);
    let mut renamed = retained_node(3);
    renamed.name = Some("Renamed".into());

    store.store(vec![retained_node(3)]).expect("store");
    store.flush().expect("flush");
    store.store(vec![renamed.clone()]).expect("store");

    assert_eq!(
        store.retrieve(ElementId::node(3)).expect("lookup"),
        Some(renamed)
    );
}
