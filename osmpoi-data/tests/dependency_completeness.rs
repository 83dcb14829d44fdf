//! Every node a retained way or relation depends on is in the store after
//! both passes, whatever the backend.

use std::collections::BTreeSet;

use osmpoi_core::test_support::RecordingDiagnostics;
use osmpoi_core::{
    ElementId, ElementKind, ItemLookup, ItemStore, MemoryItemStore, SqliteItemStore, StoreSession,
};
use osmpoi_data::pbf::writer::{PbfWriter, TestNode, TestRelation, TestWay};
use osmpoi_data::{BlobKind, BlockFilter, PbfReader, Resolver, decode_block};
use proptest::prelude::*;
use rstest::rstest;
use tempfile::TempDir;

const NODE_COUNT: u64 = 40;
const FIRST_WAY: u64 = 100;
const FIRST_RELATION: u64 = 500;

/// Ways as (node refs, retained) and relations as (way indexes, retained).
#[derive(Debug, Clone)]
struct Plan {
    ways: Vec<(Vec<u64>, bool)>,
    relations: Vec<(Vec<usize>, bool)>,
}

impl Plan {
    fn way_id(&self, index: usize) -> u64 {
        FIRST_WAY + (index % self.ways.len()) as u64
    }

    fn encode(&self) -> Vec<u8> {
        let nodes: Vec<TestNode> = (1..=NODE_COUNT)
            .map(|id| TestNode::new(id as i64, 0.01 * id as f64, 0.02 * id as f64))
            .collect();
        let ways: Vec<TestWay> = self
            .ways
            .iter()
            .enumerate()
            .map(|(index, (refs, retained))| {
                let refs: Vec<i64> = refs.iter().map(|id| *id as i64).collect();
                let way = TestWay::new((FIRST_WAY + index as u64) as i64, &refs);
                if *retained {
                    way.tag("tourism", "museum").tag("name", &format!("Way {index}"))
                } else {
                    way.tag("highway", "path")
                }
            })
            .collect();
        let relations: Vec<TestRelation> = self
            .relations
            .iter()
            .enumerate()
            .map(|(index, (members, retained))| {
                let relation = members.iter().fold(
                    TestRelation::new((FIRST_RELATION + index as u64) as i64),
                    |relation, member| {
                        relation.member(ElementKind::Way, self.way_id(*member) as i64, "outer")
                    },
                );
                if *retained {
                    relation
                        .tag("historic", "castle")
                        .tag("name", &format!("Relation {index}"))
                        .tag("type", "multipolygon")
                } else {
                    relation.tag("type", "route")
                }
            })
            .collect();
        PbfWriter::zlib()
            .header(None)
            .dense_nodes(&nodes)
            .ways(&ways)
            .relations(&relations)
            .finish()
            .expect("encode extract")
    }

    /// Nodes some retained element needs.
    fn required_nodes(&self) -> BTreeSet<u64> {
        let mut required = BTreeSet::new();
        for (refs, retained) in &self.ways {
            if *retained {
                required.extend(refs.iter().copied());
            }
        }
        for (members, retained) in &self.relations {
            if *retained {
                for member in members {
                    let (refs, _) = &self.ways[member % self.ways.len()];
                    required.extend(refs.iter().copied());
                }
            }
        }
        required
    }
}

fn resolve(bytes: &[u8], session: &mut StoreSession<'_>) {
    let mut resolver = Resolver::new(session).with_page_size(3);
    for (filter, first) in [
        (BlockFilter::WaysAndRelations, true),
        (BlockFilter::Nodes, false),
    ] {
        for blob in PbfReader::new(bytes) {
            let blob = blob.expect("intact framing");
            if blob.kind != BlobKind::Data {
                continue;
            }
            let block = decode_block(&blob.inflate().expect("inflate"), filter).expect("decode");
            if first {
                resolver.first_pass_block(block).expect("first pass");
            } else {
                resolver.second_pass_block(block).expect("second pass");
            }
        }
        if first {
            resolver.finish_first_pass().expect("finish first pass");
        } else {
            resolver.finish_second_pass().expect("finish second pass");
        }
    }
}

fn stored_nodes(session: &StoreSession<'_>) -> BTreeSet<u64> {
    (1..=NODE_COUNT)
        .filter(|id| {
            session
                .retrieve(ElementId::node(*id))
                .expect("lookup")
                .is_some()
        })
        .collect()
}

fn check(plan: &Plan, backend: Box<dyn ItemStore>) {
    let diagnostics = RecordingDiagnostics::default();
    let mut session = StoreSession::new(backend, &diagnostics);
    resolve(&plan.encode(), &mut session);

    for (index, _) in plan.ways.iter().enumerate() {
        let id = ElementId::way(FIRST_WAY + index as u64);
        assert!(session.retrieve(id).expect("lookup").is_some(), "{id} missing");
    }
    assert_eq!(stored_nodes(&session), plan.required_nodes());
    session.close().expect("close session");
}

fn fixed_plan() -> Plan {
    Plan {
        ways: vec![
            (vec![1, 2, 3, 1], true),
            (vec![4, 5, 6], false),
            (vec![6, 7, 4], false),
            (vec![8, 9], false),
        ],
        relations: vec![(vec![1, 2], true), (vec![3], false)],
    }
}

#[rstest]
fn memory_store_keeps_only_the_required_nodes() {
    let plan = fixed_plan();
    let diagnostics = RecordingDiagnostics::default();
    let mut session = StoreSession::new(Box::new(MemoryItemStore::default()), &diagnostics)
        .with_node_ids_in_memory();
    resolve(&plan.encode(), &mut session);

    assert_eq!(session.failed_lookups(), 0);
    assert_eq!(stored_nodes(&session), BTreeSet::from([1, 2, 3, 4, 5, 6, 7]));
}

#[rstest]
#[case::flush_often(2)]
#[case::flush_rarely(1_000)]
fn sqlite_store_keeps_only_the_required_nodes(#[case] flush_threshold: usize) {
    let dir = TempDir::new().expect("temp dir");
    let store = SqliteItemStore::open(dir.path().join("items.db"), flush_threshold)
        .expect("open sqlite store");
    check(&fixed_plan(), Box::new(store));
}

fn plan() -> impl Strategy<Value = Plan> {
    let ways = prop::collection::vec(
        (prop::collection::vec(1..=NODE_COUNT, 2..6), any::<bool>()),
        1..10,
    );
    let relations = prop::collection::vec(
        (prop::collection::vec(0_usize..10, 1..4), any::<bool>()),
        0..4,
    );
    (ways, relations).prop_map(|(ways, relations)| Plan { ways, relations })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn retained_elements_never_miss_a_node(plan in plan()) {
        check(&plan, Box::new(MemoryItemStore::default()));
    }
}
