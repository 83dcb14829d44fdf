//! Synthetic extracts shared by the integration tests.

use camino::Utf8PathBuf;
use geo::{Coord, Rect};
use osmpoi_core::ElementKind;
use osmpoi_data::pbf::writer::{PbfWriter, TestNode, TestRelation, TestWay};
use tempfile::TempDir;

/// Shape of the sample extract.
#[derive(Debug, Clone, Copy, Default)]
pub struct SampleOptions {
    /// Insert an undecodable data block straight after the header.
    pub corrupt_block: bool,
    /// Cut the final blob short.
    pub truncated: bool,
    /// Add relation 41, a named route whose two ways never meet.
    pub broken_route: bool,
}

/// A museum node, a park way and a castle multipolygon with an admin centre.
///
/// Node 6 is untagged and unreferenced, so it never reaches the store.
pub fn sample_extract(options: SampleOptions) -> Vec<u8> {
    let bbox = Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 10.0, y: 10.0 });
    let mut writer = PbfWriter::zlib().header(Some(bbox));
    if options.corrupt_block {
        writer = writer.corrupt_data();
    }
    let mut ways = vec![
        TestWay::new(20, &[1, 2, 3, 4, 1])
            .tag("leisure", "park")
            .tag("name", "Green"),
        TestWay::new(30, &[11, 12, 13]),
        TestWay::new(31, &[13, 14, 11]),
    ];
    let mut relations = vec![
        TestRelation::new(40)
            .member(ElementKind::Way, 30, "outer")
            .member(ElementKind::Way, 31, "outer")
            .member(ElementKind::Node, 15, "admin_centre")
            .tag("historic", "castle")
            .tag("name", "Keep")
            .tag("type", "multipolygon"),
    ];
    if options.broken_route {
        ways.push(TestWay::new(32, &[1, 2]));
        ways.push(TestWay::new(33, &[13, 14]));
        relations.push(
            TestRelation::new(41)
                .member(ElementKind::Way, 32, "")
                .member(ElementKind::Way, 33, "")
                .tag("historic", "castle")
                .tag("name", "Wall")
                .tag("type", "route"),
        );
    }
    let mut bytes = writer
        .dense_nodes(&[
            TestNode::new(1, 0.0, 0.0),
            TestNode::new(2, 2.0, 0.0),
            TestNode::new(3, 2.0, 1.0),
            TestNode::new(4, 0.0, 1.0),
            TestNode::new(5, 5.0, 5.0)
                .tag("tourism", "museum")
                .tag("name", "Gallery"),
            TestNode::new(6, 9.0, 9.0),
            TestNode::new(11, 4.0, 0.0),
            TestNode::new(12, 6.0, 0.0),
            TestNode::new(13, 6.0, 2.0),
            TestNode::new(14, 4.0, 2.0),
            TestNode::new(15, 5.5, 1.5),
        ])
        .ways(&ways)
        .relations(&relations)
        .finish()
        .expect("encode sample extract");
    if options.truncated {
        bytes.truncate(bytes.len() - 5);
    }
    bytes
}

/// Write `bytes` to `name` inside `dir`.
pub fn write_extract(dir: &TempDir, name: &str, bytes: &[u8]) -> Utf8PathBuf {
    let path = Utf8PathBuf::from_path_buf(dir.path().join(name)).expect("utf-8 temp dir");
    std::fs::write(&path, bytes).expect("write extract");
    path
}
