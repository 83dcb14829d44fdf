//! Test helpers for composing index CLI inputs and layered overrides.

use super::*;
use crate::index::IndexSettings;
use camino::{Utf8Path, Utf8PathBuf};
use osmpoi_core::ElementKind;
use osmpoi_data::pbf::writer::{PbfWriter, TestNode, TestRelation, TestWay};
use rusqlite::Connection;
use std::fs;
use tempfile::TempDir;

#[derive(Debug, Clone, Default)]
pub(super) struct LayerOverrides {
    pub(super) pbf: Option<Utf8PathBuf>,
    pub(super) batch_size: Option<usize>,
}

/// A temporary directory holding one small extract.
#[derive(Debug)]
pub(super) struct Workspace {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 workspace");
        let workspace = Self { _dir: dir, root };
        fs::write(workspace.extract(), sample_extract()).expect("write extract");
        workspace
    }

    pub(super) fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub(super) fn extract(&self) -> Utf8PathBuf {
        self.root.join("sample.osm.pbf")
    }

    pub(super) fn output(&self) -> Utf8PathBuf {
        self.root.join("out").join("pois.db")
    }
}

/// A museum node, a park way and an untagged route relation.
fn sample_extract() -> Vec<u8> {
    PbfWriter::zlib()
        .header(None)
        .dense_nodes(&[
            TestNode::new(1, 0.0, 0.0),
            TestNode::new(2, 1.0, 0.0),
            TestNode::new(3, 1.0, 1.0),
            TestNode::new(4, 3.0, 3.0)
                .tag("tourism", "museum")
                .tag("name", "Gallery"),
        ])
        .ways(&[TestWay::new(10, &[1, 2, 3, 1])
            .tag("leisure", "park")
            .tag("name", "Green")])
        .relations(&[TestRelation::new(20)
            .member(ElementKind::Way, 10, "")
            .tag("type", "route")])
        .finish()
        .expect("encode extract")
}

pub(super) fn count_pois(path: &Utf8Path) -> i64 {
    let conn = Connection::open(path.as_std_path()).expect("open pois.db");
    conn.query_row("SELECT COUNT(*) FROM pois", [], |row| row.get(0))
        .expect("count pois")
}

pub(super) fn merge_layers(
    mut cli_args: IndexArgs,
    file_layer: Option<LayerOverrides>,
    env_layer: Option<LayerOverrides>,
) -> Result<IndexSettings, CliError> {
    merge_field(
        &mut cli_args.pbf,
        extract_field(&env_layer, |layer| &layer.pbf),
        extract_field(&file_layer, |layer| &layer.pbf),
    );
    merge_field(
        &mut cli_args.batch_size,
        extract_field(&env_layer, |layer| &layer.batch_size),
        extract_field(&file_layer, |layer| &layer.batch_size),
    );
    IndexSettings::try_from(cli_args)
}

fn merge_field<T: Clone>(target: &mut Option<T>, env_value: Option<T>, file_value: Option<T>) {
    if target.is_none()
        && let Some(value) = env_value.or(file_value)
    {
        *target = Some(value);
    }
}

fn extract_field<T: Clone>(
    layer: &Option<LayerOverrides>,
    accessor: fn(&LayerOverrides) -> &Option<T>,
) -> Option<T> {
    layer.as_ref().and_then(|entry| accessor(entry).clone())
}
