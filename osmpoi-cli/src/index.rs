//! Index command implementation for the osmpoi CLI.

use camino::Utf8PathBuf;
use clap::Parser;
use log::info;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use osmpoi_core::{DiagnosticSink, LogDiagnostics};
use osmpoi_data::{
    FileDiagnostics, IndexConfig, IndexReport, SqlitePoiSink, StoreBackend, index_path,
};
use serde::{Deserialize, Serialize};

use crate::{
    ARG_BATCH_SIZE, ARG_DIAGNOSTICS_DIR, ARG_FLUSH_THRESHOLD, ARG_ITEM, ARG_MAX_DEPENDENCIES,
    ARG_NODES_ON_DISK, ARG_OUTPUT, ARG_PBF, ARG_STORE_PATH, CliError, ENV_PBF,
};

/// Database written when `--output` is not given.
const DEFAULT_OUTPUT: &str = "pois.db";

/// CLI arguments for the `index` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "index",
    long_about = "Read one PBF extract, or every extract under a directory, \
                 classify its elements, resolve their geometry and write the \
                 resulting POIs to a SQLite database. Options can come from \
                 CLI flags, configuration files, or environment variables.",
    about = "Index the POIs of OSM extracts"
)]
#[ortho_config(prefix = "OSMPOI")]
pub(crate) struct IndexArgs {
    /// PBF extract, or a directory scanned for `*.pbf` files.
    #[arg(long = ARG_PBF, value_name = "path")]
    #[serde(default)]
    pub(crate) pbf: Option<Utf8PathBuf>,
    /// SQLite database receiving the POIs.
    #[arg(long = ARG_OUTPUT, value_name = "path")]
    #[serde(default)]
    pub(crate) output: Option<Utf8PathBuf>,
    /// Keep the item store in a scratch SQLite database instead of memory.
    #[arg(long = ARG_STORE_PATH, value_name = "path")]
    #[serde(default)]
    pub(crate) store_path: Option<Utf8PathBuf>,
    /// POIs per sink submission.
    #[arg(long = ARG_BATCH_SIZE, value_name = "count")]
    #[serde(default)]
    pub(crate) batch_size: Option<usize>,
    /// Skip elements with more dependencies than this.
    #[arg(long = ARG_MAX_DEPENDENCIES, value_name = "count")]
    #[serde(default)]
    pub(crate) max_dependencies: Option<usize>,
    /// Pending writes before the disk-backed store flushes.
    #[arg(long = ARG_FLUSH_THRESHOLD, value_name = "count")]
    #[serde(default)]
    pub(crate) flush_threshold: Option<usize>,
    /// Directory receiving one diagnostic log per category.
    #[arg(long = ARG_DIAGNOSTICS_DIR, value_name = "dir")]
    #[serde(default)]
    pub(crate) diagnostics_dir: Option<Utf8PathBuf>,
    /// Index only this relation id.
    #[arg(long = ARG_ITEM, value_name = "relation id")]
    #[serde(default)]
    pub(crate) item: Option<u64>,
    /// Keep the dependent node-id set in the item store rather than memory.
    #[arg(
        long = ARG_NODES_ON_DISK,
        value_name = "bool",
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    #[serde(default)]
    pub(crate) nodes_on_disk: Option<bool>,
}

impl IndexArgs {
    pub(crate) fn into_settings(self) -> Result<IndexSettings, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        IndexSettings::try_from(merged)
    }
}

/// Resolved `index` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct IndexSettings {
    /// Extract file or directory.
    pub(crate) pbf: Utf8PathBuf,
    /// Output POI database.
    pub(crate) output: Utf8PathBuf,
    /// Diagnostic log directory, if any.
    pub(crate) diagnostics_dir: Option<Utf8PathBuf>,
    /// Pipeline tunables.
    pub(crate) index: IndexConfig,
}

impl IndexSettings {
    pub(crate) fn validate_sources(&self) -> Result<(), CliError> {
        match osmpoi_fs::file_is_file(&self.pbf) {
            Ok(_) => Ok(()),
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                Err(CliError::MissingSourcePath {
                    field: ARG_PBF,
                    path: self.pbf.clone(),
                })
            }
            Err(source) => Err(CliError::InspectSourcePath {
                field: ARG_PBF,
                path: self.pbf.clone(),
                source,
            }),
        }
    }
}

impl TryFrom<IndexArgs> for IndexSettings {
    type Error = CliError;

    fn try_from(args: IndexArgs) -> Result<Self, Self::Error> {
        let pbf = args.pbf.ok_or(CliError::MissingArgument {
            field: ARG_PBF,
            env: ENV_PBF,
        })?;
        let defaults = IndexConfig::default();
        let store = args
            .store_path
            .map_or(StoreBackend::Memory, |path| StoreBackend::Sqlite { path });
        let index = IndexConfig {
            sink_batch_size: positive(args.batch_size, defaults.sink_batch_size, ARG_BATCH_SIZE)?,
            max_dependencies: args.max_dependencies.unwrap_or(defaults.max_dependencies),
            store_flush_threshold: positive(
                args.flush_threshold,
                defaults.store_flush_threshold,
                ARG_FLUSH_THRESHOLD,
            )?,
            single_item: args.item,
            nodes_in_memory: !args.nodes_on_disk.unwrap_or(false),
            store,
            ..defaults
        };
        Ok(Self {
            pbf,
            output: args
                .output
                .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_OUTPUT)),
            diagnostics_dir: args.diagnostics_dir,
            index,
        })
    }
}

fn positive(value: Option<usize>, default: usize, field: &'static str) -> Result<usize, CliError> {
    match value {
        Some(0) => Err(CliError::ZeroSetting { field }),
        Some(value) => Ok(value),
        None => Ok(default),
    }
}

/// What an `index` run produced.
#[derive(Debug)]
pub(crate) struct IndexOutcome {
    /// Totals over every extract.
    pub(crate) report: IndexReport,
    /// Database the POIs were written to.
    pub(crate) output: Utf8PathBuf,
}

pub(crate) fn run_index(args: IndexArgs) -> Result<IndexOutcome, CliError> {
    let settings = args.into_settings()?;
    settings.validate_sources()?;
    execute(&settings)
}

/// Index with already resolved settings.
pub(crate) fn execute(settings: &IndexSettings) -> Result<IndexOutcome, CliError> {
    let mut sink = SqlitePoiSink::open(&settings.output)?;
    let report = match &settings.diagnostics_dir {
        Some(dir) => {
            let diagnostics =
                FileDiagnostics::create(dir).map_err(|source| CliError::Diagnostics {
                    path: dir.clone(),
                    source,
                })?;
            index_with(settings, &mut sink, &diagnostics)?
        }
        None => index_with(settings, &mut sink, &LogDiagnostics)?,
    };
    info!("indexing finished, POIs written to {}", sink.path());
    Ok(IndexOutcome {
        report,
        output: settings.output.clone(),
    })
}

fn index_with(
    settings: &IndexSettings,
    sink: &mut SqlitePoiSink,
    diagnostics: &dyn DiagnosticSink,
) -> Result<IndexReport, CliError> {
    if let StoreBackend::Sqlite { path } = &settings.index.store {
        info!("item store kept on disk at {path}");
    }
    Ok(index_path(&settings.pbf, &settings.index, sink, diagnostics)?)
}
