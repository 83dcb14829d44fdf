//! File-level sequencing: two decode passes, then resolution and submission.
//!
//! Each extract gets its own [`StoreSession`], opened before the first pass
//! and closed after the last record is submitted. Blocks that fail to decode
//! are reported once and skipped; broken framing ends the file with
//! [`OsmIndexError::Read`].

mod emit;
mod report;
mod submit;

use std::collections::BTreeSet;
use std::error::Error as StdError;
use std::io::{self, BufReader};

use camino::{Utf8Path, Utf8PathBuf};
use log::{info, warn};
use osmpoi_core::{
    DEFAULT_RETAINED_PAGE_SIZE, Diagnostic, DiagnosticSink, ItemStore, MemoryItemStore, PoiSink,
    SqliteItemStore, StoreError, StoreSession,
};
use thiserror::Error;

use crate::pbf::{
    BlobKind, BlockFilter, DecodedBlock, PbfReadError, PbfReader, decode_block, decode_header,
};
use crate::resolve::Resolver;

pub use report::IndexReport;
pub use submit::{BatchSubmitter, SubmitStats};

/// Where a file's records live while it is being indexed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StoreBackend {
    /// Hash maps in memory.
    #[default]
    Memory,
    /// A scratch SQLite database, destroyed on open and close.
    Sqlite {
        /// Database location.
        path: Utf8PathBuf,
    },
}

/// Tunables for [`index_file`] and [`index_path`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexConfig {
    /// Records per sink submission.
    pub sink_batch_size: usize,
    /// Whole-batch retries while the sink is unavailable.
    pub sink_retries: u32,
    /// Elements with more dependencies than this are skipped.
    pub max_dependencies: usize,
    /// Pending writes before the disk store flushes.
    pub store_flush_threshold: usize,
    /// Retained ids fetched per page.
    pub retained_page_size: usize,
    /// Retain only this relation.
    pub single_item: Option<u64>,
    /// Records between progress lines; zero disables them.
    pub progress_interval: u64,
    /// Item store backend.
    pub store: StoreBackend,
    /// Keep the node-id membership set in memory with a disk backend.
    pub nodes_in_memory: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            sink_batch_size: 200,
            sink_retries: 2,
            max_dependencies: 5_000,
            store_flush_threshold: 8_000,
            retained_page_size: DEFAULT_RETAINED_PAGE_SIZE,
            single_item: None,
            progress_interval: 100_000,
            store: StoreBackend::Memory,
            nodes_in_memory: true,
        }
    }
}

/// Errors that abort an indexing run.
#[derive(Debug, Error)]
pub enum OsmIndexError {
    /// The extract could not be opened.
    #[error("failed to open extract {path}")]
    Open {
        /// Extract path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The input path could not be listed.
    #[error("failed to list extracts under {path}")]
    List {
        /// Input path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The rest of the extract became unreachable.
    #[error("failed to read extract {path}")]
    Read {
        /// Extract path.
        path: Utf8PathBuf,
        /// Framing failure.
        #[source]
        source: PbfReadError,
    },
    /// The item store failed.
    #[error("item store failed while indexing {path}")]
    Store {
        /// Extract path.
        path: Utf8PathBuf,
        /// Store failure.
        #[source]
        source: StoreError,
    },
}

/// Index every extract under `path` in file-name order.
///
/// # Examples
/// ```no_run
/// use camino::Utf8Path;
/// use osmpoi_core::LogDiagnostics;
/// use osmpoi_data::{IndexConfig, SqlitePoiSink, index_path};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut sink = SqlitePoiSink::open(Utf8Path::new("pois.db"))?;
/// let report = index_path(
///     Utf8Path::new("extracts"),
///     &IndexConfig::default(),
///     &mut sink,
///     &LogDiagnostics,
/// )?;
/// println!("{report}");
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns [`OsmIndexError`] when the input cannot be listed or any file
/// fails as described for [`index_file`].
pub fn index_path<S>(
    path: &Utf8Path,
    config: &IndexConfig,
    sink: &mut S,
    diagnostics: &dyn DiagnosticSink,
) -> Result<IndexReport, OsmIndexError>
where
    S: PoiSink + ?Sized,
{
    let files = osmpoi_fs::list_extract_files(path).map_err(|source| OsmIndexError::List {
        path: path.to_path_buf(),
        source,
    })?;
    if files.is_empty() {
        warn!("no extract files found under {path}");
    }

    let mut total = IndexReport::default();
    for file in &files {
        info!("parsing {file}");
        total += index_file(file, config, &mut *sink, diagnostics)?;
    }
    if files.len() > 1 {
        info!("run complete: {total}");
    }
    Ok(total)
}

/// Index one extract.
///
/// # Errors
///
/// Returns [`OsmIndexError`] when the file cannot be opened, its framing
/// breaks, or the item store fails. Sink failures and corrupt blocks are
/// reported through `diagnostics` instead.
pub fn index_file<S>(
    path: &Utf8Path,
    config: &IndexConfig,
    sink: &mut S,
    diagnostics: &dyn DiagnosticSink,
) -> Result<IndexReport, OsmIndexError>
where
    S: PoiSink + ?Sized,
{
    let backend = open_backend(config).map_err(|source| store_error(path, source))?;
    let mut session = StoreSession::new(backend, diagnostics);
    if config.nodes_in_memory {
        session = session.with_node_ids_in_memory();
    }

    let outcome = run(path, config, &mut session, sink, diagnostics);
    let closed = session.close();
    let report = outcome?;
    closed.map_err(|source| store_error(path, source))?;
    info!("{path}: {report}");
    Ok(report)
}

fn open_backend(config: &IndexConfig) -> Result<Box<dyn ItemStore>, StoreError> {
    Ok(match &config.store {
        StoreBackend::Memory => Box::new(MemoryItemStore::default()),
        StoreBackend::Sqlite { path } => Box::new(SqliteItemStore::open(
            path.as_std_path(),
            config.store_flush_threshold,
        )?),
    })
}

fn run<S>(
    path: &Utf8Path,
    config: &IndexConfig,
    session: &mut StoreSession<'_>,
    sink: &mut S,
    diagnostics: &dyn DiagnosticSink,
) -> Result<IndexReport, OsmIndexError>
where
    S: PoiSink + ?Sized,
{
    let mut report = IndexReport {
        files: 1,
        ..IndexReport::default()
    };
    let mut corrupt = BTreeSet::new();

    let mut resolver = Resolver::new(&mut *session)
        .with_single_item(config.single_item)
        .with_page_size(config.retained_page_size);
    let mut passes = BlockPasses {
        path,
        corrupt: &mut corrupt,
        diagnostics,
    };
    passes.run(BlockFilter::WaysAndRelations, |block| {
        resolver.first_pass_block(block)
    })?;
    resolver
        .finish_first_pass()
        .map_err(|source| store_error(path, source))?;
    passes.run(BlockFilter::Nodes, |block| resolver.second_pass_block(block))?;
    resolver
        .finish_second_pass()
        .map_err(|source| store_error(path, source))?;
    report.absorb_resolve(resolver.stats());
    report.corrupt_blocks = u64::try_from(corrupt.len()).unwrap_or(u64::MAX);

    info!("resolving and storing retained elements");
    emit::emit_retained(path, config, session, sink, diagnostics, &mut report)?;
    report.failed_lookups = session.failed_lookups();
    Ok(report)
}

/// Shared state of the two decode passes over one file.
struct BlockPasses<'p> {
    path: &'p Utf8Path,
    corrupt: &'p mut BTreeSet<usize>,
    diagnostics: &'p dyn DiagnosticSink,
}

impl BlockPasses<'_> {
    fn run<F>(&mut self, filter: BlockFilter, mut visit: F) -> Result<(), OsmIndexError>
    where
        F: FnMut(DecodedBlock) -> Result<(), StoreError>,
    {
        let file = osmpoi_fs::open_utf8_file(self.path).map_err(|source| OsmIndexError::Open {
            path: self.path.to_path_buf(),
            source,
        })?;
        for blob in PbfReader::new(BufReader::new(file)) {
            let blob = blob.map_err(|source| OsmIndexError::Read {
                path: self.path.to_path_buf(),
                source,
            })?;
            let decoded = blob.inflate().and_then(|data| match blob.kind {
                BlobKind::Header => {
                    let bounds = decode_header(&data)?;
                    if filter == BlockFilter::WaysAndRelations {
                        log_bounds(self.path, bounds);
                    }
                    Ok(None)
                }
                BlobKind::Data => decode_block(&data, filter).map(Some),
            });
            match decoded {
                Ok(Some(block)) => visit(block).map_err(|source| store_error(self.path, source))?,
                Ok(None) => {}
                Err(err) => {
                    if self.corrupt.insert(blob.index) {
                        let reason = error_chain(&err);
                        warn!("{}: skipping block {}: {reason}", self.path, blob.index);
                        self.diagnostics.record(&Diagnostic::CorruptBlock {
                            block: blob.index,
                            reason,
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

fn log_bounds(path: &Utf8Path, bounds: Option<geo::Rect>) {
    match bounds {
        Some(rect) => info!(
            "{path}: bounds ({}, {}) to ({}, {})",
            rect.min().x,
            rect.min().y,
            rect.max().x,
            rect.max().y
        ),
        None => info!("{path}: header carries no bounding box"),
    }
}

fn store_error(path: &Utf8Path, source: StoreError) -> OsmIndexError {
    OsmIndexError::Store {
        path: path.to_path_buf(),
        source,
    }
}

/// Render an error with its chain of sources.
pub(crate) fn error_chain(error: &(dyn StdError + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
