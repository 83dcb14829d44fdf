//! Error types emitted by the osmpoi CLI.
//!
//! Keep this error type reasonably small, as every CLI helper returns
//! `Result<_, CliError>`. Messages omit their sources; `main` prints the
//! whole chain.

use std::sync::Arc;

use camino::Utf8PathBuf;
use osmpoi_data::{OsmIndexError, SqliteSinkError};
use thiserror::Error;

/// Errors emitted by the osmpoi CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        field: &'static str,
        env: &'static str,
    },
    /// A numeric option that must be positive was zero.
    #[error("--{field} must be greater than zero")]
    ZeroSetting { field: &'static str },
    /// A referenced input path does not exist on disk.
    #[error("{field} path {path:?} does not exist")]
    MissingSourcePath {
        field: &'static str,
        path: Utf8PathBuf,
    },
    /// A referenced input path could not be inspected due to an IO error.
    #[error("failed to inspect {field} path {path:?}")]
    InspectSourcePath {
        field: &'static str,
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The output database could not be opened.
    #[error(transparent)]
    OpenSink(#[from] SqliteSinkError),
    /// The diagnostics directory could not be prepared.
    #[error("failed to prepare diagnostics directory {path:?}")]
    Diagnostics {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Indexing an extract failed.
    #[error("failed to index OSM data")]
    Index(#[from] OsmIndexError),
    /// Writing the run summary failed.
    #[error("failed to write summary")]
    WriteSummary(#[source] std::io::Error),
}
