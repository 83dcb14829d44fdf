//! Per-category diagnostic files.

use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, warn};
use osmpoi_core::{Diagnostic, DiagnosticCategory, DiagnosticSink};

/// [`DiagnosticSink`] appending one line per event to a file per category.
///
/// Files from a previous run are removed when the sink is created. Events
/// are also forwarded to the `log` facade at debug level. A failed append
/// is logged and otherwise ignored.
#[derive(Debug, Clone)]
pub struct FileDiagnostics {
    dir: Utf8PathBuf,
}

impl FileDiagnostics {
    /// Prepare `dir`, clearing the files of every category.
    ///
    /// # Errors
    ///
    /// Returns the I/O error raised while creating the directory or removing
    /// a stale file.
    pub fn create(dir: &Utf8Path) -> io::Result<Self> {
        osmpoi_fs::ensure_dir(dir)?;
        for category in DiagnosticCategory::ALL {
            osmpoi_fs::remove_file_if_exists(&dir.join(category.file_name()))?;
        }
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    /// File that events of `category` are appended to.
    #[must_use]
    pub fn path_for(&self, category: DiagnosticCategory) -> Utf8PathBuf {
        self.dir.join(category.file_name())
    }
}

impl DiagnosticSink for FileDiagnostics {
    fn record(&self, event: &Diagnostic) {
        debug!("{event}");
        let path = self.path_for(event.category());
        if let Err(err) = osmpoi_fs::append_line(&path, &event.to_string()) {
            warn!("failed to append diagnostic to {path}: {err}");
        }
    }
}
