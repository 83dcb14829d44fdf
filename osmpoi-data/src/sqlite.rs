//! SQLite persistence for finished POI records.
#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use osmpoi_core::{PoiRecord, PoiSink, RejectedRecord, SinkError, SinkReport};
use rusqlite::{Connection, Error as SqliteError, Transaction};
use serde_json::to_string;
use thiserror::Error;

/// Errors raised while opening a [`SqlitePoiSink`].
#[derive(Debug, Error)]
pub enum SqliteSinkError {
    /// Failed to create the parent directory for the database.
    #[error("failed to create parent directory for {path:?}")]
    CreateDirectory {
        /// Destination database path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Opening the SQLite database failed.
    #[error("failed to open SQLite database at {path:?}")]
    Open {
        /// Destination database path.
        path: Utf8PathBuf,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// Creating the `pois` table failed.
    #[error("failed to create pois table")]
    CreateSchema {
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
}

/// [`PoiSink`] writing each batch to a `pois` table in one transaction.
///
/// Rows are keyed by the identifier string and replaced on conflict, so
/// re-running a file is idempotent. Tags are stored as a JSON object.
#[derive(Debug)]
pub struct SqlitePoiSink {
    path: Utf8PathBuf,
    connection: Connection,
}

impl SqlitePoiSink {
    /// Open or create the database at `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteSinkError`] when the directory, database or table
    /// cannot be created.
    pub fn open(path: &Utf8Path) -> Result<Self, SqliteSinkError> {
        osmpoi_fs::ensure_parent_dir(path).map_err(|source| SqliteSinkError::CreateDirectory {
            path: path.to_path_buf(),
            source,
        })?;
        let connection =
            Connection::open(path.as_std_path()).map_err(|source| SqliteSinkError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        connection
            .execute(
                "CREATE TABLE IF NOT EXISTS pois (
                    id TEXT PRIMARY KEY,
                    name TEXT NOT NULL,
                    lat REAL NOT NULL,
                    lon REAL NOT NULL,
                    location TEXT NOT NULL,
                    tags TEXT NOT NULL,
                    level TEXT NOT NULL,
                    area REAL NOT NULL
                )",
                [],
            )
            .map_err(|source| SqliteSinkError::CreateSchema { source })?;
        debug!("opened POI database at {path}");
        Ok(Self {
            path: path.to_path_buf(),
            connection,
        })
    }

    /// Location of the database.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

impl PoiSink for SqlitePoiSink {
    fn submit(&mut self, batch: &[PoiRecord]) -> Result<SinkReport, SinkError> {
        let transaction = self.connection.transaction().map_err(unavailable)?;
        let report = persist_rows(&transaction, batch)?;
        transaction.commit().map_err(unavailable)?;
        Ok(report)
    }
}

fn persist_rows(
    transaction: &Transaction<'_>,
    batch: &[PoiRecord],
) -> Result<SinkReport, SinkError> {
    let mut report = SinkReport::default();
    if batch.is_empty() {
        return Ok(report);
    }

    let mut statement = transaction
        .prepare(
            "INSERT OR REPLACE INTO pois (id, name, lat, lon, location, tags, level, area)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .map_err(unavailable)?;

    for record in batch {
        let tags: BTreeMap<&str, &str> = record
            .tags
            .iter()
            .map(|tag| (tag.key.as_str(), tag.value.as_str()))
            .collect();
        let tags = match to_string(&tags) {
            Ok(tags) => tags,
            Err(err) => {
                report.rejected.push(RejectedRecord {
                    id: record.id,
                    reason: format!("failed to serialise tags: {err}"),
                });
                continue;
            }
        };
        statement
            .execute((
                record.id.to_string(),
                &record.name,
                record.point.lat,
                record.point.lon,
                &record.location,
                tags,
                record.level.as_str(),
                record.area,
            ))
            .map_err(|err| SinkError::Rejected {
                reason: format!("failed to persist {}: {err}", record.id),
            })?;
    }

    Ok(report)
}

fn unavailable(source: SqliteError) -> SinkError {
    SinkError::Unavailable {
        source: Box::new(source),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use osmpoi_core::{ElementId, GeoPoint, PoiLevel, PoiTag};
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    #[fixture]
    fn poi() -> PoiRecord {
        PoiRecord {
            id: ElementId::way(7),
            name: "Example".into(),
            point: GeoPoint { lat: 2.0, lon: 1.0 },
            location: "POINT (1 2)".into(),
            tags: vec![PoiTag {
                key: "tourism".into(),
                value: "museum".into(),
            }],
            level: PoiLevel::Notable,
            area: 0.5,
        }
    }

    #[fixture]
    fn temp_dir() -> TempDir {
        TempDir::new().expect("create temp dir")
    }

    fn db_path(dir: &TempDir, name: &str) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().join(name)).expect("utf-8 path")
    }

    #[rstest]
    fn persists_records_keyed_by_identifier(temp_dir: TempDir, poi: PoiRecord) {
        let path = db_path(&temp_dir, "pois.db");
        let mut sink = SqlitePoiSink::open(&path).expect("open sink");

        let report = sink.submit(std::slice::from_ref(&poi)).expect("submit");
        assert!(report.rejected.is_empty());

        let conn = Connection::open(path.as_std_path()).expect("open database");
        let stored: (String, String, f64, f64, String, String, String) = conn
            .query_row(
                "SELECT id, name, lat, lon, location, tags, level FROM pois",
                [],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                        row.get(6)?,
                    ))
                },
            )
            .expect("read row");
        assert_eq!(stored.0, "way/7");
        assert_eq!(stored.1, "Example");
        assert_eq!((stored.2, stored.3), (2.0, 1.0));
        assert_eq!(stored.4, "POINT (1 2)");
        assert_eq!(stored.5, r#"{"tourism":"museum"}"#);
        assert_eq!(stored.6, "notable");
    }

    #[rstest]
    fn resubmitting_replaces_rows(temp_dir: TempDir, poi: PoiRecord) {
        let path = db_path(&temp_dir, "pois.db");
        let mut sink = SqlitePoiSink::open(&path).expect("open sink");
        sink.submit(std::slice::from_ref(&poi)).expect("first submit");
        let renamed = PoiRecord {
            name: "Renamed".into(),
            ..poi
        };
        sink.submit(&[renamed]).expect("second submit");

        let conn = Connection::open(path.as_std_path()).expect("open database");
        let (count, name): (i64, String) = conn
            .query_row("SELECT COUNT(*), MAX(name) FROM pois", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .expect("count rows");
        assert_eq!(count, 1);
        assert_eq!(name, "Renamed");
    }

    #[rstest]
    fn creates_parent_directory(temp_dir: TempDir) {
        let path = db_path(&temp_dir, "nested/deeper/pois.db");
        let sink = SqlitePoiSink::open(&path).expect("open nested sink");
        assert_eq!(sink.path(), path.as_path());
        assert!(path.exists());
    }
}
