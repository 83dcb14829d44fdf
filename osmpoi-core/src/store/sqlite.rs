//! Disk-backed item store using a single SQLite key/value table.
//!
//! Keys carry a prefix per concern: `item:` for records, `retained:` for the
//! retained-id index and `id:` for the node-id membership set. Records are
//! encoded with `bincode`. Writes are buffered and flushed in one transaction
//! once the pending count reaches the flush threshold.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use rusqlite::{Connection, OptionalExtension, params};

use crate::{ElementId, OsmRecord};

use super::{ItemLookup, ItemStore, StoreError};

const ITEM_PREFIX: &str = "item:";
const RETAINED_PREFIX: &str = "retained:";
// Upper bound of the `retained:` key range; ';' sorts directly after ':'.
const RETAINED_END: &str = "retained;";
const NODE_ID_PREFIX: &str = "id:";

/// Item store persisted in a scratch SQLite database.
///
/// The database file is destroyed when the store is opened and again when it
/// is closed or dropped; nothing survives between input files.
pub struct SqliteItemStore {
    path: PathBuf,
    connection: Option<Connection>,
    flush_threshold: usize,
    pending_items: HashMap<ElementId, OsmRecord>,
    pending_retained: Vec<ElementId>,
    pending_node_ids: HashSet<u64>,
    pending_writes: usize,
}

impl fmt::Debug for SqliteItemStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteItemStore")
            .field("path", &self.path)
            .field("flush_threshold", &self.flush_threshold)
            .field("pending_writes", &self.pending_writes)
            .finish_non_exhaustive()
    }
}

impl SqliteItemStore {
    /// Pending writes tolerated before an automatic flush.
    pub const DEFAULT_FLUSH_THRESHOLD: usize = 8_000;

    /// Create a fresh store at `path`, removing any previous database there.
    pub fn open(path: impl AsRef<Path>, flush_threshold: usize) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        destroy_database(&path)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
        }

        let connection = Connection::open(&path).map_err(|source| StoreError::Sqlite {
            operation: "open",
            source,
        })?;
        connection
            .execute_batch(
                "PRAGMA journal_mode = OFF;
                 PRAGMA synchronous = OFF;
                 CREATE TABLE IF NOT EXISTS entries (
                     key TEXT PRIMARY KEY,
                     value BLOB NOT NULL
                 ) WITHOUT ROWID;",
            )
            .map_err(|source| StoreError::Sqlite {
                operation: "create schema",
                source,
            })?;
        debug!("opened item store at {}", path.display());

        Ok(Self {
            path,
            connection: Some(connection),
            flush_threshold: flush_threshold.max(1),
            pending_items: HashMap::new(),
            pending_retained: Vec::new(),
            pending_node_ids: HashSet::new(),
            pending_writes: 0,
        })
    }

    /// Location of the scratch database.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connection(&self) -> Result<&Connection, StoreError> {
        self.connection.as_ref().ok_or(StoreError::Closed)
    }

    fn note_writes(&mut self, count: usize) -> Result<(), StoreError> {
        self.pending_writes += count;
        if self.pending_writes >= self.flush_threshold {
            self.flush()?;
        }
        Ok(())
    }

    fn write_pending(&mut self) -> Result<(), StoreError> {
        let Some(connection) = self.connection.as_mut() else {
            return Err(StoreError::Closed);
        };
        let transaction = connection.transaction().map_err(|source| StoreError::Sqlite {
            operation: "begin transaction",
            source,
        })?;
        {
            let mut insert = transaction
                .prepare_cached("INSERT OR REPLACE INTO entries (key, value) VALUES (?1, ?2)")
                .map_err(|source| StoreError::Sqlite {
                    operation: "prepare insert",
                    source,
                })?;

            for (id, record) in &self.pending_items {
                let value =
                    bincode::serialize(record).map_err(|source| StoreError::Encode { id: *id, source })?;
                insert
                    .execute(params![item_key(*id), value])
                    .map_err(|source| StoreError::Sqlite {
                        operation: "write item",
                        source,
                    })?;
            }
            for id in &self.pending_retained {
                insert
                    .execute(params![retained_key(*id), id.to_string().into_bytes()])
                    .map_err(|source| StoreError::Sqlite {
                        operation: "write retained id",
                        source,
                    })?;
            }
            for node in &self.pending_node_ids {
                insert
                    .execute(params![node_id_key(*node), Vec::<u8>::new()])
                    .map_err(|source| StoreError::Sqlite {
                        operation: "write node id",
                        source,
                    })?;
            }
        }
        transaction.commit().map_err(|source| StoreError::Sqlite {
            operation: "commit",
            source,
        })
    }
}

impl ItemLookup for SqliteItemStore {
    fn retrieve(&self, id: ElementId) -> Result<Option<OsmRecord>, StoreError> {
        if let Some(record) = self.pending_items.get(&id) {
            return Ok(Some(record.clone()));
        }
        let key = item_key(id);
        let mut select = self
            .connection()?
            .prepare_cached("SELECT value FROM entries WHERE key = ?1")
            .map_err(|source| StoreError::Sqlite {
                operation: "prepare item lookup",
                source,
            })?;
        let bytes: Option<Vec<u8>> = select
            .query_row([key.as_str()], |row| row.get(0))
            .optional()
            .map_err(|source| StoreError::Sqlite {
                operation: "read item",
                source,
            })?;
        bytes
            .map(|bytes| bincode::deserialize(&bytes).map_err(|source| StoreError::Decode { key, source }))
            .transpose()
    }
}

impl ItemStore for SqliteItemStore {
    fn store(&mut self, records: Vec<OsmRecord>) -> Result<(), StoreError> {
        let count = records.len();
        self.pending_items
            .extend(records.into_iter().map(|record| (record.id, record)));
        self.note_writes(count)
    }

    fn store_retained(&mut self, ids: &[ElementId]) -> Result<(), StoreError> {
        self.pending_retained.extend_from_slice(ids);
        self.note_writes(ids.len())
    }

    fn retained_page(
        &mut self,
        after: Option<ElementId>,
        limit: usize,
    ) -> Result<Vec<ElementId>, StoreError> {
        if self.pending_writes > 0 {
            self.flush()?;
        }
        let lower = after.map_or_else(|| RETAINED_PREFIX.to_owned(), retained_key);
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut select = self
            .connection()?
            .prepare_cached(
                "SELECT key FROM entries WHERE key > ?1 AND key < ?2 ORDER BY key LIMIT ?3",
            )
            .map_err(|source| StoreError::Sqlite {
                operation: "prepare retained scan",
                source,
            })?;
        let keys = select
            .query_map(params![lower, RETAINED_END, limit], |row| row.get::<_, String>(0))
            .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
            .map_err(|source| StoreError::Sqlite {
                operation: "scan retained ids",
                source,
            })?;
        keys.into_iter().map(|key| parse_retained_key(&key)).collect()
    }

    fn store_node_ids(&mut self, ids: &[u64]) -> Result<(), StoreError> {
        self.pending_node_ids.extend(ids.iter().copied());
        self.note_writes(ids.len())
    }

    fn contains_node_ids(&self, ids: &[u64]) -> Result<Vec<u64>, StoreError> {
        let mut select = self
            .connection()?
            .prepare_cached("SELECT 1 FROM entries WHERE key = ?1")
            .map_err(|source| StoreError::Sqlite {
                operation: "prepare node id lookup",
                source,
            })?;
        let mut present = Vec::new();
        for &id in ids {
            let found = self.pending_node_ids.contains(&id)
                || select
                    .exists([node_id_key(id)])
                    .map_err(|source| StoreError::Sqlite {
                        operation: "read node id",
                        source,
                    })?;
            if found {
                present.push(id);
            }
        }
        Ok(present)
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        if self.pending_writes == 0 {
            return Ok(());
        }
        self.write_pending()?;
        debug!("flushed {} pending item store writes", self.pending_writes);
        self.pending_items.clear();
        self.pending_retained.clear();
        self.pending_node_ids.clear();
        self.pending_writes = 0;
        Ok(())
    }

    fn close(&mut self) -> Result<(), StoreError> {
        self.pending_items.clear();
        self.pending_retained.clear();
        self.pending_node_ids.clear();
        self.pending_writes = 0;
        if let Some(connection) = self.connection.take() {
            connection
                .close()
                .map_err(|(_, source)| StoreError::Sqlite {
                    operation: "close",
                    source,
                })?;
        }
        destroy_database(&self.path)
    }
}

impl Drop for SqliteItemStore {
    fn drop(&mut self) {
        if self.connection.is_some()
            && let Err(err) = self.close()
        {
            warn!("failed to discard item store at {}: {err}", self.path.display());
        }
    }
}

fn item_key(id: ElementId) -> String {
    format!("{ITEM_PREFIX}{id}")
}

fn retained_key(id: ElementId) -> String {
    format!("{RETAINED_PREFIX}{id}")
}

fn node_id_key(id: u64) -> String {
    format!("{NODE_ID_PREFIX}{id}")
}

fn parse_retained_key(key: &str) -> Result<ElementId, StoreError> {
    key.strip_prefix(RETAINED_PREFIX)
        .and_then(|id| id.parse().ok())
        .ok_or_else(|| StoreError::InvalidKey {
            key: key.to_owned(),
        })
}

fn destroy_database(path: &Path) -> Result<(), StoreError> {
    let journal = path.with_extension("db-journal");
    for candidate in [path, journal.as_path()] {
        match fs::remove_file(candidate) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(StoreError::Io {
                    path: candidate.to_path_buf(),
                    source,
                });
            }
        }
    }
    Ok(())
}
