//! `SQLite`-backed [`DocumentStore`].

use super::connection::{acquire_lock, configure_connection};
use super::metrics::{record_operation_metrics, status_of};
use crate::models::{Fields, Record, WriteOperation};
use crate::storage::STORE_BATCH_CEILING;
use crate::storage::traits::DocumentStore;
use crate::{Error, Result};
use rusqlite::{Connection, params};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS documents (
        collection TEXT NOT NULL,
        parent_id TEXT NOT NULL DEFAULT '',
        id TEXT NOT NULL,
        data TEXT NOT NULL,
        updated_at INTEGER NOT NULL,
        PRIMARY KEY (collection, parent_id, id)
    );
";

const UPSERT: &str = "
    INSERT INTO documents (collection, parent_id, id, data, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5)
    ON CONFLICT (collection, parent_id, id)
    DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at
";

/// Document store backed by a single `SQLite` database.
///
/// Blocking database calls run on tokio's blocking pool so the async engine
/// is never stalled by disk I/O.
pub struct SqliteDocumentStore {
    conn: Arc<Mutex<Connection>>,
    db_path: Option<PathBuf>,
}

impl SqliteDocumentStore {
    /// Opens (or creates) a store at `db_path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn open(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| Error::OperationFailed {
                operation: "create_database_dir".to_string(),
                cause: format!("{}: {e}", parent.display()),
            })?;
        }
        let conn = Connection::open(&db_path).map_err(|e| Error::OperationFailed {
            operation: "open_sqlite".to_string(),
            cause: e.to_string(),
        })?;
        Self::initialize(conn, Some(db_path))
    }

    /// Creates an in-memory store (useful for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| Error::OperationFailed {
            operation: "open_sqlite_memory".to_string(),
            cause: e.to_string(),
        })?;
        Self::initialize(conn, None)
    }

    fn initialize(conn: Connection, db_path: Option<PathBuf>) -> Result<Self> {
        configure_connection(&conn)?;
        conn.execute_batch(SCHEMA)
            .map_err(|e| Error::OperationFailed {
                operation: "create_documents_table".to_string(),
                cause: e.to_string(),
            })?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path,
        })
    }

    /// Returns the database path, `None` for in-memory stores.
    #[must_use]
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Runs a closure against the connection on the blocking pool.
    async fn with_connection<F, T>(&self, operation: &'static str, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let start = Instant::now();
        let result = tokio::task::spawn_blocking(move || {
            let mut guard = acquire_lock(&conn);
            f(&mut guard)
        })
        .await
        .map_err(|e| Error::OperationFailed {
            operation: format!("sqlite_{operation}"),
            cause: e.to_string(),
        })
        .and_then(|result| result);
        record_operation_metrics(operation, start, status_of(&result));
        result
    }
}

fn list_documents(conn: &Connection, collection: &str, parent_id: &str) -> Result<Vec<Record>> {
    let failed = |e: rusqlite::Error| Error::OperationFailed {
        operation: "sqlite_list".to_string(),
        cause: e.to_string(),
    };

    let mut stmt = conn
        .prepare(
            "SELECT id, data FROM documents WHERE collection = ?1 AND parent_id = ?2 ORDER BY id",
        )
        .map_err(failed)?;
    let rows = stmt
        .query_map(params![collection, parent_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })
        .map_err(failed)?;

    let mut records = Vec::new();
    for row in rows {
        let (id, data) = row.map_err(failed)?;
        let fields: Fields = serde_json::from_str(&data).map_err(|e| Error::OperationFailed {
            operation: "decode_document".to_string(),
            cause: format!("{collection}/{id}: {e}"),
        })?;
        records.push(Record::new(id, fields));
    }
    Ok(records)
}

fn upsert_documents(conn: &mut Connection, operations: &[WriteOperation]) -> Result<()> {
    let failed = |e: rusqlite::Error| Error::OperationFailed {
        operation: "sqlite_commit".to_string(),
        cause: e.to_string(),
    };

    let now = chrono::Utc::now().timestamp();
    let tx = conn.transaction().map_err(failed)?;
    {
        let mut stmt = tx.prepare(UPSERT).map_err(failed)?;
        for op in operations {
            let data = serde_json::to_string(&op.fields).map_err(|e| Error::OperationFailed {
                operation: "encode_document".to_string(),
                cause: format!("{}: {e}", op.target),
            })?;
            stmt.execute(params![
                op.target.collection,
                op.target.parent_id.as_deref().unwrap_or_default(),
                op.target.id,
                data,
                now
            ])
            .map_err(failed)?;
        }
    }
    tx.commit().map_err(failed)
}

impl DocumentStore for SqliteDocumentStore {
    async fn list(&self, collection: &str, parent_id: Option<&str>) -> Result<Vec<Record>> {
        let collection = collection.to_string();
        let parent_id = parent_id.unwrap_or_default().to_string();
        self.with_connection("list", move |conn| {
            list_documents(conn, &collection, &parent_id)
        })
        .await
    }

    async fn commit_batch(&self, operations: &[WriteOperation]) -> Result<()> {
        if operations.len() > STORE_BATCH_CEILING {
            return Err(Error::OperationFailed {
                operation: "sqlite_commit".to_string(),
                cause: format!(
                    "batch of {} exceeds store ceiling of {STORE_BATCH_CEILING}",
                    operations.len()
                ),
            });
        }
        let operations = operations.to_vec();
        self.with_connection("commit", move |conn| upsert_documents(conn, &operations))
            .await
    }

    fn max_batch_size(&self) -> usize {
        STORE_BATCH_CEILING
    }
}
