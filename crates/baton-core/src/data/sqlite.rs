//! rusqlite-backed [`SqlDatabase`].
//!
//! Blocking calls run via `tokio::task::spawn_blocking`. Only read-only
//! statements are executed.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::types::ValueRef;
use rusqlite::Connection;

use super::{QueryResult, SqlDatabase, MAX_ROWS};
use crate::error::WorkflowError;

#[derive(Clone)]
pub struct SqliteDatabase {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteDatabase {
    pub fn open(path: &Path) -> Result<Self, WorkflowError> {
        let conn = Connection::open(path)
            .map_err(|e| WorkflowError::Database(format!("Failed to open database: {}", e)))?;
        tracing::info!("[SqliteDatabase] Opened {}", path.display());
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self, WorkflowError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| WorkflowError::Database(format!("Failed to open in-memory db: {}", e)))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run setup SQL directly, bypassing the read-only check.
    pub fn execute_batch(&self, sql: &str) -> Result<(), WorkflowError> {
        self.with_conn(|conn| conn.execute_batch(sql))
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T, WorkflowError>
    where
        F: FnOnce(&Connection) -> Result<T, rusqlite::Error>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| WorkflowError::Database(format!("Lock poisoned: {}", e)))?;
        f(&conn).map_err(|e| WorkflowError::Database(e.to_string()))
    }

    async fn with_conn_async<F, T>(&self, f: F) -> Result<T, WorkflowError>
    where
        F: FnOnce(&Connection) -> Result<T, rusqlite::Error> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.clone();
        tokio::task::spawn_blocking(move || db.with_conn(f))
            .await
            .map_err(|e| WorkflowError::Database(format!("Task join error: {}", e)))?
    }

    async fn table_names(&self) -> Result<Vec<String>, WorkflowError> {
        self.with_conn_async(|conn| {
            let mut stmt = conn.prepare(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
            )?;
            let names = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(names)
        })
        .await
    }
}

fn render_value(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => "NULL".to_string(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(t) => String::from_utf8_lossy(t).to_string(),
        ValueRef::Blob(b) => format!("<blob {} bytes>", b.len()),
    }
}

/// `None` when the statement would modify the database.
fn run_query(conn: &Connection, sql: &str) -> Result<Option<QueryResult>, rusqlite::Error> {
    let mut stmt = conn.prepare(sql)?;
    if !stmt.readonly() {
        return Ok(None);
    }
    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
    let column_count = columns.len();

    let mut rows = stmt.query([])?;
    let mut kept = Vec::new();
    let mut total_rows = 0;
    while let Some(row) = rows.next()? {
        total_rows += 1;
        if kept.len() < MAX_ROWS {
            let mut cells = Vec::with_capacity(column_count);
            for idx in 0..column_count {
                cells.push(render_value(row.get_ref(idx)?));
            }
            kept.push(cells);
        }
    }
    Ok(Some(QueryResult {
        columns,
        rows: kept,
        total_rows,
    }))
}

#[async_trait]
impl SqlDatabase for SqliteDatabase {
    async fn schema(&self) -> Result<String, WorkflowError> {
        let tables = self.table_names().await?;
        self.with_conn_async(move |conn| {
            let mut out = String::from("Database schema:\n");
            for table in &tables {
                let mut stmt = conn.prepare(&format!(
                    "PRAGMA table_info(\"{}\")",
                    table.replace('"', "\"\"")
                ))?;
                let columns = stmt
                    .query_map([], |row| {
                        let name: String = row.get(1)?;
                        let ty: String = row.get(2)?;
                        let pk: i64 = row.get(5)?;
                        Ok(if pk > 0 {
                            format!("{} {} PRIMARY KEY", name, ty)
                        } else {
                            format!("{} {}", name, ty)
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                out.push_str(&format!("\nTable: {}\nColumns: {}\n", table, columns.join(", ")));
            }
            Ok(out)
        })
        .await
    }

    async fn execute(&self, sql: &str) -> Result<QueryResult, WorkflowError> {
        let sql = sql.to_string();
        self.with_conn_async(move |conn| run_query(conn, &sql))
            .await?
            .ok_or_else(|| {
                WorkflowError::Database("Only read-only statements are allowed".to_string())
            })
    }
}
