//! Data sources the booking table snapshot can be exported from.
//!
//! Sources are constructed explicitly by the caller and handed to ingestion, so a
//! run never reaches for a process-wide connection.

use crate::data::batch::{DataBatch, number};
use booking_core::{PipelineError, Result, SourceConfig};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static TABLE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$")
        .expect("table name pattern is valid")
});

/// Information about a data source for logging and reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSourceInfo {
    pub source_type: String,
    pub location: String,
    pub accessed_at: chrono::DateTime<chrono::Utc>,
    pub row_count: Option<usize>,
}

/// Trait for loading the booking table.
pub trait DataSource {
    /// Load data from this source, optionally limiting the number of rows.
    fn load(&self, limit: Option<usize>) -> Result<DataBatch>;

    /// Return metadata about this source.
    fn source_info(&self) -> DataSourceInfo;
}

/// Open the source described by the pipeline configuration.
pub fn open_source(config: &SourceConfig) -> Result<Box<dyn DataSource>> {
    match config {
        SourceConfig::Sqlite { path, table } => Ok(Box::new(SqliteSource::open(path, table)?)),
        SourceConfig::Csv { path } => Ok(Box::new(CsvSource::new(path.clone()))),
    }
}

// ---------------------------------------------------------------------------
// SqliteSource
// ---------------------------------------------------------------------------

/// A table in a SQLite database, read through an owned connection.
pub struct SqliteSource {
    conn: rusqlite::Connection,
    location: String,
    table: String,
}

impl SqliteSource {
    /// Open `db_path` read-only and bind it to `table`.
    pub fn open(db_path: &Path, table: &str) -> Result<Self> {
        if !db_path.exists() {
            return Err(PipelineError::ingestion(format!(
                "database file '{}' does not exist",
                db_path.display()
            )));
        }
        let conn = rusqlite::Connection::open_with_flags(
            db_path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Self::from_connection(conn, db_path.display().to_string(), table)
    }

    /// Wrap an already-open connection.
    pub fn from_connection(
        conn: rusqlite::Connection,
        location: impl Into<String>,
        table: &str,
    ) -> Result<Self> {
        if !TABLE_NAME.is_match(table) {
            return Err(PipelineError::invalid_input(format!(
                "invalid table name '{table}'"
            )));
        }
        Ok(Self {
            conn,
            location: location.into(),
            table: table.to_string(),
        })
    }

    fn select_query(&self, limit: Option<usize>) -> String {
        let quoted: Vec<String> = self.table.split('.').map(|p| format!("\"{p}\"")).collect();
        let mut query = format!("SELECT * FROM {}", quoted.join("."));
        if let Some(max) = limit {
            query.push_str(&format!(" LIMIT {max}"));
        }
        query
    }
}

impl DataSource for SqliteSource {
    fn load(&self, limit: Option<usize>) -> Result<DataBatch> {
        let query = self.select_query(limit);
        tracing::debug!(%query, "querying source table");

        let mut stmt = self.conn.prepare(&query).map_err(|e| {
            PipelineError::ingestion(format!("failed to query table '{}': {e}", self.table))
        })?;
        let column_count = stmt.column_count();
        let columns: Vec<String> = (0..column_count)
            .map(|i| stmt.column_name(i).unwrap_or("?").to_string())
            .collect();

        let mut rows = Vec::new();
        let mut result_rows = stmt.query([])?;
        while let Some(row) = result_rows.next()? {
            let mut values = Vec::with_capacity(column_count);
            for i in 0..column_count {
                let val = match row.get_ref(i)? {
                    rusqlite::types::ValueRef::Null => Value::Null,
                    rusqlite::types::ValueRef::Integer(n) => Value::from(n),
                    rusqlite::types::ValueRef::Real(f) => number(f),
                    rusqlite::types::ValueRef::Text(t) => {
                        Value::String(String::from_utf8_lossy(t).into_owned())
                    }
                    rusqlite::types::ValueRef::Blob(_) => Value::Null,
                };
                values.push(val);
            }
            rows.push(values);
        }

        Ok(DataBatch::new(columns, rows))
    }

    fn source_info(&self) -> DataSourceInfo {
        DataSourceInfo {
            source_type: "sqlite".to_string(),
            location: format!("{}#{}", self.location, self.table),
            accessed_at: chrono::Utc::now(),
            row_count: None,
        }
    }
}

// ---------------------------------------------------------------------------
// CsvSource
// ---------------------------------------------------------------------------

/// CSV file data source.
pub struct CsvSource {
    pub path: PathBuf,
}

impl CsvSource {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl DataSource for CsvSource {
    fn load(&self, limit: Option<usize>) -> Result<DataBatch> {
        let mut batch = DataBatch::read_csv(&self.path)
            .map_err(|e| PipelineError::ingestion(e.to_string()))?;
        if let Some(max) = limit {
            batch.rows.truncate(max);
            batch.total_rows = batch.rows.len();
        }
        Ok(batch)
    }

    fn source_info(&self) -> DataSourceInfo {
        DataSourceInfo {
            source_type: "csv".to_string(),
            location: self.path.display().to_string(),
            accessed_at: chrono::Utc::now(),
            row_count: None,
        }
    }
}
