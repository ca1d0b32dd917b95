//! GridStore — SQLite persistence for one bounded grid
//!
//! One database per grid instance, one row per explicitly set cell:
//! - Composite primary key `(x, y)`: at most one value per coordinate
//! - Upsert on write, so replacing a value is a single statement
//! - Bounds are checked before any SQL runs
//! - Rows are decoded through [`CellRow`]; a column of the wrong type is a
//!   [`StorageError::RowShape`], never silently skipped

use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

use crate::error::{Result, StorageError};
use crate::grid::{GridDimensions, GridMatrix};

/// One persisted cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellRow {
    pub x: i64,
    pub y: i64,
    pub value: String,
}

impl CellRow {
    fn from_row(row: &Row<'_>) -> std::result::Result<Self, StorageError> {
        Ok(Self {
            x: typed_column(row, 0, "x")?,
            y: typed_column(row, 1, "y")?,
            value: typed_column(row, 2, "value")?,
        })
    }
}

fn typed_column<T: rusqlite::types::FromSql>(
    row: &Row<'_>,
    idx: usize,
    name: &str,
) -> std::result::Result<T, StorageError> {
    row.get::<_, T>(idx).map_err(|e| match e {
        rusqlite::Error::InvalidColumnType(_, _, ty) => {
            StorageError::RowShape(format!("column '{}' has type {}", name, ty))
        }
        rusqlite::Error::FromSqlConversionFailure(_, ty, _) => {
            StorageError::RowShape(format!("column '{}' cannot be decoded from {}", name, ty))
        }
        rusqlite::Error::IntegralValueOutOfRange(_, v) => {
            StorageError::RowShape(format!("column '{}' out of range: {}", name, v))
        }
        other => StorageError::Sqlite(other),
    })
}

/// Persistent bounded grid
pub struct GridStore {
    conn: Connection,
    dims: GridDimensions,
}

impl GridStore {
    /// Open (or create) the grid database at `path` in WAL mode and apply
    /// the schema.
    pub fn open(path: impl AsRef<Path>, dims: GridDimensions) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(StorageError::Io)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )?;

        Self::with_connection(conn, dims)
    }

    /// Open a private in-memory grid (nothing survives the process)
    pub fn open_in_memory(dims: GridDimensions) -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, dims)
    }

    fn with_connection(conn: Connection, dims: GridDimensions) -> Result<Self> {
        let store = Self { conn, dims };
        store.ensure_schema()?;
        Ok(store)
    }

    /// Create the `grid` table if it does not exist. Idempotent.
    pub fn ensure_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS grid (
                x     INTEGER NOT NULL,
                y     INTEGER NOT NULL,
                value TEXT NOT NULL,
                PRIMARY KEY (x, y)
            );",
        )?;
        Ok(())
    }

    pub fn dimensions(&self) -> GridDimensions {
        self.dims
    }

    /// Insert or replace the value at `(x, y)`
    pub fn set_cell(&self, x: i64, y: i64, value: &str) -> Result<()> {
        self.dims.check(x, y)?;
        self.conn.execute(
            "INSERT INTO grid (x, y, value) VALUES (?1, ?2, ?3)
             ON CONFLICT(x, y) DO UPDATE SET value = excluded.value",
            params![x, y, value],
        )?;
        Ok(())
    }

    /// Value at `(x, y)`, or `None` if the cell was never set
    pub fn get_cell(&self, x: i64, y: i64) -> Result<Option<String>> {
        self.dims.check(x, y)?;
        let value = self
            .conn
            .query_row(
                "SELECT x, y, value FROM grid WHERE x = ?1 AND y = ?2",
                params![x, y],
                |row| Ok(CellRow::from_row(row)),
            )
            .optional()?
            .transpose()?;
        Ok(value.map(|row| row.value))
    }

    /// Whole grid, `height` rows of `width` entries, unset cells as `""`
    pub fn get_grid(&self) -> Result<GridMatrix> {
        let mut grid = self.dims.empty_matrix();
        for row in self.rows()? {
            if self.dims.contains(row.x, row.y) {
                grid[row.y as usize][row.x as usize] = row.value;
            }
        }
        Ok(grid)
    }

    /// Remove every cell in one transaction
    pub fn clear(&mut self) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM grid", [])?;
        tx.commit()?;
        Ok(())
    }

    /// Number of persisted (explicitly set) cells
    pub fn cell_count(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM grid", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    fn rows(&self) -> Result<Vec<CellRow>> {
        let mut stmt = self.conn.prepare("SELECT x, y, value FROM grid")?;
        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(CellRow::from_row(row)?);
        }
        Ok(out)
    }
}
