//! Persistent Storage Layer — SQLite
//!
//! Each grid instance owns one SQLite database holding a single `grid`
//! table keyed by `(x, y)`. On-disk databases run in WAL mode.
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │               GridStore              │
//! ├──────────────────────────────────────┤
//! │  grid (x INTEGER, y INTEGER,         │
//! │        value TEXT, PK (x, y))        │
//! └──────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use gridwire_core::grid::GridDimensions;
//! use gridwire_core::storage::GridStore;
//!
//! # fn example() -> gridwire_core::Result<()> {
//! let store = GridStore::open("data/global.sqlite3", GridDimensions::default())?;
//! store.set_cell(0, 0, "a")?;
//! assert_eq!(store.get_cell(0, 0)?, Some("a".to_string()));
//! # Ok(())
//! # }
//! ```

pub mod grid_store;

pub use grid_store::{CellRow, GridStore};
