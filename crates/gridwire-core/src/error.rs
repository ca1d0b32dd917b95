//! Error types for gridwire core
//!
//! Three families, matching where a failure is handled:
//! - [`ValidationError`]: the caller sent bad coordinates or a bad grid name.
//!   The single offending operation is rejected, nothing else changes.
//! - [`StorageError`]: SQLite failed or returned a row of the wrong shape.
//!   Surfaced to the caller, never retried.
//! - [`DeliveryError`]: a push to one subscriber failed. Swallowed by the
//!   broadcaster, never reaches the operation that triggered it.

use thiserror::Error;

/// Result type alias for grid operations
pub type Result<T> = std::result::Result<T, GridError>;

/// Error returned by every operation on the grid surface
#[derive(Error, Debug)]
pub enum GridError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// The actor thread has exited and can no longer accept commands
    #[error("Grid actor '{0}' is no longer running")]
    ActorStopped(String),

    /// Opening another grid would exceed the directory's limit
    #[error("Too many open grids (limit {0})")]
    TooManyGrids(usize),
}

impl GridError {
    /// True when the caller is at fault (maps to a client error on HTTP)
    pub fn is_client_error(&self) -> bool {
        matches!(self, GridError::Validation(_))
    }
}

impl From<rusqlite::Error> for GridError {
    fn from(e: rusqlite::Error) -> Self {
        GridError::Storage(StorageError::Sqlite(e))
    }
}

/// Caller-supplied input rejected before touching storage
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Coordinates must be integers, got {0}")]
    NonInteger(String),

    #[error("Coordinate out of bounds: ({x},{y}) not within 0..{max_x},0..{max_y}")]
    OutOfBounds {
        x: i64,
        y: i64,
        max_x: u32,
        max_y: u32,
    },

    /// Whole number too large to be a coordinate at all
    #[error("Coordinate out of bounds: {0} is not a valid coordinate")]
    CoordinateOutOfRange(String),

    #[error("Invalid grid name: {0:?}")]
    InvalidGridName(String),
}

/// Durable backend failures
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A row came back with a column of unexpected type
    #[error("Malformed grid row: {0}")]
    RowShape(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Per-subscriber push failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// The subscriber's outbound queue is full
    #[error("Subscriber {0} is lagging")]
    Lagging(String),

    /// The subscriber's transport is gone
    #[error("Subscriber {0} is closed")]
    Closed(String),
}
