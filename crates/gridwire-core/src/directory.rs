//! Named grid instances
//!
//! Maps a grid name to the handle of its running actor, opening the
//! backing database on first use. Distinct names share nothing.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::actor::{GridActor, GridHandle, GridStats};
use crate::error::{GridError, Result};
use crate::grid::{GridDimensions, GridName};
use crate::storage::GridStore;

/// Database file extension for on-disk grids
pub const DB_EXTENSION: &str = "sqlite3";

/// Default limit on concurrently open grids
pub const DEFAULT_MAX_GRIDS: usize = 1024;

/// In-process registry of grid actors
pub struct GridDirectory {
    data_dir: Option<PathBuf>,
    dims: GridDimensions,
    max_grids: usize,
    grids: Mutex<HashMap<GridName, GridHandle>>,
}

impl GridDirectory {
    /// Grids persisted as `<data_dir>/<name>.sqlite3`
    pub fn persistent(data_dir: impl Into<PathBuf>, dims: GridDimensions) -> Self {
        Self {
            data_dir: Some(data_dir.into()),
            dims,
            max_grids: DEFAULT_MAX_GRIDS,
            grids: Mutex::new(HashMap::new()),
        }
    }

    /// Grids held in private in-memory databases
    pub fn in_memory(dims: GridDimensions) -> Self {
        Self {
            data_dir: None,
            dims,
            max_grids: DEFAULT_MAX_GRIDS,
            grids: Mutex::new(HashMap::new()),
        }
    }

    /// Refuse to open more than `max_grids` distinct grids
    pub fn with_max_grids(mut self, max_grids: usize) -> Self {
        self.max_grids = max_grids;
        self
    }

    pub fn dimensions(&self) -> GridDimensions {
        self.dims
    }

    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }

    pub fn max_grids(&self) -> usize {
        self.max_grids
    }

    fn db_path(&self, name: &GridName) -> Option<PathBuf> {
        self.data_dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.{}", name, DB_EXTENSION)))
    }

    /// Handle for `name`, starting its actor if it is not running
    pub fn open(&self, name: &str) -> Result<GridHandle> {
        let name = GridName::parse(name)?;
        let mut grids = self.grids.lock();

        if let Some(handle) = grids.get(&name) {
            if !handle.is_closed() {
                return Ok(handle.clone());
            }
        } else if grids.len() >= self.max_grids {
            tracing::warn!("Refusing to open grid {}: {} grids open", name, grids.len());
            return Err(GridError::TooManyGrids(self.max_grids));
        }

        let store = match self.db_path(&name) {
            Some(path) => GridStore::open(path, self.dims)?,
            None => GridStore::open_in_memory(self.dims)?,
        };
        let handle = GridActor::new(name.clone(), store).spawn()?;
        tracing::info!(
            "Grid opened: {} ({}x{})",
            name,
            self.dims.width,
            self.dims.height
        );
        grids.insert(name, handle.clone());
        Ok(handle)
    }

    /// Handle for `name` only if that grid already exists
    ///
    /// A grid exists once it is running in this process or, for a
    /// persistent directory, once its database file is on disk. Nothing is
    /// created for a name that has never been written.
    pub fn get(&self, name: &str) -> Result<Option<GridHandle>> {
        let parsed = GridName::parse(name)?;
        if let Some(handle) = self.grids.lock().get(&parsed) {
            if !handle.is_closed() {
                return Ok(Some(handle.clone()));
            }
        }
        match self.db_path(&parsed) {
            Some(path) if path.exists() => self.open(name).map(Some),
            _ => Ok(None),
        }
    }

    /// Handles of every grid opened so far
    pub fn handles(&self) -> Vec<GridHandle> {
        self.grids.lock().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.grids.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.grids.lock().is_empty()
    }

    /// Stats for every open grid, sorted by name
    pub async fn stats(&self) -> Result<Vec<GridStats>> {
        let mut out = Vec::new();
        for handle in self.handles() {
            out.push(handle.stats().await?);
        }
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }
}
