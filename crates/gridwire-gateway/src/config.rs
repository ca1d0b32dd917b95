//! Gateway configuration

use gridwire_core::{GridDimensions, GridName, DEFAULT_MAX_GRIDS, MAX_CELLS};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::{GatewayError, DEFAULT_GRID, DEFAULT_HOST, DEFAULT_PORT};

/// Main gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Directory holding one SQLite file per grid; in-memory when unset
    pub data_dir: Option<PathBuf>,

    /// Grid width, fixed for the process lifetime
    pub width: u32,

    /// Grid height, fixed for the process lifetime
    pub height: u32,

    /// Grid addressed by the unnamed `/api/grid` routes
    pub default_grid: String,

    /// Outbound frame queue per WebSocket connection
    pub subscriber_buffer: usize,

    /// Distinct grids that may be open at once
    pub max_grids: usize,

    /// Permissive CORS on every route
    pub cors: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        let dims = GridDimensions::default();
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            data_dir: None,
            width: dims.width,
            height: dims.height,
            default_grid: DEFAULT_GRID.to_string(),
            subscriber_buffer: 256,
            max_grids: DEFAULT_MAX_GRIDS,
            cors: true,
        }
    }
}

impl GatewayConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the host
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Persist grids under `dir`
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_default_grid(mut self, name: impl Into<String>) -> Self {
        self.default_grid = name.into();
        self
    }

    pub fn with_subscriber_buffer(mut self, frames: usize) -> Self {
        self.subscriber_buffer = frames;
        self
    }

    pub fn with_max_grids(mut self, max_grids: usize) -> Self {
        self.max_grids = max_grids;
        self
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> crate::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| GatewayError::InvalidConfig(format!("bad listen address: {}", e)))
    }

    /// Grid dimensions, rejecting empty and oversized grids
    pub fn dimensions(&self) -> crate::Result<GridDimensions> {
        GridDimensions::new(self.width, self.height).ok_or_else(|| {
            GatewayError::InvalidConfig(format!(
                "grid must be at least 1x1 and at most {} cells, got {}x{}",
                MAX_CELLS, self.width, self.height
            ))
        })
    }

    /// Check every field that can be wrong before the server starts
    pub fn validate(&self) -> crate::Result<()> {
        self.socket_addr()?;
        self.dimensions()?;
        GridName::parse(&self.default_grid)
            .map_err(|e| GatewayError::InvalidConfig(e.to_string()))?;
        if self.subscriber_buffer == 0 {
            return Err(GatewayError::InvalidConfig(
                "subscriber_buffer must be positive".to_string(),
            ));
        }
        if self.max_grids == 0 {
            return Err(GatewayError::InvalidConfig(
                "max_grids must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Load configuration from a file
    pub fn from_file(path: &str) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn to_file(&self, path: &str) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GatewayConfig::default();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!((config.width, config.height), (20, 20));
        assert!(config.data_dir.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = GatewayConfig::new()
            .with_host("0.0.0.0")
            .with_port(8080)
            .with_dimensions(8, 4)
            .with_default_grid("lobby")
            .with_data_dir("/tmp/grids");

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert_eq!(config.dimensions().unwrap(), GridDimensions::new(8, 4).unwrap());
        assert_eq!(config.default_grid, "lobby");
        assert_eq!(config.data_dir, Some(PathBuf::from("/tmp/grids")));
    }

    #[test]
    fn test_invalid_config() {
        assert!(GatewayConfig::new().with_host("not a host").validate().is_err());
        assert!(GatewayConfig::new().with_dimensions(0, 20).validate().is_err());
        assert!(GatewayConfig::new().with_default_grid("a/b").validate().is_err());
        assert!(GatewayConfig::new().with_subscriber_buffer(0).validate().is_err());
        assert!(GatewayConfig::new().with_max_grids(0).validate().is_err());
    }

    #[test]
    fn test_oversized_grid_rejected() {
        assert!(GatewayConfig::new().with_dimensions(1000, 1000).validate().is_ok());

        for (width, height) in [(1000, 1001), (100_000, 100_000), (u32::MAX, u32::MAX)] {
            let err = GatewayConfig::new()
                .with_dimensions(width, height)
                .validate()
                .unwrap_err();
            assert!(matches!(err, GatewayError::InvalidConfig(_)));
            assert!(err.to_string().contains("at most 1000000 cells"));
        }
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: GatewayConfig = serde_json::from_str(r#"{"port": 9000}"#).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.default_grid, DEFAULT_GRID);
    }

    #[test]
    fn test_config_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway.json");
        let path = path.to_str().unwrap();

        GatewayConfig::new().with_port(4321).to_file(path).unwrap();
        let loaded = GatewayConfig::from_file(path).unwrap();
        assert_eq!(loaded.port, 4321);
    }
}
