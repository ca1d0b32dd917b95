//! gridwire Gateway - HTTP and WebSocket access to shared grids
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────┐
//! │                    gridwire Gateway                   │
//! ├───────────────────────────────────────────────────────┤
//! │   GET /api/grid        POST /api/grid/cell            │
//! │   GET /api/grid/cell   POST /api/grid/clear           │
//! │   GET /api/grid/ws  ──► subscriber (push-only)        │
//! │                    │                                  │
//! │         ┌──────────▼──────────┐                       │
//! │         │    GridDirectory    │  name → actor         │
//! │         └──────────┬──────────┘                       │
//! │       ┌────────────┼────────────┐                     │
//! │  ┌────▼────┐  ┌────▼────┐  ┌────▼────┐                │
//! │  │ global  │  │ room-a  │  │ room-b  │  GridActor     │
//! │  │ SQLite  │  │ SQLite  │  │ SQLite  │                │
//! │  └─────────┘  └─────────┘  └─────────┘                │
//! └───────────────────────────────────────────────────────┘
//! ```
//!
//! Named grids live under `/api/grids/{name}/...`; the unnamed routes
//! address the configured default grid.

pub mod client;
pub mod config;
pub mod error;
pub mod gateway;

pub use client::{GridClient, GridSubscription};
pub use config::GatewayConfig;
pub use error::{GatewayError, Result};
pub use gateway::{Gateway, GatewayState};

/// Gateway version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 8787;

/// Default host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Grid served by the unnamed routes
pub const DEFAULT_GRID: &str = "global";
