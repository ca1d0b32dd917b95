//! gridwire core - shared bounded grids with live fan-out
//!
//! A grid is a fixed W×H space of string cells. Each named grid is owned by
//! a single-writer actor that persists cells to SQLite and pushes every
//! committed change to its connected subscribers.
//!
//! # Layers
//!
//! 1. **Storage** (`storage`): `GridStore`, one SQLite table keyed by `(x, y)`
//! 2. **Actor** (`actor`): `GridActor` / `GridHandle`, total order per grid
//! 3. **Registry** (`registry`): live subscribers, best-effort push
//! 4. **Protocol** (`protocol`): `snapshot`, `cell` and `clear` frames
//! 5. **Directory** (`directory`): grid name → running actor
//!
//! # Quick Start
//!
//! ```
//! use gridwire_core::{GridDimensions, GridDirectory, ServerMessage};
//! use tokio::sync::mpsc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> gridwire_core::Result<()> {
//! let directory = GridDirectory::in_memory(GridDimensions::default());
//! let grid = directory.open("global")?;
//!
//! let (tx, mut rx) = mpsc::channel(16);
//! grid.subscribe(tx).await?;
//! grid.set_cell(5, 5, "x").await?;
//!
//! let first = ServerMessage::from_frame(&rx.recv().await.unwrap()).unwrap();
//! assert!(matches!(first, ServerMessage::Snapshot { .. }));
//! # Ok(())
//! # }
//! ```

pub mod actor;
pub mod directory;
pub mod error;
pub mod grid;
pub mod protocol;
pub mod registry;
pub mod storage;

pub use actor::{GridActor, GridHandle, GridStats};
pub use directory::{GridDirectory, DEFAULT_MAX_GRIDS};
pub use error::{DeliveryError, GridError, Result, StorageError, ValidationError};
pub use grid::{coordinate_from_json, GridDimensions, GridMatrix, GridName, MAX_CELLS};
pub use protocol::{ClientMessage, OutgoingFrame, ServerMessage};
pub use registry::{Subscriber, SubscriberAttachment, SubscriberId, SubscriberRegistry};
pub use storage::GridStore;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
