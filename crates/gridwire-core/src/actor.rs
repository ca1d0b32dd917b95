//! Single-writer grid actor
//!
//! Every grid instance is owned by one [`GridActor`] running on its own
//! thread. The actor holds the [`GridStore`] and the [`SubscriberRegistry`]
//! and drains a command queue one command at a time, so "write, then
//! broadcast" and "register, then snapshot" are each a single step as seen
//! from outside.
//!
//! ```text
//!  GridHandle ──┐
//!  GridHandle ──┼──► mpsc<Command> ──► GridActor ──► GridStore (SQLite)
//!  GridHandle ──┘                         │
//!                                         └──► SubscriberRegistry ──► ws writers
//! ```

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};

use crate::error::{GridError, Result, StorageError};
use crate::grid::{GridDimensions, GridMatrix, GridName};
use crate::protocol::{OutgoingFrame, ServerMessage};
use crate::registry::{Subscriber, SubscriberId, SubscriberRegistry};
use crate::storage::GridStore;

/// Capacity of each actor's command queue
pub const COMMAND_QUEUE_CAPACITY: usize = 256;

/// Point-in-time counters for one grid
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GridStats {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub cells: u64,
    pub subscribers: usize,
}

enum Command {
    SetCell {
        x: i64,
        y: i64,
        value: String,
        reply: oneshot::Sender<Result<()>>,
    },
    GetCell {
        x: i64,
        y: i64,
        reply: oneshot::Sender<Result<Option<String>>>,
    },
    GetGrid {
        reply: oneshot::Sender<Result<GridMatrix>>,
    },
    Clear {
        reply: oneshot::Sender<Result<()>>,
    },
    Subscribe {
        subscriber: Subscriber,
        reply: oneshot::Sender<Result<SubscriberId>>,
    },
    Unsubscribe {
        id: SubscriberId,
        reply: oneshot::Sender<bool>,
    },
    Stats {
        reply: oneshot::Sender<Result<GridStats>>,
    },
}

/// Exclusive owner of one grid's store and subscribers
pub struct GridActor {
    name: GridName,
    store: GridStore,
    registry: SubscriberRegistry,
}

impl GridActor {
    pub fn new(name: GridName, store: GridStore) -> Self {
        Self {
            name,
            store,
            registry: SubscriberRegistry::new(),
        }
    }

    /// Start the actor on a dedicated thread and return its handle.
    ///
    /// The thread exits once every handle has been dropped.
    pub fn spawn(self) -> Result<GridHandle> {
        let (tx, rx) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
        let handle = GridHandle {
            name: self.name.clone(),
            dims: self.store.dimensions(),
            tx,
        };

        std::thread::Builder::new()
            .name(format!("grid-{}", self.name))
            .spawn(move || self.run(rx))
            .map_err(StorageError::Io)?;

        Ok(handle)
    }

    fn run(mut self, mut rx: mpsc::Receiver<Command>) {
        tracing::info!("Grid actor started: {}", self.name);
        while let Some(command) = rx.blocking_recv() {
            self.handle(command);
        }
        tracing::info!("Grid actor stopped: {}", self.name);
    }

    fn handle(&mut self, command: Command) {
        // A dropped reply receiver means the caller went away; the
        // operation itself has still been applied.
        match command {
            Command::SetCell { x, y, value, reply } => {
                let _ = reply.send(self.set_cell(x, y, value));
            }
            Command::GetCell { x, y, reply } => {
                let _ = reply.send(self.store.get_cell(x, y));
            }
            Command::GetGrid { reply } => {
                let _ = reply.send(self.store.get_grid());
            }
            Command::Clear { reply } => {
                let _ = reply.send(self.clear());
            }
            Command::Subscribe { subscriber, reply } => {
                let _ = reply.send(self.subscribe(subscriber));
            }
            Command::Unsubscribe { id, reply } => {
                let _ = reply.send(self.registry.unregister(&id));
            }
            Command::Stats { reply } => {
                let _ = reply.send(self.stats());
            }
        }
    }

    fn set_cell(&mut self, x: i64, y: i64, value: String) -> Result<()> {
        self.store.set_cell(x, y, &value)?;
        let report = self.registry.broadcast(&ServerMessage::Cell { x, y, value });
        tracing::debug!(
            "[{}] cell ({},{}) set, delivered to {} subscriber(s)",
            self.name,
            x,
            y,
            report.delivered
        );
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.store.clear()?;
        let report = self.registry.broadcast(&ServerMessage::Clear);
        tracing::debug!(
            "[{}] grid cleared, delivered to {} subscriber(s)",
            self.name,
            report.delivered
        );
        Ok(())
    }

    fn subscribe(&mut self, subscriber: Subscriber) -> Result<SubscriberId> {
        let grid = self.store.get_grid()?;
        let id = self.registry.register(subscriber);
        if let Err(e) = self.registry.send_to(&id, &ServerMessage::Snapshot { grid }) {
            tracing::warn!("[{}] snapshot not delivered: {}", self.name, e);
        }
        Ok(id)
    }

    fn stats(&self) -> Result<GridStats> {
        let dims = self.store.dimensions();
        Ok(GridStats {
            name: self.name.to_string(),
            width: dims.width,
            height: dims.height,
            cells: self.store.cell_count()?,
            subscribers: self.registry.len(),
        })
    }
}

/// Cloneable async front-end to a running [`GridActor`]
#[derive(Debug, Clone)]
pub struct GridHandle {
    name: GridName,
    dims: GridDimensions,
    tx: mpsc::Sender<Command>,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Command::SetCell { .. } => "SetCell",
            Command::GetCell { .. } => "GetCell",
            Command::GetGrid { .. } => "GetGrid",
            Command::Clear { .. } => "Clear",
            Command::Subscribe { .. } => "Subscribe",
            Command::Unsubscribe { .. } => "Unsubscribe",
            Command::Stats { .. } => "Stats",
        };
        f.write_str(name)
    }
}

impl GridHandle {
    pub fn name(&self) -> &GridName {
        &self.name
    }

    pub fn dimensions(&self) -> GridDimensions {
        self.dims
    }

    /// True once the actor thread has exited
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Upsert one cell and notify every subscriber
    pub async fn set_cell(&self, x: i64, y: i64, value: impl Into<String>) -> Result<()> {
        let value = value.into();
        self.request(|reply| Command::SetCell { x, y, value, reply })
            .await?
    }

    /// Value at `(x, y)`, `None` if never set
    pub async fn get_cell(&self, x: i64, y: i64) -> Result<Option<String>> {
        self.request(|reply| Command::GetCell { x, y, reply }).await?
    }

    pub async fn get_grid(&self) -> Result<GridMatrix> {
        self.request(|reply| Command::GetGrid { reply }).await?
    }

    /// Remove every cell and notify every subscriber
    pub async fn clear(&self) -> Result<()> {
        self.request(|reply| Command::Clear { reply }).await?
    }

    /// Register a connection; its snapshot is queued on `tx` before this
    /// returns.
    pub async fn subscribe(&self, tx: mpsc::Sender<OutgoingFrame>) -> Result<SubscriberId> {
        self.subscribe_with(Subscriber::new(tx)).await
    }

    pub async fn subscribe_with(&self, subscriber: Subscriber) -> Result<SubscriberId> {
        self.request(|reply| Command::Subscribe { subscriber, reply })
            .await?
    }

    /// Returns false if the subscriber was already gone
    pub async fn unsubscribe(&self, id: SubscriberId) -> Result<bool> {
        self.request(|reply| Command::Unsubscribe { id, reply }).await
    }

    pub async fn stats(&self) -> Result<GridStats> {
        self.request(|reply| Command::Stats { reply }).await?
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| GridError::ActorStopped(self.name.to_string()))?;
        rx.await
            .map_err(|_| GridError::ActorStopped(self.name.to_string()))
    }
}
