//! Push protocol between a grid actor and its subscribers
//!
//! Server frames are JSON text, tagged by `type`:
//!
//! ```text
//! {"type":"snapshot","grid":[["", ...], ...]}
//! {"type":"cell","x":5,"y":5,"value":"x"}
//! {"type":"clear"}
//! ```
//!
//! A snapshot is sent exactly once per connection, before any delta.

use serde::{Deserialize, Serialize};

use crate::grid::GridMatrix;

/// Outgoing frame (serialized JSON string)
pub type OutgoingFrame = String;

/// Server → subscriber message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Full grid state at registration time
    Snapshot { grid: GridMatrix },

    /// One cell changed
    Cell { x: i64, y: i64, value: String },

    /// Every cell was removed
    Clear,
}

impl ServerMessage {
    pub fn to_frame(&self) -> serde_json::Result<OutgoingFrame> {
        serde_json::to_string(self)
    }

    pub fn from_frame(frame: &str) -> serde_json::Result<Self> {
        serde_json::from_str(frame)
    }
}

/// Subscriber → server message.
///
/// Parsed so the gateway can log what clients send. These never mutate a
/// grid; writes go through the HTTP surface only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Set {
        x: serde_json::Number,
        y: serde_json::Number,
        value: String,
    },
    Clear,
}
