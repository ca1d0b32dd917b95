//! WebSocket client for grid subscriptions

use futures::{SinkExt, StreamExt};
use gridwire_core::ServerMessage;
use tokio_tungstenite::tungstenite::Message;

use crate::{GatewayError, Result};

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Client for subscribing to a gridwire gateway
pub struct GridClient {
    url: String,
}

impl GridClient {
    /// `url` is the full socket URL, e.g. `ws://127.0.0.1:8787/api/grid/ws`
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// Connect and return the subscription; the first message is the snapshot
    pub async fn connect(&self) -> Result<GridSubscription> {
        let (ws, _) = tokio_tungstenite::connect_async(self.url.as_str()).await?;
        Ok(GridSubscription { ws })
    }
}

/// Open subscription to one grid
pub struct GridSubscription {
    ws: WsStream,
}

impl GridSubscription {
    /// Next server message, `None` once the server closes the stream
    pub async fn next_message(&mut self) -> Result<Option<ServerMessage>> {
        while let Some(msg) = self.ws.next().await {
            match msg? {
                Message::Text(text) => return Ok(Some(ServerMessage::from_frame(&text)?)),
                Message::Close(_) => return Ok(None),
                _ => continue,
            }
        }
        Ok(None)
    }

    /// Send a raw text frame (the server ignores inbound frames)
    pub async fn send_text(&mut self, text: &str) -> Result<()> {
        self.ws
            .send(Message::Text(text.to_string()))
            .await
            .map_err(|e| GatewayError::WebSocket(e.to_string()))
    }

    /// Close the connection
    pub async fn close(&mut self) -> Result<()> {
        self.ws
            .close(None)
            .await
            .map_err(|e| GatewayError::WebSocket(e.to_string()))
    }
}
