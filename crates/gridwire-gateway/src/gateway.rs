//! Main Gateway implementation
//!
//! Maps HTTP requests onto grid actors and upgrades `/ws` requests into
//! push-only subscriber connections.

use axum::{
    async_trait,
    extract::{
        rejection::{JsonRejection, QueryRejection},
        ws::{Message, WebSocket, WebSocketUpgrade},
        FromRequestParts, Path, Query, State,
    },
    http::{request::Parts, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use futures::{SinkExt, StreamExt};
use gridwire_core::{
    coordinate_from_json, ClientMessage, GridDirectory, GridError, GridHandle, OutgoingFrame,
    SubscriberId,
};
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::GatewayConfig;
use crate::{GatewayError, Result};

/// Error text for a malformed cell write body
pub const EXPECTED_CELL_BODY: &str = "Expected {x:number, y:number, value:string}";

/// Error text for a malformed cell read query
pub const EXPECTED_CELL_QUERY: &str = "Expected integer query parameters x and y";

/// Gateway state shared across handlers
pub struct GatewayState {
    pub config: GatewayConfig,
    pub directory: Arc<GridDirectory>,
    pub started_at: DateTime<Utc>,
    pub shutdown_tx: broadcast::Sender<()>,
}

impl GatewayState {
    pub fn new(config: GatewayConfig) -> Result<Self> {
        config.validate()?;
        let dims = config.dimensions()?;
        let directory = match &config.data_dir {
            Some(dir) => GridDirectory::persistent(dir, dims),
            None => GridDirectory::in_memory(dims),
        }
        .with_max_grids(config.max_grids);
        let (shutdown_tx, _) = broadcast::channel(1);

        Ok(Self {
            config,
            directory: Arc::new(directory),
            started_at: Utc::now(),
            shutdown_tx,
        })
    }
}

/// Grid name addressed by the request: `/api/grids/{name}/...` or the default
///
/// Only the raw name; handlers decide whether the grid may be created.
pub struct TargetGrid(pub String);

#[async_trait]
impl FromRequestParts<Arc<GatewayState>> for TargetGrid {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<GatewayState>,
    ) -> std::result::Result<Self, Self::Rejection> {
        let name = match Path::<String>::from_request_parts(parts, state).await {
            Ok(Path(name)) => name,
            Err(_) => state.config.default_grid.clone(),
        };
        Ok(TargetGrid(name))
    }
}

#[derive(Debug, Deserialize)]
struct SetCellBody {
    x: serde_json::Number,
    y: serde_json::Number,
    value: String,
}

#[derive(Debug, Deserialize)]
struct CellQuery {
    x: String,
    y: String,
}

/// Main Gateway
#[derive(Clone)]
pub struct Gateway {
    state: Arc<GatewayState>,
}

impl Gateway {
    /// Create a new gateway with configuration
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let state = Arc::new(GatewayState::new(config)?);
        Ok(Self { state })
    }

    /// Create a gateway with default configuration
    pub fn default_config() -> Result<Self> {
        Self::new(GatewayConfig::default())
    }

    /// Get gateway state
    pub fn state(&self) -> Arc<GatewayState> {
        self.state.clone()
    }

    /// Build the Axum router
    pub fn build_router(&self) -> Router {
        let router = Router::new()
            .route("/health", get(Self::handle_health))
            .route("/status", get(Self::handle_status))
            .route("/api/grid", get(Self::handle_get_grid))
            .route(
                "/api/grid/cell",
                get(Self::handle_get_cell).post(Self::handle_set_cell),
            )
            .route("/api/grid/clear", post(Self::handle_clear))
            .route("/api/grid/ws", any(Self::handle_ws_upgrade))
            .route("/api/grids/:name", get(Self::handle_get_grid))
            .route(
                "/api/grids/:name/cell",
                get(Self::handle_get_cell).post(Self::handle_set_cell),
            )
            .route("/api/grids/:name/clear", post(Self::handle_clear))
            .route("/api/grids/:name/ws", any(Self::handle_ws_upgrade))
            .fallback(Self::handle_not_found)
            .with_state(self.state.clone());

        let router = if self.state.config.cors {
            router.layer(CorsLayer::permissive())
        } else {
            router
        };
        router.layer(TraceLayer::new_for_http())
    }

    /// Start the gateway server on the configured address
    pub async fn start(&self) -> Result<()> {
        let addr = self.state.config.socket_addr()?;
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener until [`Gateway::shutdown`]
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let router = self.build_router();
        let mut shutdown_rx = self.state.shutdown_tx.subscribe();

        tracing::info!("gridwire gateway listening on {}", listener.local_addr()?);

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await
            .map_err(|e| GatewayError::Internal(e.to_string()))?;

        tracing::info!("gridwire gateway stopped");
        Ok(())
    }

    /// Shutdown the gateway
    pub fn shutdown(&self) {
        let _ = self.state.shutdown_tx.send(());
        tracing::info!("Gateway shutdown initiated");
    }

    // HTTP handlers

    async fn handle_health() -> impl IntoResponse {
        Json(serde_json::json!({
            "status": "healthy",
            "version": crate::VERSION
        }))
    }

    async fn handle_status(State(state): State<Arc<GatewayState>>) -> Result<impl IntoResponse> {
        let grids = state.directory.stats().await?;
        let dims = state.directory.dimensions();
        let uptime_secs = (Utc::now() - state.started_at).num_seconds();

        Ok(Json(serde_json::json!({
            "version": crate::VERSION,
            "uptime_secs": uptime_secs,
            "width": dims.width,
            "height": dims.height,
            "persistent": state.directory.data_dir().is_some(),
            "grids": grids,
        })))
    }

    async fn handle_not_found() -> impl IntoResponse {
        (StatusCode::NOT_FOUND, "Not found")
    }

    // Reads and clears never create a grid: a name nobody has written to
    // reads as empty. Only cell writes and subscriptions start an actor.

    async fn handle_get_grid(
        State(state): State<Arc<GatewayState>>,
        TargetGrid(name): TargetGrid,
    ) -> Result<impl IntoResponse> {
        let matrix = match state.directory.get(&name)? {
            Some(grid) => grid.get_grid().await?,
            None => state.directory.dimensions().empty_matrix(),
        };
        Ok(Json(serde_json::json!({ "grid": matrix })))
    }

    async fn handle_get_cell(
        State(state): State<Arc<GatewayState>>,
        TargetGrid(name): TargetGrid,
        query: std::result::Result<Query<CellQuery>, QueryRejection>,
    ) -> Result<impl IntoResponse> {
        let Query(query) = query.map_err(|_| GatewayError::BadRequest(EXPECTED_CELL_QUERY.to_string()))?;
        let x = parse_query_coordinate(&query.x)?;
        let y = parse_query_coordinate(&query.y)?;
        let value = match state.directory.get(&name)? {
            Some(grid) => grid.get_cell(x, y).await?,
            None => {
                state.directory.dimensions().check(x, y).map_err(GridError::from)?;
                None
            }
        };
        Ok(Json(serde_json::json!({ "value": value })))
    }

    async fn handle_set_cell(
        State(state): State<Arc<GatewayState>>,
        TargetGrid(name): TargetGrid,
        body: std::result::Result<Json<SetCellBody>, JsonRejection>,
    ) -> Result<impl IntoResponse> {
        let Json(body) = body.map_err(|_| GatewayError::BadRequest(EXPECTED_CELL_BODY.to_string()))?;
        let x = coordinate_from_json(&body.x).map_err(GridError::from)?;
        let y = coordinate_from_json(&body.y).map_err(GridError::from)?;
        state.directory.dimensions().check(x, y).map_err(GridError::from)?;
        let grid = state.directory.open(&name)?;
        grid.set_cell(x, y, body.value).await?;
        Ok(Json(serde_json::json!({ "ok": true })))
    }

    async fn handle_clear(
        State(state): State<Arc<GatewayState>>,
        TargetGrid(name): TargetGrid,
    ) -> Result<impl IntoResponse> {
        if let Some(grid) = state.directory.get(&name)? {
            grid.clear().await?;
        }
        Ok(Json(serde_json::json!({ "ok": true })))
    }

    async fn handle_ws_upgrade(
        method: Method,
        State(state): State<Arc<GatewayState>>,
        TargetGrid(name): TargetGrid,
        ws: Option<WebSocketUpgrade>,
    ) -> Response {
        if method != Method::GET {
            return Self::handle_not_found().await.into_response();
        }
        let Some(ws) = ws else {
            return (StatusCode::UPGRADE_REQUIRED, "Expected websocket").into_response();
        };
        let grid = match state.directory.open(&name) {
            Ok(grid) => grid,
            Err(e) => return GatewayError::from(e).into_response(),
        };
        let buffer = state.config.subscriber_buffer;
        ws.on_upgrade(move |socket| Self::handle_ws_connection(socket, grid, buffer))
    }

    async fn handle_ws_connection(socket: WebSocket, grid: GridHandle, buffer: usize) {
        let (mut tx, mut rx) = socket.split();
        let (outgoing_tx, mut outgoing_rx) = mpsc::channel::<OutgoingFrame>(buffer);

        // Registration queues the snapshot before any delta can follow it.
        let subscriber_id = match grid.subscribe(outgoing_tx).await {
            Ok(id) => id,
            Err(e) => {
                tracing::error!("Failed to register subscriber on {}: {}", grid.name(), e);
                let _ = tx.send(Message::Close(None)).await;
                return;
            }
        };

        tracing::info!("WebSocket connected: {} on {}", subscriber_id, grid.name());

        let outgoing_id = subscriber_id.clone();
        let writer = tokio::spawn(async move {
            while let Some(frame) = outgoing_rx.recv().await {
                if tx.send(Message::Text(frame)).await.is_err() {
                    return;
                }
            }
            // Queue ended: the registry dropped this subscriber.
            let _ = tx.send(Message::Close(None)).await;
            tracing::debug!("Outgoing handler stopped for {}", outgoing_id);
        });

        while let Some(msg) = rx.next().await {
            match msg {
                Ok(Message::Text(text)) => Self::handle_text_message(&subscriber_id, &text),
                Ok(Message::Binary(data)) => {
                    tracing::debug!("Binary message ignored: {} bytes", data.len());
                }
                Ok(Message::Close(_)) => {
                    tracing::info!("WebSocket closing: {}", subscriber_id);
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!("WebSocket error on {}: {}", subscriber_id, e);
                    break;
                }
            }
        }

        let _ = grid.unsubscribe(subscriber_id.clone()).await;
        writer.abort();
        tracing::info!("WebSocket disconnected: {}", subscriber_id);
    }

    /// Inbound frames are logged and dropped; the connection is push-only.
    fn handle_text_message(subscriber_id: &SubscriberId, text: &str) {
        match serde_json::from_str::<ClientMessage>(text) {
            Ok(message) => tracing::debug!(
                "Ignoring {:?} from {}: writes go through the HTTP API",
                message,
                subscriber_id
            ),
            Err(e) => tracing::debug!("Unparseable frame from {}: {}", subscriber_id, e),
        }
    }
}

/// Query strings carry text; accept whole numbers, including `3.0`.
fn parse_query_coordinate(raw: &str) -> Result<i64> {
    if let Ok(v) = raw.parse::<i64>() {
        return Ok(v);
    }
    let number = raw
        .parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .ok_or_else(|| GatewayError::BadRequest(EXPECTED_CELL_QUERY.to_string()))?;
    Ok(coordinate_from_json(&number).map_err(GridError::from)?)
}
