//! Live WebSocket tests against a running gateway

use gridwire_core::ServerMessage;
use gridwire_gateway::{Gateway, GatewayConfig, GridClient, GridSubscription};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::time::timeout;

async fn start_gateway() -> (Gateway, SocketAddr) {
    let gateway = Gateway::new(GatewayConfig::default().with_port(0)).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = gateway.clone();
    tokio::spawn(async move {
        server.serve(listener).await.unwrap();
    });

    (gateway, addr)
}

async fn subscribe(addr: SocketAddr, path: &str) -> GridSubscription {
    GridClient::new(format!("ws://{}{}", addr, path))
        .connect()
        .await
        .unwrap()
}

async fn next(sub: &mut GridSubscription) -> ServerMessage {
    timeout(Duration::from_secs(5), sub.next_message())
        .await
        .expect("timed out waiting for frame")
        .unwrap()
        .expect("stream closed")
}

#[tokio::test]
async fn test_snapshot_then_cell() {
    let (gateway, addr) = start_gateway().await;
    let grid = gateway.state().directory.open("global").unwrap();
    grid.set_cell(1, 0, "before").await.unwrap();

    let mut sub = subscribe(addr, "/api/grid/ws").await;
    match next(&mut sub).await {
        ServerMessage::Snapshot { grid } => {
            assert_eq!(grid.len(), 20);
            assert_eq!(grid[0][1], "before");
        }
        other => panic!("expected snapshot, got {:?}", other),
    }

    grid.set_cell(5, 5, "x").await.unwrap();
    assert_eq!(
        next(&mut sub).await,
        ServerMessage::Cell {
            x: 5,
            y: 5,
            value: "x".to_string()
        }
    );

    grid.clear().await.unwrap();
    assert_eq!(next(&mut sub).await, ServerMessage::Clear);

    gateway.shutdown();
}

#[tokio::test]
async fn test_closed_subscriber_does_not_block_others() {
    let (gateway, addr) = start_gateway().await;
    let grid = gateway.state().directory.open("global").unwrap();

    let mut leaving = subscribe(addr, "/api/grid/ws").await;
    let mut staying = subscribe(addr, "/api/grid/ws").await;
    assert!(matches!(next(&mut leaving).await, ServerMessage::Snapshot { .. }));
    assert!(matches!(next(&mut staying).await, ServerMessage::Snapshot { .. }));

    leaving.close().await.unwrap();
    drop(leaving);

    grid.set_cell(3, 4, "still here").await.unwrap();
    assert_eq!(
        next(&mut staying).await,
        ServerMessage::Cell {
            x: 3,
            y: 4,
            value: "still here".to_string()
        }
    );

    gateway.shutdown();
}

#[tokio::test]
async fn test_inbound_frames_do_not_mutate() {
    let (gateway, addr) = start_gateway().await;
    let grid = gateway.state().directory.open("global").unwrap();

    let mut sub = subscribe(addr, "/api/grid/ws").await;
    assert!(matches!(next(&mut sub).await, ServerMessage::Snapshot { .. }));

    sub.send_text(r#"{"type":"set","x":0,"y":0,"value":"sneaky"}"#)
        .await
        .unwrap();
    sub.send_text(r#"{"type":"clear"}"#).await.unwrap();

    // A later legitimate write is the next frame; nothing from the inbound ones.
    grid.set_cell(9, 9, "legit").await.unwrap();
    assert_eq!(
        next(&mut sub).await,
        ServerMessage::Cell {
            x: 9,
            y: 9,
            value: "legit".to_string()
        }
    );
    assert_eq!(grid.get_cell(0, 0).await.unwrap(), None);

    gateway.shutdown();
}

#[tokio::test]
async fn test_named_grid_subscription() {
    let (gateway, addr) = start_gateway().await;
    let lobby = gateway.state().directory.open("lobby").unwrap();
    let global = gateway.state().directory.open("global").unwrap();

    let mut sub = subscribe(addr, "/api/grids/lobby/ws").await;
    assert!(matches!(next(&mut sub).await, ServerMessage::Snapshot { .. }));

    global.set_cell(0, 0, "elsewhere").await.unwrap();
    lobby.set_cell(2, 2, "here").await.unwrap();
    assert_eq!(
        next(&mut sub).await,
        ServerMessage::Cell {
            x: 2,
            y: 2,
            value: "here".to_string()
        }
    );

    gateway.shutdown();
}

#[tokio::test]
async fn test_stalled_subscriber_is_disconnected() {
    let config = GatewayConfig::default()
        .with_port(0)
        .with_subscriber_buffer(1);
    let gateway = Gateway::new(config).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = gateway.clone();
    tokio::spawn(async move {
        server.serve(listener).await.unwrap();
    });

    let grid = gateway.state().directory.open("global").unwrap();
    let mut stalled = subscribe(addr, "/api/grid/ws").await;

    // Never read while writing, so the socket and then the queue fill up.
    let big = "v".repeat(64 * 1024);
    let writes = 400;
    for i in 0..writes {
        grid.set_cell(i % 20, (i / 20) % 20, big.clone()).await.unwrap();
    }
    assert_eq!(grid.stats().await.unwrap().subscribers, 0);

    let mut cells = 0;
    loop {
        let msg = timeout(Duration::from_secs(10), stalled.next_message())
            .await
            .expect("timed out waiting for close");
        match msg {
            Ok(Some(ServerMessage::Cell { .. })) => cells += 1,
            Ok(Some(_)) => {}
            Ok(None) | Err(_) => break,
        }
    }
    assert!(cells < writes, "received {} of {} deltas", cells, writes);

    gateway.shutdown();
}
