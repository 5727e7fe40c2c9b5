//! Integration tests for the Starfall server.
//!
//! These tests start a real server instance and connect via WebSocket
//! to verify end-to-end behavior.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use futures_util::{SinkExt, StreamExt};
use starfall_server::config::ServerConfig;
use starfall_server::game_loop::{run_game_loop, GameBroadcast, GameCommand};
use starfall_server::protocol::{ClientMsg, FireProjectileMsg, ServerMsg};
use starfall_server::scoring::{ScoreReport, ScoreReporter};
use starfall_server::ws::AppState;
use starfall_shared::vec3::{Quat, Vec3};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::{connect_async, tungstenite::Message};

type Ws = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

fn test_config() -> ServerConfig {
    let mut config = ServerConfig {
        listen_addr: "127.0.0.1:0".to_string(),
        tick_interval_ms: 4,
        rng_seed: Some(12345),
        ..Default::default()
    };
    // No bodies: nothing can crash into a star by accident
    config.world.body_count = 0;
    config.scoring.endpoint = "http://127.0.0.1:9/newScore".to_string();
    config.scoring.backoff_ms = 20;
    config.scoring.request_timeout_ms = 500;
    config
}

/// Start a test server on a random available port and return its address.
async fn start_test_server(config: ServerConfig) -> String {
    let listener = TcpListener::bind(&config.listen_addr).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let (game_tx, game_rx) = mpsc::channel::<GameCommand>(256);
    let (broadcast_tx, _) = broadcast::channel::<GameBroadcast>(config.broadcast_capacity);

    let app_state = AppState::new(game_tx, broadcast_tx.clone(), config.max_message_bytes);

    // Start game loop
    let reporter = ScoreReporter::new(config.scoring.clone()).unwrap();
    let game_config = config.clone();
    tokio::spawn(async move {
        run_game_loop(game_rx, broadcast_tx, game_config, reporter).await;
    });

    // Start HTTP/WebSocket server
    let app = starfall_server::http::router(app_state, None);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    addr.to_string()
}

async fn connect(addr: &str, token: Option<&str>) -> Ws {
    let url = match token {
        Some(t) => format!("ws://{}/ws?token={}", addr, t),
        None => format!("ws://{}/ws", addr),
    };
    let (ws, _) = connect_async(url).await.expect("Failed to connect");
    ws
}

async fn send(ws: &mut Ws, msg: &ClientMsg) {
    let json = serde_json::to_string(msg).unwrap();
    ws.send(Message::Text(json.into())).await.unwrap();
}

/// Read the next text message and parse as ServerMsg.
async fn recv_msg(ws: &mut Ws) -> ServerMsg {
    loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => {
                return serde_json::from_str(&text).expect("Failed to parse server message");
            }
            Some(Ok(_)) => continue, // Skip ping/pong
            Some(Err(e)) => panic!("WebSocket error: {}", e),
            None => panic!("WebSocket closed unexpectedly"),
        }
    }
}

/// Skip messages until `pick` accepts one, or give up after `timeout`.
async fn recv_until<T>(
    ws: &mut Ws,
    timeout: Duration,
    mut pick: impl FnMut(ServerMsg) -> Option<T>,
) -> Option<T> {
    tokio::time::timeout(timeout, async {
        loop {
            if let Some(found) = pick(recv_msg(ws).await) {
                return found;
            }
        }
    })
    .await
    .ok()
}

/// Request a ship and wait for the init snapshot. Returns the player id.
async fn join(ws: &mut Ws) -> (String, Vec<starfall_server::protocol::ShipWire>) {
    send(ws, &ClientMsg::NewShip).await;
    recv_until(ws, Duration::from_secs(2), |msg| match msg {
        ServerMsg::Init(init) => Some((init.player_id, init.ships)),
        _ => None,
    })
    .await
    .expect("init snapshot")
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let addr = start_test_server(test_config()).await;
    let response = reqwest::get(format!("http://{}/health", addr)).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "Server is up and running!");
}

#[tokio::test]
async fn test_new_ship_receives_init_snapshot() {
    let mut config = test_config();
    config.world.body_count = 12;
    let addr = start_test_server(config).await;
    let mut ws = connect(&addr, None).await;

    send(&mut ws, &ClientMsg::NewShip).await;
    let init = recv_until(&mut ws, Duration::from_secs(2), |msg| match msg {
        ServerMsg::Init(init) => Some(init),
        _ => None,
    })
    .await
    .expect("init snapshot");

    assert_eq!(init.player_id.len(), 9);
    assert_eq!(init.planets.len(), 12);
    assert!(init.ships.iter().any(|s| s.id == init.player_id));
    assert!(init.projectiles.is_empty());
}

#[tokio::test]
async fn test_other_clients_are_told_about_new_ship() {
    let addr = start_test_server(test_config()).await;
    let mut ws1 = connect(&addr, None).await;
    let mut ws2 = connect(&addr, None).await;

    let (id1, _) = join(&mut ws1).await;
    let (id2, ships) = join(&mut ws2).await;
    assert_ne!(id1, id2, "Each client should get a unique ID");
    assert!(ships.iter().any(|s| s.id == id1));

    let announced = recv_until(&mut ws1, Duration::from_secs(2), |msg| match msg {
        ServerMsg::NewShip { ship } => Some(ship.id),
        _ => None,
    })
    .await;
    assert_eq!(announced.as_deref(), Some(id2.as_str()));
}

#[tokio::test]
async fn test_malformed_message_keeps_connection_open() {
    let addr = start_test_server(test_config()).await;
    let mut ws = connect(&addr, None).await;

    for _ in 0..10 {
        ws.send(Message::Text("not valid json".into())).await.unwrap();
    }
    ws.send(Message::Text(r#"{"type":"updateShip","id":"x","position":{"x":"a"}}"#.into()))
        .await
        .unwrap();

    let (id, _) = join(&mut ws).await;
    assert!(!id.is_empty());
}

#[tokio::test]
async fn test_disconnect_removes_ship_for_others() {
    let addr = start_test_server(test_config()).await;
    let mut ws1 = connect(&addr, None).await;
    let mut ws2 = connect(&addr, None).await;

    let (id1, _) = join(&mut ws1).await;
    let _ = join(&mut ws2).await;

    ws1.close(None).await.unwrap();

    let removed = recv_until(&mut ws2, Duration::from_secs(2), |msg| match msg {
        ServerMsg::RemoveShip { id } if id == id1 => Some(()),
        _ => None,
    })
    .await;
    assert!(removed.is_some(), "Disconnected ship should be removed");
}

#[tokio::test]
async fn test_game_state_is_throttled() {
    let addr = start_test_server(test_config()).await;
    let mut ws = connect(&addr, None).await;
    let (id, _) = join(&mut ws).await;

    let first = recv_until(&mut ws, Duration::from_secs(1), |msg| match msg {
        ServerMsg::UpdateGameState(state) => Some(state),
        _ => None,
    })
    .await
    .expect("updateGameState");
    assert!(first.ships.iter().any(|s| s.id == id));

    // At most one per 50 ms is generated; allow slack for delivery bunching
    let mut count = 0;
    let window = tokio::time::sleep(Duration::from_millis(500));
    tokio::pin!(window);
    loop {
        tokio::select! {
            _ = &mut window => break,
            msg = recv_msg(&mut ws) => {
                if matches!(msg, ServerMsg::UpdateGameState(_)) {
                    count += 1;
                }
            }
        }
    }
    assert!(count >= 5, "only {} state broadcasts", count);
    assert!(count <= 12, "{} state broadcasts in 500 ms", count);
}

#[tokio::test]
async fn test_update_ship_is_relayed() {
    let addr = start_test_server(test_config()).await;
    let mut ws1 = connect(&addr, None).await;
    let mut ws2 = connect(&addr, None).await;
    let (id1, _) = join(&mut ws1).await;
    let _ = join(&mut ws2).await;

    let update = serde_json::json!({
        "type": "updateShip",
        "id": id1,
        "position": {"x": 42.0, "y": -7.0, "z": 3.5},
        "rotationQuaternion": {"x": 0.0, "y": 0.0, "z": 0.0, "w": 1.0},
    });
    ws1.send(Message::Text(update.to_string().into())).await.unwrap();

    let pos = recv_until(&mut ws2, Duration::from_secs(2), |msg| match msg {
        ServerMsg::UpdateShip { ship } if ship.id == id1 => Some(ship.position),
        _ => None,
    })
    .await
    .expect("updateShip relayed");
    assert_eq!(pos, Vec3::new(42.0, -7.0, 3.5));
}

/// Scoring stub that fails the first request, then accepts.
#[derive(Clone, Default)]
struct ScoreStub {
    received: Arc<Mutex<Vec<ScoreReport>>>,
}

async fn score_handler(State(stub): State<ScoreStub>, Json(report): Json<ScoreReport>) -> StatusCode {
    let mut received = stub.received.lock().unwrap();
    received.push(report);
    if received.len() == 1 {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    }
}

async fn start_score_stub() -> (String, ScoreStub) {
    let stub = ScoreStub::default();
    let app = axum::Router::new()
        .route("/newScore", axum::routing::post(score_handler))
        .with_state(stub.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}/newScore", addr), stub)
}

#[tokio::test]
async fn test_kill_sequence_and_score_report() {
    let (endpoint, stub) = start_score_stub().await;
    let mut config = test_config();
    config.scoring.endpoint = endpoint;
    let addr = start_test_server(config).await;

    let mut shooter = connect(&addr, Some("pilot-a")).await;
    let mut victim = connect(&addr, Some("pilot-b")).await;
    let (shooter_id, _) = join(&mut shooter).await;
    let (victim_id, ships) = join(&mut victim).await;
    let target = ships
        .iter()
        .find(|s| s.id == victim_id)
        .expect("victim in snapshot")
        .position;

    // 30 health, 10 damage per hit
    for i in 0..3 {
        send(
            &mut shooter,
            &ClientMsg::FireProjectile(FireProjectileMsg {
                id: format!("bullet-{}", i),
                ship_id: shooter_id.clone(),
                position: target,
                rotation_quaternion: Quat::IDENTITY,
                velocity: Vec3::ZERO,
            }),
        )
        .await;
        tokio::time::sleep(Duration::from_millis(30)).await;
    }

    let mut events = Vec::new();
    recv_until(&mut shooter, Duration::from_secs(3), |msg| {
        let done = matches!(&msg, ServerMsg::RemoveShip { id } if *id == victim_id);
        match msg {
            ServerMsg::UpdateShipHealth { id, health } if id == victim_id => {
                events.push(format!("health:{}", health))
            }
            ServerMsg::UpdateKillerKills { id, kills } if id == shooter_id => {
                events.push(format!("kills:{}", kills))
            }
            ServerMsg::RemoveShip { id } if id == victim_id => events.push("removed".to_string()),
            _ => {}
        }
        done.then_some(())
    })
    .await
    .expect("victim removed");

    assert_eq!(
        events,
        vec!["health:20", "health:10", "kills:1", "health:0", "removed"]
    );

    // First POST fails, the retry succeeds
    let mut attempts = 0;
    for _ in 0..100 {
        attempts = stub.received.lock().unwrap().len();
        if attempts >= 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(attempts, 2);
    let reports = stub.received.lock().unwrap().clone();
    assert_eq!(
        reports[1],
        ScoreReport {
            user: "pilot-b".to_string(),
            score: 0,
            game: "starfall".to_string(),
        }
    );
}
