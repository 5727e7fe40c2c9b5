use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::connection::ConnId;
use crate::game_loop::{GameBroadcast, GameCommand};
use crate::protocol::{parse_client_msg, ClientMsg, ServerMsg};

/// Header checked when the query string carries no token
pub const TOKEN_HEADER: &str = "x-user-token";

/// Shared app state passed to each WebSocket handler
#[derive(Clone)]
pub struct AppState {
    pub game_tx: mpsc::Sender<GameCommand>,
    pub broadcast_tx: broadcast::Sender<GameBroadcast>,
    pub next_conn_id: Arc<AtomicU64>,
    pub max_message_bytes: usize,
}

impl AppState {
    pub fn new(
        game_tx: mpsc::Sender<GameCommand>,
        broadcast_tx: broadcast::Sender<GameBroadcast>,
        max_message_bytes: usize,
    ) -> Self {
        Self {
            game_tx,
            broadcast_tx,
            next_conn_id: Arc::new(AtomicU64::new(1)),
            max_message_bytes,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ConnectParams {
    pub token: Option<String>,
}

/// Query parameter first, then header.
pub fn identity_token(params: &ConnectParams, headers: &HeaderMap) -> Option<String> {
    params
        .token
        .clone()
        .filter(|t| !t.is_empty())
        .or_else(|| {
            headers
                .get(TOKEN_HEADER)
                .and_then(|v| v.to_str().ok())
                .filter(|t| !t.is_empty())
                .map(str::to_string)
        })
}

/// HTTP handler for WebSocket upgrade
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<ConnectParams>,
    headers: HeaderMap,
    State(app_state): State<AppState>,
) -> impl IntoResponse {
    let token = identity_token(&params, &headers);
    if token.is_none() {
        tracing::warn!("No user token received");
    }
    ws.max_message_size(app_state.max_message_bytes)
        .on_upgrade(move |socket| handle_socket(socket, app_state, token))
}

type WsSink = SplitSink<WebSocket, Message>;

/// Serialize and send one message. Err means the transport is gone.
async fn send_msg(sink: &mut WsSink, msg: &ServerMsg) -> Result<(), axum::Error> {
    match serde_json::to_string(msg) {
        Ok(json) => sink.send(Message::Text(json.into())).await,
        Err(e) => {
            tracing::error!("Failed to serialize outbound message: {}", e);
            Ok(())
        }
    }
}

async fn handle_socket(socket: WebSocket, app_state: AppState, token: Option<String>) {
    let (mut sink, mut stream) = socket.split();
    let conn_id: ConnId = app_state.next_conn_id.fetch_add(1, Ordering::Relaxed);

    if app_state
        .game_tx
        .send(GameCommand::Connect { conn_id, token })
        .await
        .is_err()
    {
        tracing::error!("Failed to send Connect command");
        return;
    }

    // Subscribe to broadcasts
    let mut broadcast_rx = app_state.broadcast_tx.subscribe();

    loop {
        tokio::select! {
            // Client -> Server
            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let client_msg = match parse_client_msg(&text) {
                            Ok(m) => m,
                            Err(e) => {
                                tracing::warn!(conn = conn_id, "Ignoring message: {}", e);
                                continue;
                            }
                        };
                        let cmd = match client_msg {
                            ClientMsg::NewShip => {
                                let (resp_tx, resp_rx) = oneshot::channel();
                                if app_state
                                    .game_tx
                                    .send(GameCommand::NewShip { conn_id, response: resp_tx })
                                    .await
                                    .is_err()
                                {
                                    break;
                                }
                                match resp_rx.await {
                                    Ok(init) => {
                                        if send_msg(&mut sink, &ServerMsg::Init(init)).await.is_err() {
                                            break;
                                        }
                                    }
                                    Err(_) => tracing::warn!(conn = conn_id, "No init received"),
                                }
                                continue;
                            }
                            ClientMsg::UpdateShip(m) => GameCommand::UpdateShip(m),
                            ClientMsg::FireProjectile(m) => GameCommand::FireProjectile(m),
                            ClientMsg::AddParticle { particle } => GameCommand::AddParticle(particle),
                        };
                        if app_state.game_tx.send(cmd).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::warn!(conn = conn_id, "WebSocket error: {}", e);
                        break;
                    }
                    _ => {} // Ignore ping/pong/binary
                }
            }

            // Server -> Client (broadcast)
            result = broadcast_rx.recv() => {
                match result {
                    Ok(broadcast) => {
                        if !broadcast.is_for(conn_id) {
                            continue;
                        }
                        if let Err(e) = send_msg(&mut sink, &broadcast.msg).await {
                            tracing::warn!(conn = conn_id, "Send failed: {}", e);
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        // Next updateGameState resyncs the client
                        tracing::warn!(conn = conn_id, "Lagged by {} messages", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    // Reap the ship; the socket closes when both halves drop
    let _ = app_state
        .game_tx
        .send(GameCommand::Disconnect { conn_id })
        .await;
}
