//! Load test for the Starfall server.
//!
//! Spawns multiple fake WebSocket clients that:
//! - Connect and request a ship
//! - Stream pose updates and fire projectiles
//! - Respawn when their ship is destroyed
//! - Count updateGameState broadcasts
//!
//! Usage: cargo run --bin loadtest -- [OPTIONS]
//!
//! Options:
//!   --clients N      Number of clients to spawn (default: 50)
//!   --duration S     Test duration in seconds (default: 30)
//!   --fire-rate R    Shots per second per client (default: 2)
//!   --url URL        Server URL (default: ws://127.0.0.1:22220/ws)

use futures_util::{SinkExt, StreamExt};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use starfall_server::protocol::{ClientMsg, FireProjectileMsg, ServerMsg, UpdateShipMsg};
use starfall_shared::vec3::{Quat, Vec3};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// Pose updates per second per client
const POSE_RATE_HZ: f64 = 20.0;
const SHOT_SPEED: f64 = 200.0;

// === Metrics ===

#[derive(Default)]
struct Metrics {
    connected: AtomicU64,
    messages_received: AtomicU64,
    game_states_received: AtomicU64,
    ships_seen: AtomicU64,
    projectiles_fired: AtomicU64,
    deaths: AtomicU64,
    errors: AtomicU64,
    latency_sum_ms: AtomicU64,
    latency_count: AtomicU64,
}

fn encode(msg: &ClientMsg) -> Message {
    // ClientMsg only holds strings and finite floats
    Message::Text(serde_json::to_string(msg).unwrap_or_default().into())
}

// === Client task ===

async fn run_client(
    client_id: u32,
    url: String,
    fire_rate: f64,
    duration: Duration,
    metrics: Arc<Metrics>,
) {
    let connect_start = Instant::now();
    let url = format!("{}?token=loadtest-{}", url, client_id);

    let (mut ws, _) = match connect_async(&url).await {
        Ok(conn) => conn,
        Err(e) => {
            if client_id < 5 {
                eprintln!("Client {} failed to connect: {}", client_id, e);
            }
            metrics.errors.fetch_add(1, Ordering::Relaxed);
            return;
        }
    };

    metrics
        .latency_sum_ms
        .fetch_add(connect_start.elapsed().as_millis() as u64, Ordering::Relaxed);
    metrics.latency_count.fetch_add(1, Ordering::Relaxed);
    metrics.connected.fetch_add(1, Ordering::Relaxed);

    if ws.send(encode(&ClientMsg::NewShip)).await.is_err() {
        metrics.errors.fetch_add(1, Ordering::Relaxed);
        metrics.connected.fetch_sub(1, Ordering::Relaxed);
        return;
    }

    let mut rng = ChaCha8Rng::seed_from_u64(client_id as u64);
    let mut ship_id: Option<String> = None;
    let mut position = Vec3::ZERO;
    let mut shot_seq: u64 = 0;
    // Circle the spawn point at a random phase
    let mut phase: f64 = rng.gen::<f64>() * std::f64::consts::TAU;

    let mut pose_timer = tokio::time::interval(Duration::from_secs_f64(1.0 / POSE_RATE_HZ));
    pose_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let fire_interval = if fire_rate > 0.0 {
        Duration::from_secs_f64(1.0 / fire_rate)
    } else {
        Duration::from_secs(3600) // Effectively never
    };
    let mut fire_timer = tokio::time::interval(fire_interval);
    fire_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let test_end = Instant::now() + duration;

    loop {
        if Instant::now() >= test_end {
            break;
        }

        tokio::select! {
            _ = pose_timer.tick() => {
                let Some(id) = ship_id.clone() else { continue };
                phase += 0.05;
                let velocity = Vec3::new(-phase.sin() * 40.0, 0.0, phase.cos() * 40.0);
                position = Vec3::new(
                    position.x + velocity.x / POSE_RATE_HZ,
                    position.y,
                    position.z + velocity.z / POSE_RATE_HZ,
                );
                let msg = ClientMsg::UpdateShip(UpdateShipMsg {
                    id,
                    position: Some(position),
                    rotation_quaternion: Some(Quat::IDENTITY),
                    velocity: Some(velocity),
                });
                if ws.send(encode(&msg)).await.is_err() {
                    metrics.errors.fetch_add(1, Ordering::Relaxed);
                    break;
                }
            }

            _ = fire_timer.tick() => {
                let Some(id) = ship_id.clone() else { continue };
                shot_seq += 1;
                let dir = Vec3::new(rng.gen::<f64>() - 0.5, rng.gen::<f64>() - 0.5, rng.gen::<f64>() - 0.5);
                let msg = ClientMsg::FireProjectile(FireProjectileMsg {
                    id: format!("bullet-{}-{}", client_id, shot_seq),
                    ship_id: id,
                    position,
                    rotation_quaternion: Quat::IDENTITY,
                    velocity: starfall_shared::vec3::scale(
                        starfall_shared::vec3::normalize(dir),
                        SHOT_SPEED,
                    ),
                });
                if ws.send(encode(&msg)).await.is_ok() {
                    metrics.projectiles_fired.fetch_add(1, Ordering::Relaxed);
                } else {
                    metrics.errors.fetch_add(1, Ordering::Relaxed);
                    break;
                }
            }

            msg = ws.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        metrics.messages_received.fetch_add(1, Ordering::Relaxed);
                        let Ok(server_msg) = serde_json::from_str::<ServerMsg>(&text) else {
                            continue;
                        };
                        match server_msg {
                            ServerMsg::Init(init) => {
                                if let Some(me) = init.ships.iter().find(|s| s.id == init.player_id) {
                                    position = me.position;
                                }
                                if client_id < 3 {
                                    eprintln!("Client {} flying {}", client_id, init.player_id);
                                }
                                ship_id = Some(init.player_id);
                            }
                            ServerMsg::UpdateGameState(state) => {
                                metrics.game_states_received.fetch_add(1, Ordering::Relaxed);
                                metrics.ships_seen.fetch_add(state.ships.len() as u64, Ordering::Relaxed);
                            }
                            ServerMsg::TeleportShip { ship } if Some(&ship.id) == ship_id.as_ref() => {
                                position = ship.position;
                            }
                            ServerMsg::RemoveShip { id } if Some(&id) == ship_id.as_ref() => {
                                metrics.deaths.fetch_add(1, Ordering::Relaxed);
                                ship_id = None;
                                if ws.send(encode(&ClientMsg::NewShip)).await.is_err() {
                                    metrics.errors.fetch_add(1, Ordering::Relaxed);
                                    break;
                                }
                            }
                            _ => {}
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        if client_id < 3 {
                            eprintln!("Client {} error: {}", client_id, e);
                        }
                        metrics.errors.fetch_add(1, Ordering::Relaxed);
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    let _ = ws.close(None).await;
    metrics.connected.fetch_sub(1, Ordering::Relaxed);
}

// === Main ===

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();

    let mut num_clients: u32 = 50;
    let mut duration_secs: u64 = 30;
    let mut fire_rate: f64 = 2.0;
    let mut url = "ws://127.0.0.1:22220/ws".to_string();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--clients" => {
                i += 1;
                num_clients = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(50);
            }
            "--duration" => {
                i += 1;
                duration_secs = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(30);
            }
            "--fire-rate" => {
                i += 1;
                fire_rate = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(2.0);
            }
            "--url" => {
                i += 1;
                url = args.get(i).cloned().unwrap_or(url);
            }
            _ => {}
        }
        i += 1;
    }

    println!("=== Starfall Server Load Test ===");
    println!("Clients: {}", num_clients);
    println!("Duration: {}s", duration_secs);
    println!("Fire rate: {}/s per client", fire_rate);
    println!("URL: {}", url);
    println!();

    let metrics = Arc::new(Metrics::default());
    let duration = Duration::from_secs(duration_secs);
    let mut handles = Vec::with_capacity(num_clients as usize);

    for client_id in 0..num_clients {
        let url = url.clone();
        let metrics = Arc::clone(&metrics);
        handles.push(tokio::spawn(async move {
            run_client(client_id, url, fire_rate, duration, metrics).await;
        }));

        // Stagger spawns slightly to avoid thundering herd
        if client_id % 50 == 49 {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    // Print stats periodically
    let metrics_clone = Arc::clone(&metrics);
    let stats_handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(5));
        let start = Instant::now();
        loop {
            interval.tick().await;
            println!(
                "[{:3}s] connected={}, msgs={}, game_states={}, fired={}, deaths={}, errors={}",
                start.elapsed().as_secs(),
                metrics_clone.connected.load(Ordering::Relaxed),
                metrics_clone.messages_received.load(Ordering::Relaxed),
                metrics_clone.game_states_received.load(Ordering::Relaxed),
                metrics_clone.projectiles_fired.load(Ordering::Relaxed),
                metrics_clone.deaths.load(Ordering::Relaxed),
                metrics_clone.errors.load(Ordering::Relaxed),
            );
        }
    });

    for handle in handles {
        let _ = handle.await;
    }
    stats_handle.abort();

    let game_states = metrics.game_states_received.load(Ordering::Relaxed);
    let ships_seen = metrics.ships_seen.load(Ordering::Relaxed);
    let latency_sum = metrics.latency_sum_ms.load(Ordering::Relaxed);
    let latency_count = metrics.latency_count.load(Ordering::Relaxed);

    println!();
    println!("=== Final Results ===");
    println!(
        "Total messages received: {}",
        metrics.messages_received.load(Ordering::Relaxed)
    );
    println!("Total updateGameState messages: {}", game_states);
    println!(
        "Total projectiles fired: {}",
        metrics.projectiles_fired.load(Ordering::Relaxed)
    );
    println!("Total deaths: {}", metrics.deaths.load(Ordering::Relaxed));
    println!("Total errors: {}", metrics.errors.load(Ordering::Relaxed));
    if game_states > 0 {
        println!("Average ships per state: {}", ships_seen / game_states);
    }
    if latency_count > 0 {
        println!("Average connect latency: {}ms", latency_sum / latency_count);
    }

    // Full state is capped at 20 Hz
    let expected = duration_secs as f64 * 20.0;
    let per_client = game_states as f64 / num_clients.max(1) as f64;
    println!("Game states per client: {:.1} (max {:.0})", per_client, expected);
    println!("Delivery rate: {:.1}%", per_client / expected.max(1.0) * 100.0);
}
