use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::Instant;

use crate::config::ServerConfig;
use crate::connection::{ConnId, ConnectionManager};
use crate::protocol::{FireProjectileMsg, InitMsg, ParticleSpawn, ServerMsg, UpdateShipMsg};
use crate::scoring::ScoreReporter;
use crate::world::{DeathRecord, World};

/// Commands from client connections to the game loop
pub enum GameCommand {
    Connect {
        conn_id: ConnId,
        token: Option<String>,
    },
    NewShip {
        conn_id: ConnId,
        response: oneshot::Sender<InitMsg>,
    },
    UpdateShip(UpdateShipMsg),
    FireProjectile(FireProjectileMsg),
    AddParticle(ParticleSpawn),
    Disconnect {
        conn_id: ConnId,
    },
}

/// Which connections a broadcast is meant for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    All,
    AllExcept(ConnId),
}

/// Broadcasts from game loop to all clients
#[derive(Debug, Clone)]
pub struct GameBroadcast {
    pub audience: Audience,
    pub msg: Arc<ServerMsg>,
}

impl GameBroadcast {
    pub fn is_for(&self, conn_id: ConnId) -> bool {
        match self.audience {
            Audience::All => true,
            Audience::AllExcept(excluded) => excluded != conn_id,
        }
    }
}

/// Rate limit for the full-state broadcast, independent of the tick rate.
#[derive(Debug, Clone)]
pub struct BroadcastThrottle {
    interval_ms: u64,
    last_ms: u64,
}

impl BroadcastThrottle {
    pub fn new(interval_ms: u64, start_ms: u64) -> Self {
        Self {
            interval_ms,
            last_ms: start_ms,
        }
    }

    /// True only once strictly more than one interval has passed since the
    /// last emission; arms the next window when it fires.
    pub fn ready(&mut self, now_ms: u64) -> bool {
        if now_ms.saturating_sub(self.last_ms) > self.interval_ms {
            self.last_ms = now_ms;
            true
        } else {
            false
        }
    }
}

/// World plus session registry, driven by the loop task.
pub struct Game {
    pub world: World,
    pub connections: ConnectionManager,
    broadcast_tx: broadcast::Sender<GameBroadcast>,
    throttle: BroadcastThrottle,
}

impl Game {
    pub fn new(config: &ServerConfig, broadcast_tx: broadcast::Sender<GameBroadcast>) -> Self {
        Self::with_world(
            World::new(config.world.clone(), config.rng_seed),
            broadcast_tx,
        )
    }

    pub fn with_world(world: World, broadcast_tx: broadcast::Sender<GameBroadcast>) -> Self {
        let throttle = BroadcastThrottle::new(world.config.broadcast_interval_ms as u64, 0);
        Self {
            world,
            connections: ConnectionManager::new(),
            broadcast_tx,
            throttle,
        }
    }

    /// Best effort: no subscribers is not an error.
    fn send(&self, audience: Audience, msg: ServerMsg) {
        let _ = self.broadcast_tx.send(GameBroadcast {
            audience,
            msg: Arc::new(msg),
        });
    }

    /// Run one connection event to completion.
    pub fn handle_command(&mut self, cmd: GameCommand, now_ms: u64) {
        match cmd {
            GameCommand::Connect { conn_id, token } => {
                self.connections.connect(conn_id, token);
            }
            GameCommand::NewShip { conn_id, response } => {
                let Some(assignment) = self.connections.new_ship(conn_id, &mut self.world) else {
                    tracing::warn!(conn = conn_id, "newShip from unregistered connection");
                    return;
                };
                if let Some(removal) = assignment.replaced {
                    self.send(Audience::All, removal);
                }
                if response.send(assignment.init).is_err() {
                    tracing::debug!(conn = conn_id, "Connection gone before init");
                }
                self.send(
                    Audience::AllExcept(conn_id),
                    ServerMsg::NewShip {
                        ship: assignment.ship,
                    },
                );
            }
            GameCommand::UpdateShip(msg) => match self.world.update_ship(&msg) {
                Some(ship) => self.send(Audience::All, ServerMsg::UpdateShip { ship }),
                None => tracing::debug!(ship_id = %msg.id, "updateShip for unknown ship"),
            },
            GameCommand::FireProjectile(msg) => match self.world.add_projectile(&msg, now_ms) {
                Some(projectile) => {
                    self.send(Audience::All, ServerMsg::NewProjectile { projectile })
                }
                None => tracing::debug!(
                    projectile_id = %msg.id,
                    ship_id = %msg.ship_id,
                    "fireProjectile ignored"
                ),
            },
            GameCommand::AddParticle(spawn) => match self.world.add_particle(&spawn, now_ms) {
                Some(particle) => self.send(Audience::All, ServerMsg::NewParticle { particle }),
                None => tracing::debug!(particle_id = %spawn.id, "Duplicate particle ignored"),
            },
            GameCommand::Disconnect { conn_id } => {
                if let Some(ship_id) = self.connections.disconnect(conn_id, &mut self.world) {
                    self.send(Audience::All, ServerMsg::RemoveShip { id: ship_id });
                }
            }
        }
    }

    /// Advance the world by `dt` seconds, emit immediate events, and the
    /// full state when the throttle allows. Returns the ships that died.
    pub fn step(&mut self, dt: f64, now_ms: u64) -> Vec<DeathRecord> {
        let outcome = self.world.tick(dt, now_ms);

        for msg in outcome.messages {
            self.send(Audience::All, msg);
        }
        for death in &outcome.deaths {
            self.connections.ship_destroyed(&death.ship_id);
        }

        if self.throttle.ready(now_ms) {
            self.send(
                Audience::All,
                ServerMsg::UpdateGameState(self.world.game_state()),
            );
        }

        outcome.deaths
    }
}

fn clock_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// Run the main game loop. Owns all game state.
pub async fn run_game_loop(
    mut cmd_rx: mpsc::Receiver<GameCommand>,
    broadcast_tx: broadcast::Sender<GameBroadcast>,
    config: ServerConfig,
    reporter: ScoreReporter,
) {
    let mut game = Game::new(&config, broadcast_tx);
    tracing::info!(
        bodies = game.world.bodies.len(),
        stars = game.world.bodies.iter().filter(|b| b.is_star).count(),
        "World generated"
    );

    let start = Instant::now();
    let mut last_tick = start;

    // Paced wake-up instead of a spin; dt below is measured, not assumed
    let mut tick_interval = tokio::time::interval(Duration::from_millis(config.tick_interval_ms));
    tick_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = tick_interval.tick() => {
                let now = Instant::now();
                let dt = now.duration_since(last_tick).as_secs_f64();
                last_tick = now;

                for death in game.step(dt, clock_ms(start)) {
                    reporter.spawn(reporter.report_for(&death.token, death.kills));
                }
            }

            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(cmd) => game.handle_command(cmd, clock_ms(start)),
                    None => break,
                }
            }
        }
    }

    tracing::info!("Game loop ended");
}
