use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use starfall_shared::config::WorldConfig;
use starfall_shared::protocol::{
    FireProjectileMsg, GameStateMsg, InitMsg, ParticleSpawn, ParticleWire, ProjectileWire,
    ServerMsg, ShipWire, UpdateShipMsg,
};
use std::collections::HashMap;

use crate::celestial::{generate_bodies, CelestialBody};
use crate::collision::{can_hit, check_collision_with_planet, total_gravity};
use crate::particle::Particle;
use crate::projectile::Projectile;
use crate::ship::{random_ship_id, random_spawn_position, Ship};

/// Bodies are scattered over half the playable cube
const BODY_FIELD_RATIO: f64 = 0.5;

/// A destroyed ship, kept just long enough to report its score
#[derive(Debug, Clone, PartialEq)]
pub struct DeathRecord {
    pub ship_id: String,
    pub token: String,
    pub kills: u32,
}

/// Everything one tick produced, in emission order.
#[derive(Debug, Default)]
pub struct TickOutcome {
    /// Sent immediately, outside the state-broadcast throttle
    pub messages: Vec<ServerMsg>,
    pub deaths: Vec<DeathRecord>,
}

/// Central simulation state owned by the game loop task.
pub struct World {
    pub config: WorldConfig,
    pub ships: HashMap<String, Ship>,
    pub projectiles: HashMap<String, Projectile>,
    pub particles: HashMap<String, Particle>,
    pub bodies: Vec<CelestialBody>,
    rng: ChaCha8Rng,
}

impl World {
    pub fn new(config: WorldConfig, rng_seed: Option<u64>) -> Self {
        let mut rng = match rng_seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let bodies = generate_bodies(
            config.body_count as usize,
            config.max_coord * BODY_FIELD_RATIO,
            &mut rng,
        );
        Self::with_bodies(config, bodies, rng)
    }

    /// World with a fixed set of bodies
    pub fn with_bodies(config: WorldConfig, bodies: Vec<CelestialBody>, rng: ChaCha8Rng) -> Self {
        Self {
            config,
            ships: HashMap::new(),
            projectiles: HashMap::new(),
            particles: HashMap::new(),
            bodies,
            rng,
        }
    }

    /// Spawn a ship at a random point near the origin. Returns its id.
    pub fn spawn_ship(&mut self, token: &str) -> String {
        let mut id = random_ship_id(&mut self.rng);
        while self.ships.contains_key(&id) {
            id = random_ship_id(&mut self.rng);
        }
        let position = random_spawn_position(&mut self.rng, self.config.spawn_radius);
        let ship = Ship::new(id.clone(), position, token.to_string(), &self.config);
        tracing::info!(ship_id = %id, user = %token, "Ship spawned");
        self.ships.insert(id.clone(), ship);
        id
    }

    pub fn remove_ship(&mut self, id: &str) -> Option<Ship> {
        self.ships.remove(id)
    }

    /// Apply a client pose report. None if the ship does not exist.
    pub fn update_ship(&mut self, msg: &UpdateShipMsg) -> Option<ShipWire> {
        let ship = self.ships.get_mut(&msg.id)?;
        ship.apply_update(msg);
        Some(ship.to_wire())
    }

    /// Register a shot from a live ship. Duplicate ids are ignored.
    pub fn add_projectile(&mut self, msg: &FireProjectileMsg, now_ms: u64) -> Option<ProjectileWire> {
        if !self.ships.contains_key(&msg.ship_id) || self.projectiles.contains_key(&msg.id) {
            return None;
        }
        let projectile = Projectile::from_fire(msg, now_ms, &self.config);
        let wire = projectile.to_wire();
        tracing::debug!(projectile_id = %msg.id, ship_id = %msg.ship_id, "Projectile added");
        self.projectiles.insert(msg.id.clone(), projectile);
        Some(wire)
    }

    /// Register a particle. Duplicate ids are ignored.
    pub fn add_particle(&mut self, spawn: &ParticleSpawn, now_ms: u64) -> Option<ParticleWire> {
        if self.particles.contains_key(&spawn.id) {
            return None;
        }
        let particle = Particle::from_spawn(spawn, now_ms, &self.config);
        let wire = particle.to_wire();
        self.particles.insert(spawn.id.clone(), particle);
        Some(wire)
    }

    /// Advance the simulation by `dt` seconds.
    pub fn tick(&mut self, dt: f64, now_ms: u64) -> TickOutcome {
        let mut outcome = TickOutcome::default();
        let max_coord = self.config.max_coord;
        let cooldown = self.config.teleport_cooldown_ms as u64;

        for ship in self.ships.values_mut() {
            if self.config.server_gravity {
                ship.acceleration = total_gravity(&self.bodies, ship.position);
            }
            ship.integrate(dt);
            if ship.try_teleport(max_coord, now_ms, cooldown) {
                tracing::info!(ship_id = %ship.id, "Ship teleported to the opposite side");
                outcome.messages.push(ServerMsg::TeleportShip {
                    ship: ship.to_wire(),
                });
            }
        }

        for projectile in self.projectiles.values_mut() {
            projectile.update(dt, now_ms, max_coord);
        }
        for particle in self.particles.values_mut() {
            particle.update(dt, now_ms);
        }

        // Ships destroyed this tick, in order of destruction
        let mut doomed: Vec<String> = Vec::new();

        for ship in self.ships.values() {
            if let Some(star) = self
                .bodies
                .iter()
                .find(|b| b.is_star && check_collision_with_planet(ship, b))
            {
                tracing::info!(ship_id = %ship.id, star_id = %star.id, "Ship collided with star");
                doomed.push(ship.id.clone());
            }
        }

        let damage = self.config.projectile_damage;
        for projectile in self.projectiles.values_mut() {
            for ship in self.ships.values_mut() {
                if ship.is_destroyed() || doomed.contains(&ship.id) || !can_hit(ship, projectile) {
                    continue;
                }
                let health = ship.take_hit(damage, &projectile.ship_id);
                projectile.visible = false;
                tracing::info!(
                    ship_id = %ship.id,
                    projectile_id = %projectile.id,
                    health,
                    "Ship hit"
                );
                if ship.is_destroyed() {
                    doomed.push(ship.id.clone());
                } else {
                    outcome.messages.push(ServerMsg::UpdateShipHealth {
                        id: ship.id.clone(),
                        health,
                    });
                }
                break;
            }
        }

        for id in doomed {
            if let Some(death) = self.destroy_ship(&id, &mut outcome.messages) {
                outcome.deaths.push(death);
            }
        }

        self.projectiles.retain(|_, p| p.visible);
        self.particles.retain(|_, p| !p.is_expired());

        outcome
    }

    /// Alive -> Destroyed. Credits the killer, zeroes health on the wire,
    /// then removes the ship. None if the ship is already gone.
    pub fn destroy_ship(&mut self, id: &str, messages: &mut Vec<ServerMsg>) -> Option<DeathRecord> {
        let ship = self.ships.remove(id)?;
        tracing::info!(ship_id = %id, kills = ship.kills, "Ship destroyed");

        if let Some(killer) = ship
            .last_hit_by
            .as_deref()
            .and_then(|killer_id| self.ships.get_mut(killer_id))
        {
            killer.kills += 1;
            tracing::info!(killer_id = %killer.id, victim_id = %id, kills = killer.kills, "Kill credited");
            messages.push(ServerMsg::UpdateKillerKills {
                id: killer.id.clone(),
                kills: killer.kills,
            });
        }

        messages.push(ServerMsg::UpdateShipHealth {
            id: id.to_string(),
            health: 0,
        });
        messages.push(ServerMsg::RemoveShip { id: id.to_string() });

        Some(DeathRecord {
            ship_id: ship.id,
            token: ship.token,
            kills: ship.kills,
        })
    }

    /// Snapshot sent to a connection that just got its ship
    pub fn snapshot(&self, player_id: &str) -> InitMsg {
        InitMsg {
            ships: self.ships.values().map(Ship::to_wire).collect(),
            planets: self.bodies.iter().map(CelestialBody::to_wire).collect(),
            projectiles: self.projectiles.values().map(Projectile::to_wire).collect(),
            player_id: player_id.to_string(),
        }
    }

    /// Full state for the throttled broadcast
    pub fn game_state(&self) -> GameStateMsg {
        GameStateMsg {
            ships: self.ships.values().map(Ship::to_wire).collect(),
            projectiles: self
                .projectiles
                .values()
                .filter(|p| p.visible)
                .map(Projectile::to_wire)
                .collect(),
            planets: self.bodies.iter().map(CelestialBody::to_wire).collect(),
            particles: self.particles.values().map(Particle::to_wire).collect(),
        }
    }
}
