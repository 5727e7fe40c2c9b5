use starfall_shared::config::WorldConfig;
use starfall_shared::protocol::{FireProjectileMsg, ProjectileWire};
use starfall_shared::vec3::{self, max_abs_component, Quat, Vec3};

/// Capsule-like proxy: radius across, length along the flight axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectileHitbox {
    pub radius: f64,
    pub length: f64,
}

#[derive(Debug, Clone)]
pub struct Projectile {
    pub id: String,
    /// Ship that fired it; never hit by its own shot
    pub ship_id: String,
    pub position: Vec3,
    pub velocity: Vec3,
    pub rotation: Quat,
    /// Loop clock (ms) at creation
    pub spawn_time: u64,
    pub life_time: u64,
    /// Cleared on expiry, out-of-bounds or hit; invisible shots are pruned
    pub visible: bool,
    pub hitbox: ProjectileHitbox,
}

impl Projectile {
    pub fn from_fire(msg: &FireProjectileMsg, now_ms: u64, config: &WorldConfig) -> Self {
        Self {
            id: msg.id.clone(),
            ship_id: msg.ship_id.clone(),
            position: msg.position,
            velocity: msg.velocity,
            rotation: msg.rotation_quaternion,
            spawn_time: now_ms,
            life_time: config.projectile_life_ms as u64,
            visible: true,
            hitbox: ProjectileHitbox {
                radius: config.projectile_radius,
                length: config.projectile_length,
            },
        }
    }

    /// Advance by `dt` seconds and retire the shot if it expired or left the world.
    pub fn update(&mut self, dt: f64, now_ms: u64, max_coord: f64) {
        self.position = vec3::add(self.position, vec3::scale(self.velocity, dt));
        if now_ms.saturating_sub(self.spawn_time) > self.life_time {
            self.life_time = 0;
            self.visible = false;
        }
        if max_abs_component(self.position) > max_coord {
            self.visible = false;
        }
    }

    pub fn to_wire(&self) -> ProjectileWire {
        ProjectileWire {
            id: self.id.clone(),
            ship_id: self.ship_id.clone(),
            position: self.position,
            rotation_quaternion: self.rotation,
            velocity: self.velocity,
            visible: self.visible,
        }
    }
}
