use rand::Rng;
use starfall_shared::config::WorldConfig;
use starfall_shared::protocol::{ShipWire, UpdateShipMsg};
use starfall_shared::vec3::{self, max_abs_component, negate, Quat, Vec3};

/// Axis-aligned box centered on the ship position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShipHitbox {
    pub width: f64,
    pub height: f64,
    pub depth: f64,
}

/// One player ship. Owned by the world; destroyed once health reaches 0.
#[derive(Debug, Clone)]
pub struct Ship {
    pub id: String,
    pub position: Vec3,
    pub velocity: Vec3,
    pub acceleration: Vec3,
    pub rotation: Quat,
    pub health: i32,
    pub hitbox: ShipHitbox,
    pub kills: u32,
    /// Owner of the last projectile that hit this ship
    pub last_hit_by: Option<String>,
    /// Loop clock (ms) of the last teleport
    pub last_teleport_time: Option<u64>,
    /// Identity used only for score attribution
    pub token: String,
}

impl Ship {
    pub fn new(id: String, position: Vec3, token: String, config: &WorldConfig) -> Self {
        let [width, height, depth] = config.ship_hitbox;
        Self {
            id,
            position,
            velocity: Vec3::ZERO,
            acceleration: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            health: config.ship_max_health,
            hitbox: ShipHitbox {
                width,
                height,
                depth,
            },
            kills: 0,
            last_hit_by: None,
            last_teleport_time: None,
            token,
        }
    }

    /// Overwrite the pose with whatever the client reported.
    pub fn apply_update(&mut self, msg: &UpdateShipMsg) {
        if let Some(position) = msg.position {
            self.position = position;
        }
        if let Some(velocity) = msg.velocity {
            self.velocity = velocity;
        }
        if let Some(rotation) = msg.rotation_quaternion {
            self.rotation = rotation;
        }
    }

    /// Semi-implicit Euler step; acceleration is zero unless server gravity is on.
    pub fn integrate(&mut self, dt: f64) {
        self.velocity = vec3::add(self.velocity, vec3::scale(self.acceleration, dt));
        self.position = vec3::add(self.position, vec3::scale(self.velocity, dt));
    }

    pub fn is_destroyed(&self) -> bool {
        self.health <= 0
    }

    /// Apply projectile damage. Health never drops below 0. Returns the new health.
    pub fn take_hit(&mut self, damage: i32, attacker: &str) -> i32 {
        self.health = (self.health - damage).max(0);
        self.last_hit_by = Some(attacker.to_string());
        self.health
    }

    /// Reflect through the origin when any coordinate is past `max_coord`,
    /// at most once per `cooldown_ms`. Returns true when the ship moved.
    pub fn try_teleport(&mut self, max_coord: f64, now_ms: u64, cooldown_ms: u64) -> bool {
        if max_abs_component(self.position) <= max_coord {
            return false;
        }
        if let Some(last) = self.last_teleport_time {
            if now_ms.saturating_sub(last) <= cooldown_ms {
                return false;
            }
        }
        self.position = negate(self.position);
        self.last_teleport_time = Some(now_ms);
        true
    }

    pub fn to_wire(&self) -> ShipWire {
        ShipWire {
            id: self.id.clone(),
            position: self.position,
            rotation_quaternion: self.rotation,
            velocity: self.velocity,
            is_player: false,
            kills: self.kills,
            health: self.health.max(0),
        }
    }
}

/// Uniform distance in [0, max_radius) along a random spherical direction.
pub fn random_spawn_position(rng: &mut impl Rng, max_radius: f64) -> Vec3 {
    let distance = rng.gen::<f64>() * max_radius;
    let azimuth = rng.gen::<f64>() * std::f64::consts::TAU;
    let polar = rng.gen::<f64>() * std::f64::consts::PI;
    Vec3::new(
        distance * polar.sin() * azimuth.cos(),
        distance * polar.sin() * azimuth.sin(),
        distance * polar.cos(),
    )
}

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_LEN: usize = 9;

/// Nine random base-36 characters
pub fn random_ship_id(rng: &mut impl Rng) -> String {
    (0..ID_LEN)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use starfall_shared::vec3::{length, vec3};

    fn ship_at(position: Vec3) -> Ship {
        Ship::new(
            "ship1".to_string(),
            position,
            "anonymous".to_string(),
            &WorldConfig::default(),
        )
    }

    #[test]
    fn new_ship_has_full_health_and_no_kills() {
        let ship = ship_at(Vec3::ZERO);
        assert_eq!(ship.health, 30);
        assert_eq!(ship.kills, 0);
        assert!(ship.last_hit_by.is_none());
        assert_eq!(ship.rotation, Quat::IDENTITY);
        assert_eq!(ship.hitbox.depth, 10.0);
    }

    #[test]
    fn spawn_positions_stay_inside_radius() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..1000 {
            let p = random_spawn_position(&mut rng, 500.0);
            assert!(length(p) < 500.0 + 1e-9);
        }
    }

    #[test]
    fn ship_ids_are_nine_base36_chars() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let id = random_ship_id(&mut rng);
        assert_eq!(id.len(), 9);
        assert!(id
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
        assert_ne!(id, random_ship_id(&mut rng));
    }

    #[test]
    fn integrate_moves_by_velocity() {
        let mut ship = ship_at(vec3(1.0, 2.0, 3.0));
        ship.velocity = vec3(10.0, 0.0, -20.0);
        ship.integrate(0.5);
        assert_eq!(ship.position, vec3(6.0, 2.0, -7.0));
    }

    #[test]
    fn health_is_clamped_at_zero() {
        let mut ship = ship_at(Vec3::ZERO);
        assert_eq!(ship.take_hit(10, "a"), 20);
        assert_eq!(ship.take_hit(25, "b"), 0);
        assert!(ship.is_destroyed());
        assert_eq!(ship.last_hit_by.as_deref(), Some("b"));
        assert_eq!(ship.to_wire().health, 0);
    }

    #[test]
    fn partial_update_keeps_missing_fields() {
        let mut ship = ship_at(vec3(1.0, 1.0, 1.0));
        ship.velocity = vec3(5.0, 0.0, 0.0);
        ship.apply_update(&UpdateShipMsg {
            id: "ship1".to_string(),
            position: Some(vec3(9.0, 8.0, 7.0)),
            rotation_quaternion: None,
            velocity: None,
        });
        assert_eq!(ship.position, vec3(9.0, 8.0, 7.0));
        assert_eq!(ship.velocity, vec3(5.0, 0.0, 0.0));
    }

    #[test]
    fn teleport_reflects_and_respects_cooldown() {
        let mut ship = ship_at(vec3(10_001.0, 5.0, -3.0));
        assert!(ship.try_teleport(10_000.0, 2_000, 1_000));
        assert_eq!(ship.position, vec3(-10_001.0, -5.0, 3.0));

        // Still out of bounds but inside the cooldown window
        assert!(!ship.try_teleport(10_000.0, 2_500, 1_000));
        assert!(!ship.try_teleport(10_000.0, 3_000, 1_000));
        assert_eq!(ship.position, vec3(-10_001.0, -5.0, 3.0));

        assert!(ship.try_teleport(10_000.0, 3_001, 1_000));
        assert_eq!(ship.position, vec3(10_001.0, 5.0, -3.0));
    }

    #[test]
    fn in_bounds_ship_never_teleports() {
        let mut ship = ship_at(vec3(9_999.0, -10_000.0, 0.0));
        assert!(!ship.try_teleport(10_000.0, 5_000, 1_000));
        assert!(ship.last_teleport_time.is_none());
    }

    #[test]
    fn wire_form_reconstructs_pose_and_identity() {
        let mut ship = ship_at(vec3(12.0, -4.5, 300.25));
        ship.velocity = vec3(1.0, 2.0, 3.0);
        ship.rotation = Quat::new(0.0, 0.0, 0.6, 0.8);
        ship.kills = 2;
        let json = serde_json::to_string(&ship.to_wire()).unwrap();
        let wire: ShipWire = serde_json::from_str(&json).unwrap();
        assert_eq!(wire.id, ship.id);
        assert_eq!(wire.position, ship.position);
        assert_eq!(wire.velocity, ship.velocity);
        assert_eq!(wire.rotation_quaternion, ship.rotation);
        assert_eq!(wire.kills, 2);
        assert!(!wire.is_player);
    }
}
