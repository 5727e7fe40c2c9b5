/// World tuning constants. Distances are world units, times are milliseconds.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct WorldConfig {
    /// Any coordinate beyond this magnitude triggers teleport (ships) or removal (projectiles)
    pub max_coord: f64,
    pub teleport_cooldown_ms: u32,
    /// Minimum interval between two full-state broadcasts
    pub broadcast_interval_ms: u32,
    pub body_count: u32,
    /// Ships spawn at a distance in [0, spawn_radius) from the origin
    pub spawn_radius: f64,
    pub ship_max_health: i32,
    pub ship_hitbox: [f64; 3],
    pub projectile_damage: i32,
    pub projectile_life_ms: u32,
    pub projectile_radius: f64,
    pub projectile_length: f64,
    /// Used when a client omits `lifeTime` on a particle
    pub particle_default_life_ms: u32,
    /// Apply celestial gravity to ship velocities on the server
    #[serde(default)]
    pub server_gravity: bool,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            max_coord: 10_000.0,
            teleport_cooldown_ms: 1_000,
            broadcast_interval_ms: 50,
            body_count: 100,
            spawn_radius: 500.0,
            ship_max_health: 30,
            ship_hitbox: [5.0, 2.5, 10.0],
            projectile_damage: 10,
            projectile_life_ms: 15_000,
            projectile_radius: 0.5,
            projectile_length: 6.0,
            particle_default_life_ms: 5_000,
            server_gravity: false,
        }
    }
}

impl WorldConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !self.max_coord.is_finite() || self.max_coord <= 0.0 {
            return Err("max_coord must be finite and > 0".to_string());
        }
        if !self.spawn_radius.is_finite() || self.spawn_radius < 0.0 {
            return Err("spawn_radius must be finite and >= 0".to_string());
        }
        if self.spawn_radius >= self.max_coord {
            return Err("spawn_radius must be < max_coord".to_string());
        }
        if self.ship_max_health <= 0 {
            return Err("ship_max_health must be > 0".to_string());
        }
        if self.projectile_damage <= 0 {
            return Err("projectile_damage must be > 0".to_string());
        }
        if self
            .ship_hitbox
            .iter()
            .any(|d| !d.is_finite() || *d <= 0.0)
        {
            return Err("ship_hitbox dimensions must be finite and > 0".to_string());
        }
        if !self.projectile_radius.is_finite() || self.projectile_radius <= 0.0 {
            return Err("projectile_radius must be finite and > 0".to_string());
        }
        if !self.projectile_length.is_finite() || self.projectile_length <= 0.0 {
            return Err("projectile_length must be finite and > 0".to_string());
        }
        if self.broadcast_interval_ms == 0 {
            return Err("broadcast_interval_ms must be > 0".to_string());
        }
        Ok(())
    }
}
