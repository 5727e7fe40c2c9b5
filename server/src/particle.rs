use starfall_shared::config::WorldConfig;
use starfall_shared::protocol::{ParticleSpawn, ParticleWire};
use starfall_shared::vec3::{self, Vec3};

/// Ambient visual token relayed between clients. Never collides.
#[derive(Debug, Clone)]
pub struct Particle {
    pub id: String,
    pub position: Vec3,
    pub velocity: Vec3,
    pub spawn_time: u64,
    /// Milliseconds; set to 0 once expired
    pub life_time: f64,
}

impl Particle {
    pub fn from_spawn(spawn: &ParticleSpawn, now_ms: u64, config: &WorldConfig) -> Self {
        // Only a missing or zero lifetime falls back; a negative one is kept
        // and expires on the next tick
        let life_time = spawn
            .life_time
            .filter(|ms| *ms != 0.0)
            .unwrap_or(config.particle_default_life_ms as f64);
        Self {
            id: spawn.id.clone(),
            position: spawn.position,
            velocity: spawn.velocity,
            spawn_time: now_ms,
            life_time,
        }
    }

    pub fn update(&mut self, dt: f64, now_ms: u64) {
        self.position = vec3::add(self.position, vec3::scale(self.velocity, dt));
        if now_ms.saturating_sub(self.spawn_time) as f64 > self.life_time {
            self.life_time = 0.0;
        }
    }

    pub fn is_expired(&self) -> bool {
        self.life_time <= 0.0
    }

    pub fn to_wire(&self) -> ParticleWire {
        ParticleWire {
            id: self.id.clone(),
            position: self.position,
            velocity: self.velocity,
            life_time: self.life_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use starfall_shared::vec3::vec3;

    fn spawn(life_time: Option<f64>) -> ParticleSpawn {
        ParticleSpawn {
            id: "particle-1".to_string(),
            position: vec3(1.0, 1.0, 1.0),
            velocity: vec3(2.0, 0.0, 0.0),
            life_time,
        }
    }

    #[test]
    fn missing_lifetime_uses_default() {
        let p = Particle::from_spawn(&spawn(None), 0, &WorldConfig::default());
        assert_eq!(p.life_time, 5_000.0);
        let p = Particle::from_spawn(&spawn(Some(0.0)), 0, &WorldConfig::default());
        assert_eq!(p.life_time, 5_000.0);
    }

    #[test]
    fn particle_expires_after_lifetime() {
        let mut p = Particle::from_spawn(&spawn(Some(800.0)), 200, &WorldConfig::default());
        p.update(0.5, 900);
        assert!(!p.is_expired());
        assert_eq!(p.position, vec3(2.0, 1.0, 1.0));
        p.update(0.5, 1_001);
        assert!(p.is_expired());
        assert_eq!(p.to_wire().life_time, 0.0);
    }

    #[test]
    fn negative_lifetime_is_kept_and_expires() {
        let mut p = Particle::from_spawn(&spawn(Some(-1.0)), 100, &WorldConfig::default());
        assert_eq!(p.life_time, -1.0);
        p.update(0.004, 104);
        assert!(p.is_expired());
    }

    #[test]
    fn wire_form_reconstructs_particle() {
        let mut p = Particle::from_spawn(&spawn(Some(1_250.0)), 0, &WorldConfig::default());
        p.update(0.5, 10);
        let json = serde_json::to_string(&p.to_wire()).unwrap();
        assert!(json.contains("\"lifeTime\":1250"));
        let wire: ParticleWire = serde_json::from_str(&json).unwrap();
        assert_eq!(wire.id, p.id);
        assert_eq!(wire.position, p.position);
        assert_eq!(wire.velocity, p.velocity);
        assert_eq!(wire.life_time, p.life_time);
    }
}
