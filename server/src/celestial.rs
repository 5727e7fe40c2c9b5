use rand::Rng;
use starfall_shared::protocol::BodyWire;
use starfall_shared::vec3::{self, Vec3};

/// Chance that a generated body is a star
const STAR_PROBABILITY: f64 = 0.05;
const MIN_BODY_SIZE: f64 = 100.0;
const BODY_SIZE_SPREAD: f64 = 200.0;

/// A planet or star. Immutable after world generation.
#[derive(Debug, Clone, PartialEq)]
pub struct CelestialBody {
    pub id: String,
    pub size: f64,
    pub position: Vec3,
    pub is_star: bool,
}

impl CelestialBody {
    pub fn new(id: String, size: f64, position: Vec3, is_star: bool) -> Self {
        Self {
            id,
            size,
            position,
            is_star,
        }
    }

    /// Distance beyond which the body exerts no pull
    pub fn gravitational_range(&self) -> f64 {
        if self.is_star {
            self.size * 4.0
        } else {
            self.size * 2.0
        }
    }

    pub fn gravitational_constant(&self) -> f64 {
        self.size * 0.005 * if self.is_star { 2.0 } else { 0.75 }
    }

    /// Ships closer than this are destroyed (only stars are lethal)
    pub fn collision_radius(&self) -> f64 {
        if self.is_star {
            self.size
        } else {
            self.size / 2.0
        }
    }

    /// Inverse-square pull toward the body: G * size / d^2, zero out of range.
    pub fn gravitational_acceleration(&self, position: Vec3) -> Vec3 {
        let toward = vec3::sub(self.position, position);
        let distance = vec3::length(toward);
        if distance > self.gravitational_range() || distance < 1e-6 {
            return Vec3::ZERO;
        }
        let magnitude = self.gravitational_constant() * self.size / (distance * distance);
        vec3::scale(vec3::normalize(toward), magnitude)
    }

    pub fn to_wire(&self) -> BodyWire {
        BodyWire {
            id: self.id.clone(),
            size: self.size,
            position: self.position,
            is_star: self.is_star,
        }
    }
}

/// Scatter `count` bodies uniformly in the cube of half-width `half_extent`.
pub fn generate_bodies(count: usize, half_extent: f64, rng: &mut impl Rng) -> Vec<CelestialBody> {
    (0..count)
        .map(|i| {
            let size = rng.gen::<f64>() * BODY_SIZE_SPREAD + MIN_BODY_SIZE;
            let position = Vec3::new(
                (rng.gen::<f64>() - 0.5) * 2.0 * half_extent,
                (rng.gen::<f64>() - 0.5) * 2.0 * half_extent,
                (rng.gen::<f64>() - 0.5) * 2.0 * half_extent,
            );
            let is_star = rng.gen::<f64>() < STAR_PROBABILITY;
            CelestialBody::new(format!("planet-{}", i), size, position, is_star)
        })
        .collect()
}
