//! Collision tests and gravity summation.
//!
//! Brute force: every ship against every projectile and every star, each tick.

use starfall_shared::vec3::{self, Vec3};

use crate::celestial::CelestialBody;
use crate::projectile::Projectile;
use crate::ship::Ship;

/// Axis-aligned overlap between the ship box and the projectile's box
/// approximation (radius, radius, length / 2 half-extents). Touching counts.
pub fn check_collision(ship: &Ship, projectile: &Projectile) -> bool {
    let ship_half = Vec3::new(
        ship.hitbox.width / 2.0,
        ship.hitbox.height / 2.0,
        ship.hitbox.depth / 2.0,
    );
    let shot_half = Vec3::new(
        projectile.hitbox.radius,
        projectile.hitbox.radius,
        projectile.hitbox.length / 2.0,
    );

    let ship_min = vec3::sub(ship.position, ship_half);
    let ship_max = vec3::add(ship.position, ship_half);
    let shot_min = vec3::sub(projectile.position, shot_half);
    let shot_max = vec3::add(projectile.position, shot_half);

    ship_min.x <= shot_max.x
        && ship_max.x >= shot_min.x
        && ship_min.y <= shot_max.y
        && ship_max.y >= shot_min.y
        && ship_min.z <= shot_max.z
        && ship_max.z >= shot_min.z
}

/// True when the projectile may damage the ship: visible, not fired by it.
pub fn can_hit(ship: &Ship, projectile: &Projectile) -> bool {
    projectile.visible && projectile.ship_id != ship.id && check_collision(ship, projectile)
}

/// Ship inside the body's collision radius
pub fn check_collision_with_planet(ship: &Ship, body: &CelestialBody) -> bool {
    vec3::distance(ship.position, body.position) <= body.collision_radius()
}

/// Summed pull of every body on a point
pub fn total_gravity(bodies: &[CelestialBody], position: Vec3) -> Vec3 {
    bodies.iter().fold(Vec3::ZERO, |acc, body| {
        vec3::add(acc, body.gravitational_acceleration(position))
    })
}
