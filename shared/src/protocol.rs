use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::vec3::{Quat, Vec3};

// === Server -> Client ===

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type")]
pub enum ServerMsg {
    /// Full snapshot for a connection that just received its ship
    #[serde(rename = "init")]
    Init(InitMsg),
    #[serde(rename = "newShip")]
    NewShip { ship: ShipWire },
    #[serde(rename = "removeShip")]
    RemoveShip { id: String },
    #[serde(rename = "updateShip")]
    UpdateShip { ship: ShipWire },
    #[serde(rename = "updateShipHealth")]
    UpdateShipHealth { id: String, health: i32 },
    #[serde(rename = "updateKillerKills")]
    UpdateKillerKills { id: String, kills: u32 },
    /// Forced position snap; clients must not interpolate
    #[serde(rename = "teleportShip")]
    TeleportShip { ship: ShipWire },
    #[serde(rename = "newProjectile")]
    NewProjectile { projectile: ProjectileWire },
    #[serde(rename = "newParticle")]
    NewParticle { particle: ParticleWire },
    #[serde(rename = "updateGameState")]
    UpdateGameState(GameStateMsg),
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct InitMsg {
    pub ships: Vec<ShipWire>,
    pub planets: Vec<BodyWire>,
    pub projectiles: Vec<ProjectileWire>,
    pub player_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct GameStateMsg {
    pub ships: Vec<ShipWire>,
    /// Visible projectiles only
    pub projectiles: Vec<ProjectileWire>,
    pub planets: Vec<BodyWire>,
    pub particles: Vec<ParticleWire>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ShipWire {
    pub id: String,
    pub position: Vec3,
    pub rotation_quaternion: Quat,
    pub velocity: Vec3,
    /// Always false on the wire; each client flags its own ship from `playerId`
    #[serde(default)]
    pub is_player: bool,
    pub kills: u32,
    pub health: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ProjectileWire {
    pub id: String,
    pub ship_id: String,
    pub position: Vec3,
    pub rotation_quaternion: Quat,
    pub velocity: Vec3,
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BodyWire {
    pub id: String,
    pub size: f64,
    pub position: Vec3,
    pub is_star: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ParticleWire {
    pub id: String,
    pub position: Vec3,
    pub velocity: Vec3,
    /// Milliseconds; 0 once expired
    pub life_time: f64,
}

// === Client -> Server ===

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type")]
pub enum ClientMsg {
    #[serde(rename = "newShip")]
    NewShip,
    #[serde(rename = "updateShip")]
    UpdateShip(UpdateShipMsg),
    #[serde(rename = "fireProjectile")]
    FireProjectile(FireProjectileMsg),
    #[serde(rename = "addParticle")]
    AddParticle { particle: ParticleSpawn },
}

/// Pose report for one ship. Absent fields leave the server copy untouched.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct UpdateShipMsg {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Vec3>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation_quaternion: Option<Quat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub velocity: Option<Vec3>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct FireProjectileMsg {
    pub id: String,
    pub ship_id: String,
    pub position: Vec3,
    pub rotation_quaternion: Quat,
    pub velocity: Vec3,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ParticleSpawn {
    pub id: String,
    pub position: Vec3,
    pub velocity: Vec3,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub life_time: Option<f64>,
}
