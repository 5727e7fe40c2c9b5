//! Inbound message decoding.
//!
//! Wire types live in `starfall_shared::protocol`; this module turns raw text
//! frames into validated `ClientMsg`s. Any error here is per-message: the
//! caller logs it and keeps the connection open.

pub use starfall_shared::protocol::*;
use starfall_shared::vec3::{is_finite, Quat, Vec3};

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("non-finite value in `{0}`")]
    NonFinite(&'static str),
    #[error("zero-length rotation quaternion")]
    DegenerateRotation,
    #[error("empty id in `{0}`")]
    EmptyId(&'static str),
}

/// Parse a text frame and validate its numeric content.
pub fn parse_client_msg(text: &str) -> Result<ClientMsg, ProtocolError> {
    let msg: ClientMsg = serde_json::from_str(text)?;
    validate(msg)
}

fn finite(v: Vec3, field: &'static str) -> Result<Vec3, ProtocolError> {
    if is_finite(v) {
        Ok(v)
    } else {
        Err(ProtocolError::NonFinite(field))
    }
}

fn unit_rotation(q: Quat) -> Result<Quat, ProtocolError> {
    if !q.is_finite() {
        return Err(ProtocolError::NonFinite("rotationQuaternion"));
    }
    q.normalized().ok_or(ProtocolError::DegenerateRotation)
}

fn non_empty(id: &str, field: &'static str) -> Result<(), ProtocolError> {
    if id.is_empty() {
        return Err(ProtocolError::EmptyId(field));
    }
    Ok(())
}

/// Reject NaN/inf vectors and normalize rotations.
fn validate(msg: ClientMsg) -> Result<ClientMsg, ProtocolError> {
    match msg {
        ClientMsg::NewShip => Ok(ClientMsg::NewShip),
        ClientMsg::UpdateShip(mut m) => {
            non_empty(&m.id, "id")?;
            m.position = m.position.map(|p| finite(p, "position")).transpose()?;
            m.velocity = m.velocity.map(|v| finite(v, "velocity")).transpose()?;
            m.rotation_quaternion = m.rotation_quaternion.map(unit_rotation).transpose()?;
            Ok(ClientMsg::UpdateShip(m))
        }
        ClientMsg::FireProjectile(mut m) => {
            non_empty(&m.id, "id")?;
            non_empty(&m.ship_id, "shipId")?;
            m.position = finite(m.position, "position")?;
            m.velocity = finite(m.velocity, "velocity")?;
            m.rotation_quaternion = unit_rotation(m.rotation_quaternion)?;
            Ok(ClientMsg::FireProjectile(m))
        }
        ClientMsg::AddParticle { mut particle } => {
            non_empty(&particle.id, "particle.id")?;
            particle.position = finite(particle.position, "particle.position")?;
            particle.velocity = finite(particle.velocity, "particle.velocity")?;
            if particle.life_time.is_some_and(|t| !t.is_finite()) {
                return Err(ProtocolError::NonFinite("particle.lifeTime"));
            }
            Ok(ClientMsg::AddParticle { particle })
        }
    }
}
