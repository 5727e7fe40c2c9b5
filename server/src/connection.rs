//! Per-connection session registry: at most one ship per connection and one
//! connection per ship.

use starfall_shared::protocol::{InitMsg, ServerMsg, ShipWire};
use std::collections::HashMap;

use crate::world::World;

pub type ConnId = u64;

/// Token used when a client connects without one
pub const ANONYMOUS_TOKEN: &str = "anonymous";

#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub ship_id: Option<String>,
}

/// Result of a `newShip` request
#[derive(Debug)]
pub struct ShipAssignment {
    /// Reply for the requesting connection only
    pub init: InitMsg,
    /// Announced to every other connection
    pub ship: ShipWire,
    /// Removal of the connection's previous ship, if it still had one
    pub replaced: Option<ServerMsg>,
}

#[derive(Debug, Default)]
pub struct ConnectionManager {
    sessions: HashMap<ConnId, Session>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection. No ship is created until it asks for one.
    pub fn connect(&mut self, conn: ConnId, token: Option<String>) {
        let token = token
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| ANONYMOUS_TOKEN.to_string());
        tracing::info!(conn, user = %token, "Client connected");
        self.sessions.insert(
            conn,
            Session {
                token,
                ship_id: None,
            },
        );
    }

    /// Spawn a ship for `conn` and build its snapshot. None for unknown connections.
    pub fn new_ship(&mut self, conn: ConnId, world: &mut World) -> Option<ShipAssignment> {
        let session = self.sessions.get_mut(&conn)?;

        let replaced = session
            .ship_id
            .take()
            .and_then(|old| world.remove_ship(&old))
            .map(|old| {
                tracing::info!(conn, ship_id = %old.id, "Replacing previous ship");
                ServerMsg::RemoveShip { id: old.id }
            });

        let ship_id = world.spawn_ship(&session.token);
        session.ship_id = Some(ship_id.clone());

        let ship = world.ships.get(&ship_id)?.to_wire();
        Some(ShipAssignment {
            init: world.snapshot(&ship_id),
            ship,
            replaced,
        })
    }

    /// Forget the connection and remove its ship. Safe to call repeatedly;
    /// only the first call can return a removed ship id.
    pub fn disconnect(&mut self, conn: ConnId, world: &mut World) -> Option<String> {
        let session = self.sessions.remove(&conn)?;
        tracing::info!(conn, "Client disconnected");
        let ship_id = session.ship_id?;
        world.remove_ship(&ship_id)?;
        tracing::info!(conn, ship_id = %ship_id, "Removed ship of departed client");
        Some(ship_id)
    }

    /// Drop the association once the world has destroyed the ship.
    pub fn ship_destroyed(&mut self, ship_id: &str) {
        for session in self.sessions.values_mut() {
            if session.ship_id.as_deref() == Some(ship_id) {
                session.ship_id = None;
            }
        }
    }

    #[cfg(test)]
    pub fn session(&self, conn: ConnId) -> Option<&Session> {
        self.sessions.get(&conn)
    }

    /// Connection currently flying `ship_id`
    #[cfg(test)]
    pub fn conn_for_ship(&self, ship_id: &str) -> Option<ConnId> {
        self.sessions
            .iter()
            .find(|(_, s)| s.ship_id.as_deref() == Some(ship_id))
            .map(|(conn, _)| *conn)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
