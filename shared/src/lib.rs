//! Types shared between the Starfall server and its clients.
//!
//! Nothing in here performs I/O: math primitives, the wire protocol and the
//! world tuning constants only.

pub mod config;
pub mod protocol;
pub mod vec3;
