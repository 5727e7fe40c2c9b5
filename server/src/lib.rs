//! Starfall server library.
//!
//! This module exposes the server components for use in tests and binaries.

pub mod celestial;
pub mod collision;
pub mod config;
pub mod connection;
pub mod game_loop;
pub mod http;
pub mod particle;
pub mod projectile;
pub mod protocol;
pub mod scoring;
pub mod ship;
pub mod world;
pub mod ws;
