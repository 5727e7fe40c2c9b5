use std::path::PathBuf;
use std::str::FromStr;

use starfall_shared::config::WorldConfig;

/// External score service settings
#[derive(Debug, Clone)]
pub struct ScoringConfig {
    pub endpoint: String,
    /// Value of the `game` field in every report
    pub game: String,
    pub max_attempts: u32,
    /// Fixed delay between attempts
    pub backoff_ms: u64,
    /// Upper bound on a single POST
    pub request_timeout_ms: u64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:4000/newScore".to_string(),
            game: "starfall".to_string(),
            max_attempts: 3,
            backoff_ms: 1_000,
            request_timeout_ms: 5_000,
        }
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: String,
    /// Front-end bundle served as a fallback for unknown routes
    pub static_dir: Option<PathBuf>,
    /// Wake-up cadence of the simulation loop; dt itself is measured
    pub tick_interval_ms: u64,
    /// Seed for world generation and spawn points; None = entropy
    pub rng_seed: Option<u64>,
    /// Inbound WebSocket frames above this size close the connection
    pub max_message_bytes: usize,
    pub broadcast_capacity: usize,
    pub world: WorldConfig,
    pub scoring: ScoringConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:22220".to_string(),
            static_dir: None,
            tick_interval_ms: 4,
            rng_seed: None,
            max_message_bytes: 64 * 1024,
            broadcast_capacity: 1024,
            world: WorldConfig::default(),
            scoring: ScoringConfig::default(),
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: FromStr>(name: &str) -> Result<Option<T>, String> {
    match env_var(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| format!("{} has an invalid value: {:?}", name, raw)),
        None => Ok(None),
    }
}

impl ServerConfig {
    /// Defaults overridden by environment variables.
    pub fn from_env() -> Result<Self, String> {
        let mut config = Self::default();

        if let Some(port) = env_parse::<u16>("PORT")? {
            config.listen_addr = format!("0.0.0.0:{}", port);
        }
        if let Some(dir) = env_var("STATIC_DIR") {
            config.static_dir = Some(PathBuf::from(dir));
        }
        if let Some(ms) = env_parse("TICK_INTERVAL_MS")? {
            config.tick_interval_ms = ms;
        }
        config.rng_seed = env_parse("RNG_SEED")?;
        if let Some(gravity) = env_parse("SERVER_GRAVITY")? {
            config.world.server_gravity = gravity;
        }
        if let Some(endpoint) = env_var("SCORE_ENDPOINT") {
            config.scoring.endpoint = endpoint;
        }
        if let Some(game) = env_var("GAME_NAME") {
            config.scoring.game = game;
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.tick_interval_ms == 0 {
            return Err("tick_interval_ms must be > 0".to_string());
        }
        if self.tick_interval_ms >= self.world.broadcast_interval_ms as u64 {
            return Err("tick_interval_ms must be shorter than broadcast_interval_ms".to_string());
        }
        if self.max_message_bytes < 256 {
            return Err("max_message_bytes must be >= 256".to_string());
        }
        if self.broadcast_capacity == 0 {
            return Err("broadcast_capacity must be > 0".to_string());
        }
        if self.scoring.max_attempts == 0 {
            return Err("scoring.max_attempts must be > 0".to_string());
        }
        if self.scoring.request_timeout_ms == 0 {
            return Err("scoring.request_timeout_ms must be > 0".to_string());
        }
        if !(self.scoring.endpoint.starts_with("http://")
            || self.scoring.endpoint.starts_with("https://"))
        {
            return Err("scoring.endpoint must be an http(s) URL".to_string());
        }
        self.world.validate()
    }
}
