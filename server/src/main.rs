use anyhow::Context;
use starfall_server::config::ServerConfig;
use starfall_server::game_loop::{run_game_loop, GameBroadcast, GameCommand};
use starfall_server::http::router;
use starfall_server::scoring::ScoreReporter;
use starfall_server::ws::AppState;
use tokio::sync::{broadcast, mpsc};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = ServerConfig::from_env().map_err(anyhow::Error::msg)?;

    // Validate configuration before starting
    config
        .validate()
        .map_err(anyhow::Error::msg)
        .context("invalid server configuration")?;

    let reporter = ScoreReporter::new(config.scoring.clone()).context("create score reporter")?;

    let (game_tx, game_rx) = mpsc::channel::<GameCommand>(256);
    let (broadcast_tx, _) = broadcast::channel::<GameBroadcast>(config.broadcast_capacity);

    // Spawn game loop
    let bc_tx = broadcast_tx.clone();
    let loop_config = config.clone();
    tokio::spawn(async move {
        run_game_loop(game_rx, bc_tx, loop_config, reporter).await;
    });

    let app_state = AppState::new(game_tx, broadcast_tx, config.max_message_bytes);
    let app = router(app_state, config.static_dir.as_deref());

    tracing::info!(
        addr = %config.listen_addr,
        static_dir = ?config.static_dir,
        score_endpoint = %config.scoring.endpoint,
        server_gravity = config.world.server_gravity,
        "Starting Starfall server"
    );

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("bind {}", config.listen_addr))?;
    axum::serve(listener, app).await.context("serve")?;
    Ok(())
}
