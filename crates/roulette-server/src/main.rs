//! Binary TCP server for multiplayer roulette.

use roulette_server::config::Config;
use roulette_server::server;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;

    info!(
        addr = %config.socket_addr_string(),
        max_clients = config.max_clients,
        betting = ?config.timing.betting,
        starting_balance = config.starting_balance,
        "starting roulette-server"
    );

    server::run(config).await
}
