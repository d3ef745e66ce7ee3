// crates/roulette-client/src/types.rs

use std::path::PathBuf;

use roulette_protocol::OutboundEvent;

/// Configuration for the roulette client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server_addr: String,
    /// Display name sent on first join.
    pub name: String,
    /// Where the identity token is kept between runs.
    pub session_file: PathBuf,
    pub default_stake: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:9000".to_string(),
            name: "Player".to_string(),
            session_file: PathBuf::from(".roulette-session.toml"),
            default_stake: 100,
        }
    }
}

/// What the network task reports to the UI loop.
#[derive(Debug, Clone, PartialEq)]
pub enum NetworkEvent {
    /// A fresh connection is up; the app should identify itself.
    Connected,
    /// The connection dropped; the network task is backing off.
    Disconnected(String),
    Message(OutboundEvent),
}
