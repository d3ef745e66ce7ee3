//! roulette-server
//!
//! Multi-client async TCP server running continuous roulette rounds.
//!
//! - [`registry`] : every known participant, connected or not
//! - [`hub`]      : the task that owns all outbound queues
//! - [`engine`]   : the live round, the betting cutoff and the phase driver
//! - [`sweep`]    : eviction after the disconnect grace period
//! - [`server`]   : listener and wiring

pub mod config;
pub mod engine;
pub mod hub;
pub mod registry;
pub mod server;
pub mod sweep;
pub mod types;

// per-connection sessions are internal, not re-exported
mod client;

pub use config::{Config, ConfigError, RoundTiming};
pub use engine::{Placement, RoundEngine};
pub use hub::{Broadcaster, ConnectivityProbe, HubCommand, HubHandle};
pub use registry::Registry;
