//! TCP listener and top-level server wiring.
//!
//! This module:
//! - Listens on the configured address/port.
//! - Builds the registry, the hub task and the round engine, and hands
//!   them to every task explicitly.
//! - Spawns:
//!   - the round driver,
//!   - the grace-period sweep,
//!   - a session task per accepted connection.
//! - On shutdown, stops all of the above and waits for them.
//!
//! The per-connection logic lives in `client`, the round logic in
//! `engine`.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use roulette_core::{OsWheel, OutcomeSource};
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::client::{self, ClientContext};
use crate::config::Config;
use crate::engine::RoundEngine;
use crate::hub::HubHandle;
use crate::registry::Registry;
use crate::sweep::run_sweep;
use crate::types::{shutdown_channel, ConnectionId};

/// Pause after a failed `accept` so a persistent error does not spin.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Run the TCP server with the given configuration until Ctrl-C.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let addr = config.socket_addr_string();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "listening");

    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
        info!("ctrl-c received");
    };

    serve(listener, config, Box::new(OsWheel), ctrl_c).await
}

/// Serve connections from `listener` until `shutdown` resolves.
///
/// The outcome source is injected so tests can script the wheel.
pub async fn serve<F>(
    listener: TcpListener,
    config: Config,
    wheel: Box<dyn OutcomeSource>,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send,
{
    config.validate()?;
    let config = Arc::new(config);

    let registry = Arc::new(Registry::new(config.starting_balance, config.max_name_len));
    let (hub, hub_task) = HubHandle::spawn();
    let engine = Arc::new(RoundEngine::new(
        registry.clone(),
        hub.clone(),
        wheel,
        config.timing,
    ));
    let (trigger, signal) = shutdown_channel();

    let driver = {
        let engine = engine.clone();
        let signal = signal.clone();
        tokio::spawn(async move { engine.run(signal).await })
    };
    let sweeper = tokio::spawn(run_sweep(
        registry.clone(),
        hub.clone(),
        config.sweep_interval,
        config.grace_period,
        signal.clone(),
    ));

    let ctx = ClientContext {
        engine: engine.clone(),
        registry: registry.clone(),
        hub: hub.clone(),
        config: config.clone(),
    };
    let open = Arc::new(AtomicUsize::new(0));
    let mut sessions = JoinSet::new();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(accepted) => accepted,
                    Err(err) => {
                        error!(error = %err, "accept failed");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                        continue;
                    }
                };

                if open.load(Ordering::Acquire) >= config.max_clients {
                    warn!(%peer, max_clients = config.max_clients, "rejecting connection, server full");
                    // Dropping the stream closes it.
                    continue;
                }

                let conn = ConnectionId::next();
                let slot = OpenSlot::claim(&open);
                info!(%conn, %peer, "accepted connection");
                if let Err(err) = stream.set_nodelay(true) {
                    warn!(%conn, error = %err, "failed to set TCP_NODELAY");
                }

                let ctx = ctx.clone();
                let signal = signal.clone();
                sessions.spawn(async move {
                    let _slot = slot;
                    match client::run_client(conn, stream, ctx, signal).await {
                        Ok(()) => info!(%conn, "connection closed"),
                        Err(err) => warn!(%conn, error = %err, "connection ended with error"),
                    }
                });
            }
            Some(_) = sessions.join_next(), if !sessions.is_empty() => {}
            _ = &mut shutdown => break,
        }
    }

    info!(open = open.load(Ordering::Acquire), "shutting down");
    trigger.send_replace(true);
    engine.shutdown();

    while sessions.join_next().await.is_some() {}
    for (name, task) in [("round driver", driver), ("sweep", sweeper)] {
        if let Err(err) = task.await {
            error!(task = name, error = %err, "task failed");
        }
    }

    hub.shutdown();
    if let Err(err) = hub_task.await {
        error!(error = %err, "hub task failed");
    }
    registry.clear();

    info!("server stopped");
    Ok(())
}

/// One slot of the connection limit, released on drop.
struct OpenSlot(Arc<AtomicUsize>);

impl OpenSlot {
    fn claim(open: &Arc<AtomicUsize>) -> Self {
        open.fetch_add(1, Ordering::AcqRel);
        OpenSlot(open.clone())
    }
}

impl Drop for OpenSlot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}
