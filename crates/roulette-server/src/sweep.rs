//! Background eviction of participants whose grace period ran out.

use std::sync::Arc;
use std::time::Duration;

use roulette_core::ParticipantId;
use roulette_protocol::OutboundEvent;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::hub::{Broadcaster, ConnectivityProbe};
use crate::registry::Registry;
use crate::types::{encode, wait_for_shutdown, Shutdown};

/// One sweep: evict expired participants and announce each departure,
/// followed by the updated player list. Identities the hub still has a
/// connection for are kept whatever their disconnect stamp says.
pub async fn sweep_once<H>(registry: &Registry, hub: &H, grace: Duration) -> Vec<ParticipantId>
where
    H: Broadcaster + ConnectivityProbe,
{
    let online = hub.connected_identities().await;
    let evicted = registry.evict_expired(Instant::now(), grace, |id| online.contains(id));
    if evicted.is_empty() {
        return evicted;
    }

    for identity in &evicted {
        info!(%identity, "participant evicted after grace period");
        if let Some(payload) = encode(&OutboundEvent::PlayerLeft {
            identity: identity.clone(),
        }) {
            hub.broadcast(payload);
        }
    }

    let players = registry.snapshot_all(|id| online.contains(id));
    if let Some(payload) = encode(&OutboundEvent::PlayerList { players }) {
        hub.broadcast(payload);
    }
    evicted
}

/// Sweep every `interval` until shutdown.
pub async fn run_sweep<H>(
    registry: Arc<Registry>,
    hub: H,
    interval: Duration,
    grace: Duration,
    mut shutdown: Shutdown,
) where
    H: Broadcaster + ConnectivityProbe,
{
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let evicted = sweep_once(&registry, &hub, grace).await;
                debug!(evicted = evicted.len(), remaining = registry.len(), "sweep done");
            }
            _ = wait_for_shutdown(&mut shutdown) => break,
        }
    }

    debug!("sweep stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::HubHandle;
    use crate::types::{shutdown_channel, ConnectionId};
    use roulette_protocol::decode_event;
    use tokio::sync::mpsc;

    #[tokio::test(start_paused = true)]
    async fn expired_participants_are_evicted_and_announced() {
        let registry = Arc::new(Registry::new(1_000, 20));
        let (hub, _task) = HubHandle::spawn();

        let watcher = ParticipantId::from("watcher");
        let (tx, mut rx) = mpsc::channel(16);
        registry.register(&watcher);
        hub.register(ConnectionId::next(), watcher.clone(), tx);

        let gone = ParticipantId::from("gone");
        registry.register(&gone);
        registry.mark_disconnected(&gone);

        let (trigger, shutdown) = shutdown_channel();
        let sweeper = tokio::spawn(run_sweep(
            registry.clone(),
            hub.clone(),
            Duration::from_secs(30),
            Duration::from_secs(120),
            shutdown,
        ));

        // Inside the grace period: three sweeps, nobody evicted.
        tokio::time::sleep(Duration::from_secs(100)).await;
        assert!(registry.contains(&gone));

        // The sweep at 120s evicts.
        tokio::time::sleep(Duration::from_secs(25)).await;
        assert!(!registry.contains(&gone));
        assert!(registry.contains(&watcher));

        let left = decode_event(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(left, OutboundEvent::PlayerLeft { identity: gone });
        match decode_event(&rx.recv().await.unwrap()).unwrap() {
            OutboundEvent::PlayerList { players } => {
                assert_eq!(players.len(), 1);
                assert!(players[0].connected);
            }
            other => panic!("unexpected event: {other:?}"),
        }

        trigger.send_replace(true);
        sweeper.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn live_connection_is_never_evicted() {
        let registry = Registry::new(1_000, 20);
        let (hub, _task) = HubHandle::spawn();

        // A late disconnect stamp from a connection that has since been
        // replaced by a new one on the same identity.
        let live = ParticipantId::from("live");
        let (tx, _rx) = mpsc::channel(16);
        registry.register(&live);
        hub.register(ConnectionId::next(), live.clone(), tx);
        registry.mark_disconnected(&live);

        tokio::time::advance(Duration::from_secs(121)).await;
        let evicted = sweep_once(&registry, &hub, Duration::from_secs(120)).await;

        assert!(evicted.is_empty());
        assert!(registry.contains(&live));
        assert!(hub.is_connected(&live).await);
    }
}
