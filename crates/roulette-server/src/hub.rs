//! Connection hub.
//!
//! A single coordinating task owns every open connection's outbound
//! queue. Everyone else talks to it through a cloneable [`HubHandle`]
//! that posts [`HubCommand`]s over an unbounded channel, so no lock is
//! shared with the sessions or the round engine.
//!
//! Delivery policy:
//! - every send is a non-blocking `try_send` on the connection's bounded queue
//! - a full or closed queue marks the connection for removal; removal drops
//!   the sender, which ends that connection's writer task
//! - unicast by identity goes to the latest connection bound to it

use std::collections::{HashMap, HashSet};
use std::future::Future;

use bytes::Bytes;
use roulette_core::ParticipantId;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::types::{ConnectionId, OutboundTx};

/// Fan-out capability consumed by the round engine.
pub trait Broadcaster: Send + Sync + 'static {
    /// Deliver `payload` to every open connection.
    fn broadcast(&self, payload: Bytes);

    /// Deliver `payload` to the connection currently bound to `identity`,
    /// if any.
    fn send_to(&self, identity: &ParticipantId, payload: Bytes);
}

/// Connectivity queries consumed by the round engine and the sweep.
pub trait ConnectivityProbe: Send + Sync + 'static {
    fn is_connected(&self, identity: &ParticipantId) -> impl Future<Output = bool> + Send;

    fn connected_identities(&self) -> impl Future<Output = HashSet<ParticipantId>> + Send;
}

/// Requests handled by the hub task.
#[derive(Debug)]
pub enum HubCommand {
    Register {
        conn: ConnectionId,
        identity: ParticipantId,
        tx: OutboundTx,
    },
    Unregister {
        conn: ConnectionId,
    },
    Broadcast {
        payload: Bytes,
    },
    SendTo {
        identity: ParticipantId,
        payload: Bytes,
    },
    Deliver {
        conn: ConnectionId,
        payload: Bytes,
    },
    IsConnected {
        identity: ParticipantId,
        reply: oneshot::Sender<bool>,
    },
    ConnectedIdentities {
        reply: oneshot::Sender<HashSet<ParticipantId>>,
    },
    ConnectionCount {
        reply: oneshot::Sender<usize>,
    },
    Shutdown,
}

/// Cheap, cloneable front end of the hub task.
///
/// Every method is fire-and-forget or a one-shot query. Once the hub has
/// shut down, sends are dropped and queries return empty answers.
#[derive(Debug, Clone)]
pub struct HubHandle {
    commands: mpsc::UnboundedSender<HubCommand>,
}

impl HubHandle {
    /// Start the hub task.
    pub fn spawn() -> (HubHandle, JoinHandle<()>) {
        let (commands, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(Hub::default().run(rx));
        (HubHandle { commands }, task)
    }

    fn post(&self, command: HubCommand) {
        // Only fails after shutdown, when there is nobody left to deliver to.
        let _ = self.commands.send(command);
    }

    async fn ask<T: Default>(&self, build: impl FnOnce(oneshot::Sender<T>) -> HubCommand) -> T {
        let (reply, answer) = oneshot::channel();
        self.post(build(reply));
        answer.await.unwrap_or_default()
    }

    /// Bind an identified connection to its outbound queue.
    pub fn register(&self, conn: ConnectionId, identity: ParticipantId, tx: OutboundTx) {
        self.post(HubCommand::Register { conn, identity, tx });
    }

    pub fn unregister(&self, conn: ConnectionId) {
        self.post(HubCommand::Unregister { conn });
    }

    /// Deliver to one specific connection, regardless of which identity
    /// currently owns unicast.
    pub fn deliver(&self, conn: ConnectionId, payload: Bytes) {
        self.post(HubCommand::Deliver { conn, payload });
    }

    pub async fn connection_count(&self) -> usize {
        self.ask(|reply| HubCommand::ConnectionCount { reply }).await
    }

    /// Drop every queue and stop the hub task.
    pub fn shutdown(&self) {
        self.post(HubCommand::Shutdown);
    }
}

impl Broadcaster for HubHandle {
    fn broadcast(&self, payload: Bytes) {
        self.post(HubCommand::Broadcast { payload });
    }

    fn send_to(&self, identity: &ParticipantId, payload: Bytes) {
        self.post(HubCommand::SendTo {
            identity: identity.clone(),
            payload,
        });
    }
}

impl ConnectivityProbe for HubHandle {
    async fn is_connected(&self, identity: &ParticipantId) -> bool {
        let identity = identity.clone();
        self.ask(|reply| HubCommand::IsConnected { identity, reply }).await
    }

    async fn connected_identities(&self) -> HashSet<ParticipantId> {
        self.ask(|reply| HubCommand::ConnectedIdentities { reply }).await
    }
}

// ----------------------------------------------------------------------
// Hub task
// ----------------------------------------------------------------------

#[derive(Debug)]
struct Connection {
    identity: ParticipantId,
    tx: OutboundTx,
}

#[derive(Debug, Default)]
struct Hub {
    connections: HashMap<ConnectionId, Connection>,
    /// Identity -> connection that receives its unicasts.
    bindings: HashMap<ParticipantId, ConnectionId>,
}

impl Hub {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<HubCommand>) {
        while let Some(command) = rx.recv().await {
            match command {
                HubCommand::Register { conn, identity, tx } => self.register(conn, identity, tx),
                HubCommand::Unregister { conn } => {
                    if self.remove(conn).is_some() {
                        debug!(%conn, open = self.connections.len(), "connection unregistered");
                    }
                }
                HubCommand::Broadcast { payload } => self.broadcast(payload),
                HubCommand::SendTo { identity, payload } => {
                    if let Some(&conn) = self.bindings.get(&identity) {
                        self.deliver(conn, payload);
                    }
                }
                HubCommand::Deliver { conn, payload } => self.deliver(conn, payload),
                HubCommand::IsConnected { identity, reply } => {
                    let _ = reply.send(self.bindings.contains_key(&identity));
                }
                HubCommand::ConnectedIdentities { reply } => {
                    let _ = reply.send(self.bindings.keys().cloned().collect());
                }
                HubCommand::ConnectionCount { reply } => {
                    let _ = reply.send(self.connections.len());
                }
                HubCommand::Shutdown => break,
            }
        }

        info!(open = self.connections.len(), "hub shutting down, closing all queues");
        self.connections.clear();
        self.bindings.clear();
    }

    fn register(&mut self, conn: ConnectionId, identity: ParticipantId, tx: OutboundTx) {
        // A connection only ever has one identity; drop a stale binding.
        self.remove(conn);
        if let Some(previous) = self.bindings.insert(identity.clone(), conn) {
            debug!(%identity, %previous, %conn, "identity rebound to newer connection");
        }
        self.connections.insert(conn, Connection { identity, tx });
        debug!(%conn, open = self.connections.len(), "connection registered");
    }

    fn remove(&mut self, conn: ConnectionId) -> Option<Connection> {
        let removed = self.connections.remove(&conn)?;
        if self.bindings.get(&removed.identity) == Some(&conn) {
            // Fall back to the newest remaining connection for this identity.
            let successor = self
                .connections
                .iter()
                .filter(|(_, c)| c.identity == removed.identity)
                .map(|(id, _)| *id)
                .max();
            match successor {
                Some(next) => {
                    self.bindings.insert(removed.identity.clone(), next);
                }
                None => {
                    self.bindings.remove(&removed.identity);
                }
            }
        }
        Some(removed)
    }

    fn broadcast(&mut self, payload: Bytes) {
        let mut dead: HashSet<ConnectionId> = HashSet::new();
        for (conn, connection) in &self.connections {
            if let Err(err) = connection.tx.try_send(payload.clone()) {
                log_send_failure(*conn, &err);
                dead.insert(*conn);
            }
        }
        for conn in dead {
            self.remove(conn);
        }
    }

    fn deliver(&mut self, conn: ConnectionId, payload: Bytes) {
        let Some(connection) = self.connections.get(&conn) else {
            return;
        };
        if let Err(err) = connection.tx.try_send(payload) {
            log_send_failure(conn, &err);
            self.remove(conn);
        }
    }
}

fn log_send_failure(conn: ConnectionId, err: &TrySendError<Bytes>) {
    match err {
        TrySendError::Full(_) => warn!(%conn, "outbound queue full, dropping slow connection"),
        TrySendError::Closed(_) => debug!(%conn, "outbound queue closed, dropping connection"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn queue(capacity: usize) -> (OutboundTx, mpsc::Receiver<Bytes>) {
        mpsc::channel(capacity)
    }

    #[tokio::test]
    async fn full_queue_is_evicted_without_blocking_others() {
        let (hub, _task) = HubHandle::spawn();
        let (slow_tx, _slow_rx) = queue(1);
        let (fast_tx, mut fast_rx) = queue(16);
        let slow = ConnectionId::next();
        let fast = ConnectionId::next();
        hub.register(slow, ParticipantId::from("slow"), slow_tx);
        hub.register(fast, ParticipantId::from("fast"), fast_tx);

        for n in 0..3u8 {
            hub.broadcast(Bytes::from(vec![n]));
        }

        for n in 0..3u8 {
            let got = tokio::time::timeout(Duration::from_secs(1), fast_rx.recv())
                .await
                .unwrap()
                .unwrap();
            assert_eq!(&got[..], &[n]);
        }
        assert!(!hub.is_connected(&ParticipantId::from("slow")).await);
        assert!(hub.is_connected(&ParticipantId::from("fast")).await);
        assert_eq!(hub.connection_count().await, 1);
    }

    #[tokio::test]
    async fn closed_queue_is_removed_on_unicast() {
        let (hub, _task) = HubHandle::spawn();
        let (tx, rx) = queue(4);
        let id = ParticipantId::from("gone");
        hub.register(ConnectionId::next(), id.clone(), tx);
        drop(rx);

        hub.send_to(&id, Bytes::from_static(b"x"));
        assert!(!hub.is_connected(&id).await);
    }

    #[tokio::test]
    async fn latest_connection_wins_and_falls_back() {
        let (hub, _task) = HubHandle::spawn();
        let id = ParticipantId::from("twice");
        let (old_tx, mut old_rx) = queue(4);
        let (new_tx, mut new_rx) = queue(4);
        let old = ConnectionId::next();
        let new = ConnectionId::next();
        hub.register(old, id.clone(), old_tx);
        hub.register(new, id.clone(), new_tx);

        hub.send_to(&id, Bytes::from_static(b"1"));
        assert_eq!(&new_rx.recv().await.unwrap()[..], b"1");

        hub.unregister(new);
        hub.send_to(&id, Bytes::from_static(b"2"));
        assert_eq!(&old_rx.recv().await.unwrap()[..], b"2");
        assert!(hub.is_connected(&id).await);

        hub.unregister(old);
        assert!(!hub.is_connected(&id).await);
        assert!(hub.connected_identities().await.is_empty());
    }

    #[tokio::test]
    async fn deliver_targets_one_connection() {
        let (hub, _task) = HubHandle::spawn();
        let id = ParticipantId::from("twice");
        let (a_tx, mut a_rx) = queue(4);
        let (b_tx, mut b_rx) = queue(4);
        let a = ConnectionId::next();
        hub.register(a, id.clone(), a_tx);
        hub.register(ConnectionId::next(), id, b_tx);

        hub.deliver(a, Bytes::from_static(b"only-a"));
        assert_eq!(&a_rx.recv().await.unwrap()[..], b"only-a");
        assert_eq!(hub.connection_count().await, 2);
        assert!(b_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn shutdown_closes_every_queue() {
        let (hub, task) = HubHandle::spawn();
        let (tx, mut rx) = queue(4);
        hub.register(ConnectionId::next(), ParticipantId::from("a"), tx);
        hub.shutdown();
        task.await.unwrap();

        assert!(rx.recv().await.is_none());
        assert_eq!(hub.connection_count().await, 0);
    }
}
