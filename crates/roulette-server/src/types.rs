//! Shared types for the roulette TCP server.
//!
//! This module defines:
//! - `ConnectionId`: a lightweight handle for open connections
//! - channel aliases between the hub and connection writers
//! - `Shutdown`: the process-wide stop signal
//! - `encode`: event -> framed payload, shared by the engine and sessions

use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use roulette_protocol::{encode_event, frame, OutboundEvent};
use tokio::sync::{mpsc, watch};
use tracing::error;

/// Identifier for an open connection.
///
/// Distinct from `ParticipantId`: one participant may be reached over
/// several connections over its lifetime. Unique for the lifetime of the
/// process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

impl ConnectionId {
    pub fn next() -> Self {
        ConnectionId(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Framed outbound payloads for one connection's writer task.
///
/// Bounded: a receiver that stops draining fills up and gets dropped
/// by the hub instead of stalling everyone else.
pub type OutboundTx = mpsc::Sender<Bytes>;
pub type OutboundRx = mpsc::Receiver<Bytes>;

/// Stop signal shared by every background task. Flips to `true` once.
pub type Shutdown = watch::Receiver<bool>;
pub type ShutdownTrigger = watch::Sender<bool>;

/// Fresh stop signal, not yet triggered.
pub fn shutdown_channel() -> (ShutdownTrigger, Shutdown) {
    watch::channel(false)
}

/// Resolve once the signal has been triggered or its sender dropped.
pub async fn wait_for_shutdown(shutdown: &mut Shutdown) {
    while !*shutdown.borrow_and_update() {
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

/// Serialize and frame an event. Encoding failures are logged and the
/// event is skipped.
pub fn encode(event: &OutboundEvent) -> Option<Bytes> {
    match encode_event(event) {
        Ok(body) => Some(frame(&body)),
        Err(err) => {
            error!(kind = event.kind(), error = %err, "failed to encode event");
            None
        }
    }
}
