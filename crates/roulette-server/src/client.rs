// crates/roulette-server/src/client.rs

//! Per-connection session.
//!
//! Each accepted socket gets:
//! - a writer task draining a bounded outbound queue onto the socket,
//!   with a keep-alive frame when the queue sits idle
//! - a reader loop (this task) framing newline-delimited JSON actions
//!   and acting on them
//!
//! A connection starts anonymous with a freshly generated identity. It
//! joins the hub only once it sends `set_name` or `reconnect`; until
//! then replies go straight onto its own queue.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use roulette_core::{ParticipantId, WagerError};
use roulette_protocol::{decode_action, InboundAction, LineFramer, OutboundEvent, ProtocolError};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::engine::RoundEngine;
use crate::hub::{Broadcaster, ConnectivityProbe, HubHandle};
use crate::registry::Registry;
use crate::types::{encode, wait_for_shutdown, ConnectionId, OutboundRx, OutboundTx, Shutdown};

/// How long a single socket write may take before the peer is
/// considered gone.
const WRITE_TIMEOUT: Duration = Duration::from_secs(10);

const READ_CHUNK: usize = 4096;

/// Everything a session needs from the rest of the server.
#[derive(Clone)]
pub struct ClientContext {
    pub engine: Arc<RoundEngine<HubHandle>>,
    pub registry: Arc<Registry>,
    pub hub: HubHandle,
    pub config: Arc<Config>,
}

/// Run the I/O loops for a single connection until the peer goes away,
/// the hub drops it, or the server shuts down.
pub async fn run_client(
    conn: ConnectionId,
    stream: TcpStream,
    ctx: ClientContext,
    mut shutdown: Shutdown,
) -> anyhow::Result<()> {
    let (mut read_half, write_half) = stream.into_split();

    let (out_tx, out_rx): (OutboundTx, OutboundRx) = mpsc::channel(ctx.config.queue_capacity);
    let mut writer = tokio::spawn(run_writer(conn, write_half, out_rx, ctx.config.keepalive));
    let mut writer_done = false;

    let mut framer = LineFramer::new(ctx.config.max_payload);
    let mut session = Session::new(conn, ctx, out_tx);
    let mut buf = vec![0u8; READ_CHUNK];

    let result = loop {
        tokio::select! {
            read = read_half.read(&mut buf) => match read {
                Ok(0) => {
                    debug!(%conn, "peer closed connection");
                    break Ok(());
                }
                Ok(n) => {
                    framer.extend(&buf[..n]);
                    if let Err(err) = session.drain(&mut framer).await {
                        warn!(%conn, error = %err, "dropping connection");
                        break Err(err.into());
                    }
                }
                Err(err) => break Err(err.into()),
            },
            _ = &mut writer, if !writer_done => {
                // Queue dropped by the hub or the socket refused a write.
                writer_done = true;
                debug!(%conn, "writer finished");
                break Ok(());
            }
            _ = wait_for_shutdown(&mut shutdown) => break Ok(()),
        }
    };

    session.close().await;
    if !writer_done {
        writer.abort();
    }
    result
}

/// Drain the outbound queue onto the socket.
async fn run_writer(conn: ConnectionId, mut socket: OwnedWriteHalf, mut rx: OutboundRx, keepalive: Duration) {
    let ping = encode(&OutboundEvent::Ping);

    loop {
        let payload: Bytes = match tokio::time::timeout(keepalive, rx.recv()).await {
            Ok(Some(payload)) => payload,
            Ok(None) => break,
            Err(_idle) => match &ping {
                Some(ping) => ping.clone(),
                None => continue,
            },
        };

        match tokio::time::timeout(WRITE_TIMEOUT, socket.write_all(&payload)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                debug!(%conn, error = %err, "write failed");
                break;
            }
            Err(_) => {
                warn!(%conn, "write timed out");
                break;
            }
        }
    }

    let _ = socket.shutdown().await;
}

// ----------------------------------------------------------------------
// Session state
// ----------------------------------------------------------------------

struct Session {
    conn: ConnectionId,
    ctx: ClientContext,
    identity: ParticipantId,
    /// Our own queue until the connection joins the hub, which then owns it.
    pending: Option<OutboundTx>,
}

impl Session {
    fn new(conn: ConnectionId, ctx: ClientContext, tx: OutboundTx) -> Self {
        Session {
            conn,
            ctx,
            identity: ParticipantId::generate(),
            pending: Some(tx),
        }
    }

    fn identified(&self) -> bool {
        self.pending.is_none()
    }

    /// Handle every complete frame buffered so far. Only an oversize
    /// frame is fatal; malformed ones are skipped.
    async fn drain(&mut self, framer: &mut LineFramer) -> Result<(), ProtocolError> {
        while let Some(frame) = framer.next_frame()? {
            match decode_action(&frame) {
                Ok(Some(action)) => self.handle(action).await,
                Ok(None) => debug!(conn = %self.conn, "ignoring unknown action"),
                Err(err) => warn!(conn = %self.conn, error = %err, "ignoring malformed payload"),
            }
        }
        Ok(())
    }

    async fn handle(&mut self, action: InboundAction) {
        match action {
            InboundAction::PlaceBet {
                category,
                selector,
                stake,
            } => self.place_bet(&category, &selector, stake).await,

            InboundAction::SetName { name } => {
                self.ctx.registry.register(&self.identity);
                self.ctx.registry.set_display_name(&self.identity, &name);
                self.join().await;
            }

            InboundAction::Reconnect { identity, name } => {
                if self.identified() {
                    debug!(conn = %self.conn, "already identified, ignoring reconnect");
                    return;
                }
                let previous = ParticipantId::from(identity);
                if self.ctx.registry.contains(&previous) {
                    info!(conn = %self.conn, identity = %previous, "session resumed");
                    self.identity = previous;
                } else {
                    debug!(conn = %self.conn, "unknown identity, starting fresh");
                    self.ctx.registry.register(&self.identity);
                }
                self.ctx.registry.set_display_name(&self.identity, &name);
                self.join().await;
            }
        }
    }

    async fn place_bet(&mut self, category: &str, selector: &str, stake: i64) {
        let submitted = if self.identified() {
            self.ctx
                .engine
                .submit_wager(&self.identity, category, selector, stake)
                .await
        } else {
            Err(WagerError::UnknownParticipant)
        };
        let placement = match submitted {
            Ok(placement) => placement,
            Err(err) => {
                debug!(conn = %self.conn, identity = %self.identity, reason = %err, "bet rejected");
                self.reply(&OutboundEvent::BetRejected {
                    reason: err.to_string(),
                });
                return;
            }
        };

        let wager = &placement.wager;
        let category = wager.selection.category();
        let selector = wager.selection.selector();
        debug!(
            identity = %self.identity,
            %category,
            selector = %selector,
            stake = wager.stake,
            "bet accepted"
        );

        self.reply(&OutboundEvent::BetAccepted {
            category,
            selector: selector.clone(),
            stake: wager.stake,
            balance: placement.balance,
        });
        self.broadcast(&OutboundEvent::BetPlaced {
            identity: self.identity.clone(),
            name: self.ctx.registry.display_name(&self.identity).unwrap_or_default(),
            category,
            selector,
            stake: wager.stake,
        });
        self.broadcast(&OutboundEvent::PlayerBalanceUpdated {
            identity: self.identity.clone(),
            balance: placement.balance,
        });
    }

    /// Bind to the hub, send the session snapshot, announce arrival.
    async fn join(&mut self) {
        let participant = self.ctx.registry.register(&self.identity);

        // Bind before clearing the stamp: a closing connection on the same
        // identity re-checks the hub after stamping, so one of the two
        // always sees the other.
        if let Some(tx) = self.pending.take() {
            self.ctx.hub.register(self.conn, self.identity.clone(), tx);
        }
        self.ctx.registry.mark_reconnected(&self.identity);
        info!(conn = %self.conn, identity = %self.identity, name = %participant.name, "participant joined");

        let online = self.ctx.hub.connected_identities().await;
        let players = self.ctx.registry.snapshot_all(|id| online.contains(id));
        self.reply(&OutboundEvent::Welcome {
            identity: self.identity.clone(),
            balance: participant.balance,
            history: self.ctx.engine.history(),
            players,
        });
        self.reply(&self.ctx.engine.game_state());

        if let Some(current) = self.ctx.registry.get(&self.identity) {
            self.broadcast(&OutboundEvent::PlayerJoined {
                player: current.summary(true),
            });
        }
    }

    /// Leave the hub and, if no other connection carries this identity,
    /// start its grace period.
    async fn close(&mut self) {
        if !self.identified() {
            return;
        }
        self.ctx.hub.unregister(self.conn);
        self.ctx.registry.mark_disconnected(&self.identity);
        if self.ctx.hub.is_connected(&self.identity).await {
            // Another connection carries this identity, or joined while
            // we were stamping.
            self.ctx.registry.mark_reconnected(&self.identity);
            return;
        }
        info!(conn = %self.conn, identity = %self.identity, "participant disconnected");
        self.broadcast(&OutboundEvent::PlayerLeft {
            identity: self.identity.clone(),
        });
    }

    /// Send to this connection only.
    fn reply(&self, event: &OutboundEvent) {
        let Some(payload) = encode(event) else {
            return;
        };
        match &self.pending {
            Some(tx) => {
                if let Err(TrySendError::Full(_)) = tx.try_send(payload) {
                    warn!(conn = %self.conn, kind = event.kind(), "outbound queue full, reply dropped");
                }
            }
            None => self.ctx.hub.deliver(self.conn, payload),
        }
    }

    fn broadcast(&self, event: &OutboundEvent) {
        if let Some(payload) = encode(event) {
            self.ctx.hub.broadcast(payload);
        }
    }
}
