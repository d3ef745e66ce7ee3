// crates/roulette-client/src/network.rs

use anyhow::Result;
use roulette_protocol::{decode_event, encode_action, frame, InboundAction, LineFramer};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::time::Duration;
use tracing::{debug, error, info, warn};

use crate::types::NetworkEvent;

/// Server frames can carry the whole player list, so allow far more than
/// the server accepts inbound.
const MAX_FRAME: usize = 1024 * 1024;

pub struct ServerConnection {
    server_addr: String,
    tx: UnboundedSender<NetworkEvent>,
    reconnect_attempts: u32,
}

impl ServerConnection {
    pub fn new(server_addr: &str, tx: UnboundedSender<NetworkEvent>) -> Self {
        Self {
            server_addr: server_addr.to_string(),
            tx,
            reconnect_attempts: 0,
        }
    }

    /// Keep a connection up until the app drops its action sender.
    ///
    /// Every successful connect is reported as [`NetworkEvent::Connected`];
    /// the app answers by identifying itself. Actions queued while the
    /// link was down are discarded.
    pub async fn run(mut self, mut rx: UnboundedReceiver<InboundAction>) {
        loop {
            let stream = match self.connect().await {
                Ok(stream) => stream,
                Err(e) => {
                    error!("Connection to {} failed: {}", self.server_addr, e);
                    self.report(NetworkEvent::Disconnected(e.to_string()));
                    self.backoff().await;
                    continue;
                }
            };
            if !self.report(NetworkEvent::Connected) {
                return;
            }

            let reason = match self.pump(stream, &mut rx).await {
                Some(reason) => reason,
                None => return,
            };
            warn!("Connection lost: {}", reason);
            while rx.try_recv().is_ok() {}
            if !self.report(NetworkEvent::Disconnected(reason)) {
                return;
            }
            self.backoff().await;
        }
    }

    async fn connect(&mut self) -> Result<TcpStream> {
        info!("Connecting to {}...", self.server_addr);
        let stream = TcpStream::connect(&self.server_addr).await?;
        stream.set_nodelay(true)?;
        self.reconnect_attempts = 0;
        info!("Connected successfully");
        Ok(stream)
    }

    /// Shuttle actions out and events in. Returns why the link dropped,
    /// or `None` once the app has gone away.
    async fn pump(&mut self, stream: TcpStream, rx: &mut UnboundedReceiver<InboundAction>) -> Option<String> {
        let (mut read_half, mut write_half) = stream.into_split();
        let mut framer = LineFramer::new(MAX_FRAME);
        let mut buf = [0u8; 4096];

        loop {
            tokio::select! {
                action = rx.recv() => {
                    let action = action?;
                    if let Err(e) = send(&mut write_half, &action).await {
                        return Some(format!("send failed: {e}"));
                    }
                }
                read = read_half.read(&mut buf) => match read {
                    Ok(0) => return Some("server closed the connection".to_string()),
                    Ok(n) => {
                        framer.extend(&buf[..n]);
                        if let Err(e) = self.forward(&mut framer) {
                            return Some(e.to_string());
                        }
                        if self.tx.is_closed() {
                            return None;
                        }
                    }
                    Err(e) => return Some(format!("read failed: {e}")),
                },
            }
        }
    }

    /// Hand every complete frame to the app. Frames that do not decode
    /// are skipped.
    fn forward(&self, framer: &mut LineFramer) -> Result<()> {
        while let Some(line) = framer.next_frame()? {
            match decode_event(&line) {
                Ok(event) => {
                    debug!("Received {}", event.kind());
                    self.report(NetworkEvent::Message(event));
                }
                Err(e) => warn!("Undecodable frame from server: {}", e),
            }
        }
        Ok(())
    }

    fn report(&self, event: NetworkEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    async fn backoff(&mut self) {
        self.reconnect_attempts += 1;

        // Exponential backoff
        let delay = Duration::from_millis(500 * 2_u64.pow(self.reconnect_attempts.min(5)));
        debug!("Reconnecting in {:?}", delay);
        tokio::time::sleep(delay).await;
    }
}

async fn send(stream: &mut OwnedWriteHalf, action: &InboundAction) -> Result<()> {
    let payload = frame(&encode_action(action)?);
    stream.write_all(&payload).await?;
    stream.flush().await?;
    debug!("Sent {:?}", action);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use roulette_protocol::{encode_event, OutboundEvent};
    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn relays_actions_and_events() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let (event_tx, mut events) = mpsc::unbounded_channel();
        let (action_tx, actions) = mpsc::unbounded_channel();
        let task = tokio::spawn(ServerConnection::new(&addr, event_tx).run(actions));

        let (server_side, _) = listener.accept().await.unwrap();
        assert_eq!(events.recv().await, Some(NetworkEvent::Connected));

        action_tx
            .send(InboundAction::SetName { name: "Ann".into() })
            .unwrap();
        let (read, mut write) = server_side.into_split();
        let mut line = String::new();
        BufReader::new(read).read_line(&mut line).await.unwrap();
        assert_eq!(line, "{\"action\":\"set_name\",\"name\":\"Ann\"}\n");

        let ping = frame(&encode_event(&OutboundEvent::Ping).unwrap());
        write.write_all(&ping).await.unwrap();
        assert_eq!(events.recv().await, Some(NetworkEvent::Message(OutboundEvent::Ping)));

        drop(action_tx);
        task.await.unwrap();
    }
}
