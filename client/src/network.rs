//! Client side of the match protocol: handshake, request/response, disconnect

use crate::cache::LastGood;
use log::{debug, info, warn};
use shared::framing::{read_frame, write_frame, FrameError};
use shared::protocol::{parse_player_token, CommandBatch, Greeting, Snapshot};
use shared::{CONNECT_TIMEOUT, MAX_SNAPSHOT_BYTES, MAX_TOKEN_BYTES};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Connection to a match server.
///
/// No method returns an error. Connection problems show up as
/// `is_connected() == false` and `None` replies; unreadable snapshots are
/// replaced by the last good one.
pub struct ClientProxy {
    stream: Option<TcpStream>,
    player: Option<usize>,
    cache: LastGood<Snapshot>,
}

impl ClientProxy {
    pub fn new() -> Self {
        Self {
            stream: None,
            player: None,
            cache: LastGood::new(),
        }
    }

    /// Connects and completes the handshake within [`CONNECT_TIMEOUT`].
    /// Returns whether the proxy is now connected.
    pub async fn connect(&mut self, addr: &str, name: &str, style: u8) -> bool {
        self.disconnect().await;

        match timeout(CONNECT_TIMEOUT, Self::open(addr, name, style)).await {
            Ok(Ok((stream, player))) => {
                info!("Connected to {} as player {}", addr, player);
                self.stream = Some(stream);
                self.player = Some(player);
                true
            }
            Ok(Err(e)) => {
                warn!("Could not connect to {}: {}", addr, e);
                false
            }
            Err(_) => {
                warn!("Connecting to {} timed out", addr);
                false
            }
        }
    }

    async fn open(
        addr: &str,
        name: &str,
        style: u8,
    ) -> Result<(TcpStream, usize), Box<dyn std::error::Error>> {
        let mut stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;

        let token = read_frame(&mut stream, MAX_TOKEN_BYTES).await?;
        let player = parse_player_token(&String::from_utf8_lossy(&token))?;

        let greeting = Greeting::new(name, style).encode();
        write_frame(&mut stream, greeting.as_bytes()).await?;

        Ok((stream, player))
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    pub fn player_index(&self) -> Option<usize> {
        self.player
    }

    pub fn last_snapshot(&self) -> Option<&Snapshot> {
        self.cache.get()
    }

    pub fn fallbacks(&self) -> u64 {
        self.cache.fallbacks()
    }

    /// Sends one batch and waits for the snapshot it produced.
    ///
    /// Returns `None` when not connected or when the connection fails, which
    /// also disconnects the proxy. A reply that cannot be decoded yields the
    /// last good snapshot instead.
    pub async fn exchange(&mut self, batch: &CommandBatch) -> Option<Snapshot> {
        let stream = self.stream.as_mut()?;

        if let Err(e) = write_frame(stream, &batch.to_bytes()).await {
            warn!("Failed to send batch: {}", e);
            self.drop_connection();
            return None;
        }

        let reply = match timeout(CONNECT_TIMEOUT, read_frame(stream, MAX_SNAPSHOT_BYTES)).await {
            Ok(reply) => reply,
            Err(_) => {
                warn!("Server did not answer in time");
                self.drop_connection();
                return None;
            }
        };

        match reply {
            Ok(bytes) => self.cache.update(Snapshot::decode(&bytes)),
            Err(e @ FrameError::Oversized { .. }) => self.cache.update(Err::<Snapshot, _>(e)),
            Err(e) => {
                warn!("Connection lost: {}", e);
                self.drop_connection();
                None
            }
        }
    }

    /// Says goodbye with an empty frame and closes the connection. Does
    /// nothing if already disconnected.
    pub async fn disconnect(&mut self) {
        let Some(mut stream) = self.stream.take() else {
            return;
        };

        if let Err(e) = write_frame(&mut stream, &[]).await {
            debug!("Goodbye frame not sent: {}", e);
        }
        if let Err(e) = stream.shutdown().await {
            debug!("Shutdown failed: {}", e);
        }
        self.player = None;
        info!("Disconnected");
    }

    fn drop_connection(&mut self) {
        self.stream = None;
        self.player = None;
    }
}

impl Default for ClientProxy {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{Engine, GameMode};
    use tokio::net::TcpListener;

    fn snapshot_bytes() -> Vec<u8> {
        let mut engine = Engine::with_seed(GameMode::Pair, 1);
        let names = ["A".to_string(), "B".to_string()];
        Snapshot::capture(&mut engine, 0, true, names)
            .encode()
            .unwrap()
    }

    /// Accepts one client, seats it as player 0 and answers each batch with
    /// the next scripted reply.
    async fn scripted_server(replies: Vec<Vec<u8>>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            write_frame(&mut stream, b"0").await.unwrap();
            read_frame(&mut stream, 1024).await.unwrap();

            for reply in replies {
                if read_frame(&mut stream, 512).await.is_err() {
                    return;
                }
                write_frame(&mut stream, &reply).await.unwrap();
            }
        });

        addr
    }

    #[tokio::test]
    async fn test_garbage_reply_returns_previous_snapshot() {
        let good = snapshot_bytes();
        let truncated = good[..good.len() / 2].to_vec();
        let addr = scripted_server(vec![good, b"garbage".to_vec(), truncated]).await;

        let mut proxy = ClientProxy::new();
        assert!(proxy.connect(&addr, "ACE", 0).await);
        assert_eq!(proxy.player_index(), Some(0));

        let first = proxy.exchange(&CommandBatch::new()).await.unwrap();
        let second = proxy.exchange(&CommandBatch::new()).await.unwrap();
        let third = proxy.exchange(&CommandBatch::new()).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first, third);
        assert_eq!(proxy.fallbacks(), 2);
        assert!(proxy.is_connected());
    }

    #[tokio::test]
    async fn test_server_hangup_disconnects() {
        let addr = scripted_server(vec![snapshot_bytes()]).await;

        let mut proxy = ClientProxy::new();
        assert!(proxy.connect(&addr, "ACE", 0).await);
        assert!(proxy.exchange(&CommandBatch::new()).await.is_some());

        assert!(proxy.exchange(&CommandBatch::new()).await.is_none());
        assert!(!proxy.is_connected());
        assert_eq!(proxy.player_index(), None);
    }

    #[tokio::test]
    async fn test_connect_failure_is_reported_by_flag() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let mut proxy = ClientProxy::new();
        assert!(!proxy.connect(&addr, "ACE", 0).await);
        assert!(!proxy.is_connected());
        assert!(proxy.exchange(&CommandBatch::new()).await.is_none());
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let addr = scripted_server(vec![]).await;

        let mut proxy = ClientProxy::new();
        assert!(proxy.connect(&addr, "ACE", 0).await);
        proxy.disconnect().await;
        proxy.disconnect().await;
        assert!(!proxy.is_connected());
    }
}
