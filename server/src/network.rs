//! Server network layer: TCP listener, handshake and per-connection session loop

use crate::game::{new_engine, spawn_match};
use crate::lobby::{Lobby, Seat};
use log::{debug, error, info, warn};
use shared::framing::{read_frame, write_frame, FrameError};
use shared::protocol::{encode_player_token, CommandBatch, Greeting};
use shared::{CONNECT_TIMEOUT, MAX_BATCH_BYTES, MAX_GREETING_BYTES};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{watch, RwLock};
use tokio::time::timeout;

/// Accepts connections and seats each one in a match
pub struct Server {
    listener: TcpListener,
    lobby: Arc<RwLock<Lobby>>,
    seed: Option<u64>,
}

impl Server {
    /// Binds the listener. With a `seed`, match `n` runs on seed `seed + n`.
    pub async fn bind(addr: &str, seed: Option<u64>) -> Result<Self, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind(addr).await?;
        info!("Server listening on {}", listener.local_addr()?);

        Ok(Server {
            listener,
            lobby: Arc::new(RwLock::new(Lobby::new())),
            seed,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn lobby(&self) -> Arc<RwLock<Lobby>> {
        Arc::clone(&self.lobby)
    }

    /// Accepts connections until `shutdown` turns true or its sender is dropped.
    /// Open sessions watch the same flag and close on their own.
    pub async fn run(
        self,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        info!("Server started successfully");

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, addr)) => {
                            let lobby = Arc::clone(&self.lobby);
                            let shutdown = shutdown.clone();
                            let seed = self.seed;
                            tokio::spawn(async move {
                                handle_connection(stream, addr, lobby, seed, shutdown).await;
                            });
                        }
                        Err(e) => {
                            error!("Error accepting connection: {}", e);
                        }
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!("Server shutting down");
        Ok(())
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    addr: SocketAddr,
    lobby: Arc<RwLock<Lobby>>,
    seed: Option<u64>,
    mut shutdown: watch::Receiver<bool>,
) {
    if let Err(e) = stream.set_nodelay(true) {
        debug!("Could not disable Nagle for {}: {}", addr, e);
    }

    let seat = {
        let mut lobby = lobby.write().await;
        lobby.join(|id| spawn_match(id, new_engine(seed, id)))
    };
    info!(
        "Client {} seated as player {} in match {}",
        addr, seat.player, seat.match_id
    );

    match handshake(&mut stream, &seat).await {
        Ok(greeting) => {
            if seat.handle.join(seat.player, greeting).await {
                lobby.write().await.confirm(seat.match_id, seat.player);
                match serve(&mut stream, &seat, &mut shutdown).await {
                    Ok(()) => debug!("Session for {} ended", addr),
                    Err(e) => warn!("Session for {} failed: {}", addr, e),
                }
                seat.handle.leave(seat.player).await;
            }
        }
        Err(e) => warn!("Handshake with {} failed: {}", addr, e),
    }

    let removed = lobby.write().await.leave(seat.match_id, seat.player);
    info!(
        "Client {} disconnected from match {}{}",
        addr,
        seat.match_id,
        if removed { " (match closed)" } else { "" }
    );
}

/// Sends the seat's player index and reads back `name|style`.
async fn handshake(stream: &mut TcpStream, seat: &Seat) -> Result<Greeting, FrameError> {
    write_frame(stream, encode_player_token(seat.player).as_bytes()).await?;

    let reply = timeout(CONNECT_TIMEOUT, read_frame(stream, MAX_GREETING_BYTES))
        .await
        .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "handshake timed out"))??;

    Ok(Greeting::parse(
        &String::from_utf8_lossy(&reply),
        seat.player,
    ))
}

/// Request/response loop: one command batch in, one snapshot out.
///
/// Ends cleanly on EOF, an empty batch, a closed match or shutdown. A batch
/// that is too large or does not parse is answered with the current snapshot
/// and otherwise ignored.
async fn serve(
    stream: &mut TcpStream,
    seat: &Seat,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<(), FrameError> {
    loop {
        if *shutdown.borrow() {
            return Ok(());
        }

        let frame = tokio::select! {
            frame = read_frame(stream, MAX_BATCH_BYTES) => frame,
            _ = shutdown.changed() => return Ok(()),
        };

        let batch = match frame {
            Ok(bytes) if bytes.is_empty() => return Ok(()),
            Ok(bytes) => CommandBatch::from_bytes(&bytes).unwrap_or_else(|e| {
                warn!("Player {} sent a bad batch: {}", seat.player, e);
                CommandBatch::new()
            }),
            Err(FrameError::Oversized { len, max }) => {
                warn!(
                    "Player {} sent {} bytes, limit is {}",
                    seat.player, len, max
                );
                CommandBatch::new()
            }
            Err(FrameError::Closed) => return Ok(()),
            Err(e) => return Err(e),
        };

        let Some(snapshot) = seat.handle.submit(seat.player, batch).await else {
            debug!("Match {} is gone", seat.match_id);
            return Ok(());
        };

        let bytes = snapshot
            .encode()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        write_frame(stream, &bytes).await?;
    }
}
