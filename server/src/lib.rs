//! # Game Server Library
//!
//! Authoritative server for networked two-player matches. Clients connect over
//! TCP, are seated in a match, and then poll it: each request carries one
//! command batch and each reply is a full snapshot of the match.
//!
//! ## Architecture Design
//!
//! ### One Task Per Match
//! Every match is owned by a single task that holds its engine exclusively.
//! Sessions never touch the engine; they submit batches through a channel and
//! await the snapshot the task sends back. Batches from the two players are
//! therefore applied one at a time, in arrival order.
//!
//! ### Tick Authority
//! Both players send an elapsed-time delta with every batch, but only one of
//! them may advance physics: player 0, or whichever player is alone in the
//! match. A polling interval therefore advances the game exactly once.
//!
//! ### Framed TCP
//! Every message is length-prefixed (see `shared::framing`), so replies to the
//! two players can never run together on the wire.
//!
//! ## Module Organization
//!
//! ### Lobby Module (`lobby`)
//! Matchmaking and the registry of live matches:
//! - Seating new connections in the oldest open match or a new one
//! - Player counts and the ready flag per match
//! - Removing a match when its last player leaves
//!
//! ### Game Module (`game`)
//! The match state and the task that owns it:
//! - Engine, names and seating as seen by the match
//! - Tick-authority rule
//! - Command queue and snapshot replies
//!
//! ### Network Module (`network`)
//! TCP listener and per-connection session loop:
//! - Handshake (player index out, `name|style` back)
//! - Request/response loop with size limits
//! - Cooperative shutdown through a watch channel
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::Server;
//! use tokio::sync::watch;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Server::bind("0.0.0.0:1313", None).await?;
//!     let (shutdown_tx, shutdown_rx) = watch::channel(false);
//!
//!     // Flip the flag to stop accepting and close every session.
//!     tokio::spawn(async move {
//!         let _ = tokio::signal::ctrl_c().await;
//!         let _ = shutdown_tx.send(true);
//!     });
//!
//!     server.run(shutdown_rx).await
//! }
//! ```

pub mod game;
pub mod lobby;
pub mod network;
