//! # Game Client Library
//!
//! Client side of the arcade shooter: local games for one player or two
//! sharing a screen, and online games played against a match server.
//!
//! ## Architecture Overview
//!
//! ### Thin Online Client
//! Online games are not predicted locally. Every frame the client sends one
//! command batch and draws whatever snapshot the server answers with, so both
//! players always see the same authoritative world.
//!
//! ### Never Fail The Frame
//! Network trouble is reported as state rather than errors. A lost connection
//! makes the proxy report itself disconnected; an unreadable snapshot is
//! replaced by the last good one so the screen keeps drawing.
//!
//! ### Collaborators
//! Drawing, sound and high-score storage are behind the [`rendering::RenderSink`]
//! and [`scores::ScoreStore`] traits. The crate ships a logging sink and an
//! in-memory leaderboard, which is all the headless binary needs.
//!
//! ## Module Organization
//!
//! ### Game Module (`game`)
//! - Local solo and same-screen pair games
//! - Frame loops for local and online play
//! - Game summaries and score recording
//!
//! ### Input Module (`input`)
//! - Key press/release events and the command batch built from them
//! - Input sources, including a scripted autopilot
//!
//! ### Network Module (`network`)
//! - Handshake with the match server
//! - One request/response exchange per frame
//! - Disconnect handling
//!
//! ### Cache Module (`cache`)
//! - Last good snapshot kept for unreadable replies
//!
//! ### Rendering Module (`rendering`)
//! - Render sink trait and draw order
//! - Logging renderer for headless runs
//!
//! ### Scores Module (`scores`)
//! - Score store trait and top-ten leaderboard
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::game::{run_online, LoopConfig};
//! use client::input::Autopilot;
//! use client::network::ClientProxy;
//! use client::rendering::LogRenderer;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut proxy = ClientProxy::new();
//!     if !proxy.connect("127.0.0.1:1313", "ACE", 0).await {
//!         return;
//!     }
//!
//!     let viewer = proxy.player_index().unwrap_or(0);
//!     let mut renderer = LogRenderer::new(viewer, 60);
//!     let summary = run_online(
//!         &mut proxy,
//!         &mut Autopilot::default(),
//!         &mut renderer,
//!         &LoopConfig::from_fps(60),
//!     )
//!     .await;
//!     println!("{:?} with {} points", summary.outcome, summary.total_score());
//! }
//! ```

pub mod cache;
pub mod game;
pub mod input;
pub mod network;
pub mod rendering;
pub mod scores;
