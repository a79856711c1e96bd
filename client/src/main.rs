use clap::{Parser, Subcommand};
use client::game::{record_score, run_local, run_online, LocalGame, LoopConfig};
use client::input::{Autopilot, InputSource};
use client::network::ClientProxy;
use client::rendering::LogRenderer;
use client::scores::{Leaderboard, LeaderboardMode, ScoreStore};
use log::{error, info};
use server::network::Server;
use shared::DEFAULT_PORT;
use tokio::sync::watch;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    mode: Mode,

    /// Display name
    #[arg(short = 'n', long, default_value = "PLAYER-1")]
    name: String,

    /// Spaceship style
    #[arg(short = 's', long, default_value = "0")]
    style: u8,

    /// Frames per second
    #[arg(long, default_value = "60")]
    fps: u32,

    /// Stop after this many frames
    #[arg(short = 'f', long)]
    frames: Option<u64>,

    /// Run frames as fast as possible instead of in real time
    #[arg(long)]
    unpaced: bool,

    /// Seed for invader spawns in local games
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Play alone
    Solo,
    /// Two players on one screen
    Pair {
        /// Name of the second player
        #[arg(short = 'p', long, default_value = "PLAYER-2")]
        partner: String,
    },
    /// Join a match on a server
    Online {
        /// Server address to connect to
        #[arg(long, default_value_t = format!("127.0.0.1:{}", DEFAULT_PORT))]
        server: String,
    },
    /// Run a match server in this process and play on it
    Host {
        /// Port to accept other players on
        #[arg(short = 'p', long, default_value_t = DEFAULT_PORT)]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let config = LoopConfig {
        frame_limit: args.frames,
        paced: !args.unpaced,
        ..LoopConfig::from_fps(args.fps)
    };
    let log_every = args.fps.max(1) as u64;
    let mut leaderboard = Leaderboard::new();
    let make_renderer = |viewer: usize, best: u32| LogRenderer::new(viewer, log_every).with_high_score(best);

    let summary = match args.mode {
        Mode::Solo => {
            let mut game = LocalGame::solo(&args.name, args.style, args.seed);
            let mut sources: Vec<Box<dyn InputSource + Send>> = vec![Box::new(Autopilot::default())];
            let mut renderer = make_renderer(0, leaderboard.high_score(LeaderboardMode::Single));
            run_local(&mut game, &mut sources, &mut renderer, &config).await
        }
        Mode::Pair { partner } => {
            let mut game = LocalGame::pair([args.name.as_str(), partner.as_str()], args.style, args.seed);
            let mut sources: Vec<Box<dyn InputSource + Send>> = vec![
                Box::new(Autopilot::default()),
                Box::new(Autopilot::new(120, 15)),
            ];
            let mut renderer = make_renderer(0, leaderboard.high_score(LeaderboardMode::Multi));
            run_local(&mut game, &mut sources, &mut renderer, &config).await
        }
        Mode::Online { server } => {
            info!("Connecting to: {}", server);
            let mut proxy = ClientProxy::new();
            if !proxy.connect(&server, &args.name, args.style).await {
                error!("Could not reach {}", server);
                return Err(format!("could not connect to {}", server).into());
            }

            let viewer = proxy.player_index().unwrap_or(0);
            let mut renderer = make_renderer(viewer, leaderboard.high_score(LeaderboardMode::Multi));
            run_online(&mut proxy, &mut Autopilot::default(), &mut renderer, &config).await
        }
        Mode::Host { port } => {
            let server = Server::bind(&format!("0.0.0.0:{}", port), args.seed).await?;
            let local = format!("127.0.0.1:{}", server.local_addr()?.port());
            let (shutdown_tx, shutdown_rx) = watch::channel(false);
            let server_handle = tokio::spawn(async move {
                if let Err(e) = server.run(shutdown_rx).await {
                    error!("Server error: {}", e);
                }
            });

            info!("Hosting on port {}, waiting for a partner", port);
            let mut proxy = ClientProxy::new();
            if !proxy.connect(&local, &args.name, args.style).await {
                let _ = shutdown_tx.send(true);
                return Err(format!("could not join own server at {}", local).into());
            }

            let viewer = proxy.player_index().unwrap_or(0);
            let mut renderer = make_renderer(viewer, leaderboard.high_score(LeaderboardMode::Multi));
            let summary = run_online(&mut proxy, &mut Autopilot::default(), &mut renderer, &config).await;

            let _ = shutdown_tx.send(true);
            if let Err(e) = server_handle.await {
                error!("Server task panicked: {}", e);
            }
            summary
        }
    };

    let mode = summary.mode;
    if record_score(&mut leaderboard, &summary) {
        info!(
            "{} scored {} (best {})",
            summary.leaderboard_name(),
            summary.total_score(),
            leaderboard.high_score(mode)
        );
    }
    println!(
        "{:?} after {} frames: {} points",
        summary.outcome,
        summary.frames,
        summary.total_score()
    );

    Ok(())
}
