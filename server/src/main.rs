use clap::Parser;
use log::{error, info};
use server::network::Server;
use shared::DEFAULT_PORT;
use tokio::sync::watch;

/// Main-method of the application.
/// Parses command-line arguments, then runs the match server until Ctrl+C.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Command line arguments
    #[derive(Parser, Debug)]
    #[clap(author, version, about)]
    struct Args {
        /// Server IP address to bind to
        #[clap(short = 'H', long, default_value = "0.0.0.0")]
        host: String,
        /// Server port to listen on
        #[clap(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,
        /// Seed for invader spawns; match n uses seed + n
        #[clap(short, long)]
        seed: Option<u64>,
    }

    env_logger::init();

    // Parse command line arguments
    let args = Args::parse();

    let address = format!("{}:{}", args.host, args.port);
    let server = Server::bind(&address, args.seed).await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Spawn network task
    let mut server_handle = tokio::spawn(async move {
        if let Err(e) = server.run(shutdown_rx).await {
            error!("Server error: {}", e);
        }
    });

    // Handle shutdown gracefully
    tokio::select! {
        result = &mut server_handle => {
            if let Err(e) = result {
                error!("Server task panicked: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
            let _ = shutdown_tx.send(true);
            if let Err(e) = server_handle.await {
                error!("Server task panicked: {}", e);
            }
        }
    }

    Ok(())
}
