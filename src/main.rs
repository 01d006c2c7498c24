use anyhow::Result;
use clap::{Parser, Subcommand};
use saferoute::RoadNetwork;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "saferoute")]
#[command(about = "Routing over a precomputed road network with exclusion zones", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP routing server
    Serve {
        /// Precomputed network artifact
        graph: PathBuf,
        /// Address to listen on
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
        /// Port to listen on
        #[arg(short, long, default_value = "8000")]
        port: u16,
        /// Per-request deadline in seconds
        #[arg(long, default_value = "30")]
        timeout: u64,
    },
    /// Print artifact statistics and exit
    Inspect {
        /// Precomputed network artifact
        graph: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("saferoute=info,tower_http=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            graph,
            host,
            port,
            timeout,
        } => {
            let addr: SocketAddr = format!("{host}:{port}").parse()?;
            saferoute::server::serve(graph, addr, Duration::from_secs(timeout)).await?;
        }
        Commands::Inspect { graph } => {
            let net = RoadNetwork::load(&graph)?;
            println!("artifact:  {}", graph.display());
            println!("crs:       EPSG:{}", net.crs_epsg());
            println!("nodes:     {}", net.node_count());
            println!("arcs:      {}", net.arc_count());
        }
    }

    Ok(())
}
