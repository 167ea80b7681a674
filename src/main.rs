//! dnsprox - DNS tunnel receiver
//!
//! Runs the tunnel listener and logs every decoded request, or sends a
//! single tunnel query for testing a deployment.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::sync::mpsc;

use dnsprox::{
    check_payload_len, send_payload, DnsTunnelServer, ParsedRequest, TunnelConfig, TunnelDomain,
};

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_HASH"),
    ", built ",
    env!("BUILD_DATE"),
    ")"
);

#[derive(Parser)]
#[command(name = "dnsprox")]
#[command(version, long_version = LONG_VERSION)]
#[command(about = "DNS tunnel receiver", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", env = "DNSPROX_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Listen for tunnel queries and log decoded requests
    Serve {
        /// Tunnel domain (overrides config)
        #[arg(short, long)]
        domain: Option<String>,

        /// UDP bind address (overrides config)
        #[arg(short, long)]
        bind: Option<String>,

        /// Raw payload size in bytes (overrides config)
        #[arg(short, long)]
        payload_size: Option<u8>,

        /// Request channel capacity (overrides config)
        #[arg(long)]
        queue_capacity: Option<usize>,
    },

    /// Send one tunnel query
    Send {
        /// Tunnel server address
        #[arg(short, long)]
        server: SocketAddr,

        /// Tunnel domain
        #[arg(short, long)]
        domain: String,

        /// Raw payload size the server expects, in bytes
        #[arg(short, long)]
        payload_size: u8,

        /// Payload as hex, exactly `--payload-size` bytes
        #[arg(long)]
        data: String,

        /// Transaction ID (random if omitted)
        #[arg(long)]
        id: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logger
    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    match cli.command {
        Commands::Serve {
            domain,
            bind,
            payload_size,
            queue_capacity,
        } => {
            let mut config = match cli.config {
                Some(path) => TunnelConfig::from_file(&path)
                    .with_context(|| format!("Failed to load config {}", path.display()))?,
                None => TunnelConfig::default(),
            };
            if let Some(domain) = domain {
                config.domain = domain;
            }
            if let Some(bind) = bind {
                config.listen_addr = bind;
            }
            if let Some(size) = payload_size {
                config.payload_size = size;
            }
            if let Some(capacity) = queue_capacity {
                config.queue_capacity = capacity;
            }
            run_server(config).await?;
        }
        Commands::Send {
            server,
            domain,
            payload_size,
            data,
            id,
        } => {
            run_send(server, &domain, payload_size, &data, id).await?;
        }
    }

    Ok(())
}

async fn run_server(config: TunnelConfig) -> Result<()> {
    info!(
        "Starting dnsprox server for {} ({} byte payloads)",
        config.domain, config.payload_size
    );

    let server = DnsTunnelServer::from_config(&config)?.bind().await?;
    let (tx, mut rx) = mpsc::channel::<ParsedRequest>(config.queue_capacity);

    let consumer = tokio::spawn(async move {
        while let Some(request) = rx.recv().await {
            info!(
                "[{:04x}] {} {} => {}",
                request.transaction_id(),
                request.peer,
                request.domain_name(),
                hex::encode(&request.data)
            );
        }
    });

    let result = server.run(tx).await;
    consumer.abort();
    result.context("DNS tunnel server stopped")
}

async fn run_send(
    server: SocketAddr,
    domain: &str,
    payload_size: u8,
    data: &str,
    id: Option<u16>,
) -> Result<()> {
    let domain = TunnelDomain::parse(domain)?;
    let payload = hex::decode(data).context("--data must be hex")?;
    check_payload_len(&payload, payload_size).context("--data does not match --payload-size")?;
    let id = id.unwrap_or_else(rand::random);

    let sent = send_payload(server, &domain, &payload, id).await?;
    info!(
        "Sent {} byte payload to {} as query {:04x} ({} bytes on the wire)",
        payload.len(),
        server,
        id,
        sent
    );

    Ok(())
}
