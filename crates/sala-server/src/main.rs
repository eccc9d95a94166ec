//! Sala server binary.
//!
//! # Usage
//!
//! ```bash
//! # Listen on every interface, port 7777
//! sala-server 7777
//!
//! # Loopback only, verbose logging
//! sala-server 7777 --bind 127.0.0.1 --log-level debug
//! ```

use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    time::Duration,
};

use clap::Parser;
use sala_server::{ConnectionConfig, DriverConfig, Server, ServerRuntimeConfig};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Sala chat server
#[derive(Parser, Debug)]
#[command(name = "sala-server")]
#[command(about = "Line-delimited multi-room chat server")]
#[command(version)]
struct Args {
    /// TCP port to listen on
    port: u16,

    /// Address to bind to
    #[arg(short, long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    bind: IpAddr,

    /// Maximum concurrent connections
    #[arg(long, default_value = "10000")]
    max_connections: usize,

    /// Longest accepted input line in bytes
    #[arg(long, default_value = "16384")]
    max_line_length: usize,

    /// Lines queued for a slow peer before it is disconnected
    #[arg(long, default_value = "1024")]
    outbound_queue: usize,

    /// Seconds a write to a peer may block before it is disconnected
    #[arg(long, default_value = "30")]
    write_timeout: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let bind_address = SocketAddr::new(args.bind, args.port);
    tracing::info!("Sala server starting");
    tracing::info!("Binding to {}", bind_address);

    let config = ServerRuntimeConfig {
        bind_address: bind_address.to_string(),
        driver: DriverConfig {
            max_connections: args.max_connections,
            max_line_length: args.max_line_length,
        },
        connection: ConnectionConfig {
            outbound_capacity: args.outbound_queue,
            write_timeout: Duration::from_secs(args.write_timeout),
        },
    };

    let server = Server::bind(config).await?;
    server.run().await?;

    Ok(())
}
