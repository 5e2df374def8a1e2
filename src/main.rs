//! NX9 DNS Forwarder
//!
//! A UDP DNS server that forwards every question to one upstream resolver.

use log::{error, info};
use tokio::signal;

use nx9_dns_forwarder::{config::ServerConfig, errors::DnsError, handlers::run_udp_server};

#[tokio::main]
async fn main() -> Result<(), DnsError> {
    // Initialize the logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .init();

    let config = ServerConfig::load()?;

    let shutdown_signal = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received"),
            Err(e) => {
                error!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await
            }
        }
    };

    tokio::select! {
        _ = shutdown_signal => {
            info!("Shutting down");
            Ok(())
        },
        res = run_udp_server(config) => res,
    }
}
