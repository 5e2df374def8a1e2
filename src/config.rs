//! Configuration for the DNS forwarder.
//!
//! Settings come from command-line flags, each with an environment variable
//! fallback, and are validated into a [`ServerConfig`].

use std::{
    net::{Ipv4Addr, SocketAddr},
    time::Duration,
};

use clap::Parser;

use crate::errors::DnsError;
use crate::header::HEADER_LEN;

/// Default listen address.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:2053";

/// Maximum size of DNS packets in bytes.
pub const MAX_PACKET_SIZE: usize = 512;

/// Default deadline for one upstream exchange, in milliseconds.
pub const DEFAULT_UPSTREAM_TIMEOUT_MS: u64 = 2000;

/// Command-line flags.
#[derive(Debug, Clone, Parser)]
#[command(name = "nx9-dns-forwarder", version, about = "Forwarding DNS server over UDP")]
pub struct Cli {
    /// Address to listen on.
    #[arg(long, env = "DNS_BIND", default_value = DEFAULT_BIND_ADDR)]
    pub bind: SocketAddr,

    /// Upstream resolver as host:port. Without it questions are answered locally.
    #[arg(long, env = "DNS_RESOLVER")]
    pub resolver: Option<String>,

    /// Deadline for each upstream round trip.
    #[arg(long, env = "DNS_UPSTREAM_TIMEOUT_MS", default_value_t = DEFAULT_UPSTREAM_TIMEOUT_MS)]
    pub upstream_timeout_ms: u64,

    /// Size of the receive buffer for client datagrams.
    #[arg(long, env = "DNS_MAX_PACKET_SIZE", default_value_t = MAX_PACKET_SIZE)]
    pub max_packet_size: usize,

    /// Answer A questions with this address when no resolver is set.
    #[arg(long, env = "DNS_LOCAL_ANSWER")]
    pub local_answer: Option<Ipv4Addr>,
}

/// Validated server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the DNS server to.
    pub bind_addr: SocketAddr,

    /// Upstream resolver as `host:port`, resolved at startup.
    pub resolver: Option<String>,

    /// Deadline for each upstream exchange.
    pub upstream_timeout: Duration,

    /// Maximum size of DNS packets.
    pub max_packet_size: usize,

    /// Address for locally synthesized A answers.
    pub local_answer: Option<Ipv4Addr>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 2053)),
            resolver: None,
            upstream_timeout: Duration::from_millis(DEFAULT_UPSTREAM_TIMEOUT_MS),
            max_packet_size: MAX_PACKET_SIZE,
            local_answer: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from the process arguments and environment.
    pub fn load() -> Result<Self, DnsError> {
        Self::from_cli(Cli::parse())
    }

    /// Validate parsed flags.
    pub fn from_cli(cli: Cli) -> Result<Self, DnsError> {
        if cli.upstream_timeout_ms == 0 {
            return Err(DnsError::Config("Upstream timeout must be positive".into()));
        }
        if !(HEADER_LEN..=u16::MAX as usize).contains(&cli.max_packet_size) {
            return Err(DnsError::Config(format!(
                "Invalid max packet size {}",
                cli.max_packet_size
            )));
        }

        let resolver = cli
            .resolver
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());

        Ok(Self {
            bind_addr: cli.bind,
            resolver,
            upstream_timeout: Duration::from_millis(cli.upstream_timeout_ms),
            max_packet_size: cli.max_packet_size,
            local_answer: cli.local_answer,
        })
    }
}
