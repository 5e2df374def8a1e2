//! Request handlers for the DNS forwarder.
//!
//! This module provides the UDP server loop and the per-datagram pipeline:
//! decode, resolve, build, encode, send.

use std::net::SocketAddr;
use std::sync::Arc;
use log::{debug, error, info, trace, warn};
use tokio::{net::UdpSocket, task};

use crate::config::{ServerConfig, MAX_PACKET_SIZE};
use crate::errors::DnsError;
use crate::message::Message;
use crate::resolver::{AnswerSource, ForwardingResolver, LocalResponder, UdpUpstream, Upstream};
use crate::response::{build_response, is_standard_query};
use crate::utils::hex_preview;

/// A bound UDP DNS server.
pub struct DnsServer {
    socket: Arc<UdpSocket>,
    source: Arc<AnswerSource>,
    max_packet_size: usize,
}

impl DnsServer {
    /// Bind the server described by `config`.
    ///
    /// The upstream resolver, if any, is looked up here once.
    pub async fn bind(config: &ServerConfig) -> Result<Self, DnsError> {
        let source = match &config.resolver {
            Some(target) => {
                let upstream = UdpUpstream::lookup(target, config.upstream_timeout).await?;
                info!(
                    "Forwarding questions to {} (timeout {:?})",
                    upstream.addr(),
                    config.upstream_timeout
                );
                AnswerSource::Forward(ForwardingResolver::new(Arc::new(upstream)))
            }
            None => {
                info!("No resolver configured, answering locally");
                AnswerSource::Local(LocalResponder::new(config.local_answer))
            }
        };
        Self::with_source(config, source).await
    }

    /// Bind with an explicit answer source.
    pub async fn with_source(config: &ServerConfig, source: AnswerSource) -> Result<Self, DnsError> {
        let socket = UdpSocket::bind(config.bind_addr).await?;
        Ok(Self {
            socket: Arc::new(socket),
            source: Arc::new(source),
            max_packet_size: config.max_packet_size,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, DnsError> {
        Ok(self.socket.local_addr()?)
    }

    /// Receive datagrams forever, handling each one in its own task.
    pub async fn run(self) -> Result<(), DnsError> {
        info!("UDP DNS server listening on {}", self.local_addr()?);
        let mut buf = vec![0u8; self.max_packet_size];

        loop {
            match self.socket.recv_from(&mut buf).await {
                Ok((amt, src)) => {
                    let query = buf[..amt].to_vec();
                    let socket = self.socket.clone();
                    let source = self.source.clone();
                    task::spawn(async move {
                        match handle_udp_query(query, src, socket, source).await {
                            Ok(()) => {}
                            Err(e) if e.is_malformed() => {
                                warn!("Dropping malformed datagram from {}: {}", src, e)
                            }
                            Err(e) => warn!("UDP query error: {}", e),
                        }
                    });
                }
                Err(e) => error!("UDP receive error: {}", e),
            }
        }
    }
}

/// Bind and run the UDP DNS server.
///
/// # Arguments
/// * `config` - The server configuration.
///
/// # Returns
/// A `Result` indicating failure; on success it never returns.
pub async fn run_udp_server(config: ServerConfig) -> Result<(), DnsError> {
    DnsServer::bind(&config).await?.run().await
}

/// Handle a UDP DNS query.
///
/// # Arguments
/// * `query` - The DNS query, owned by this task.
/// * `src` - The source address of the query.
/// * `socket` - The UDP socket to send the response on.
/// * `source` - Where answers come from.
///
/// # Returns
/// A `Result` indicating success or failure.
pub async fn handle_udp_query(
    query: Vec<u8>,
    src: SocketAddr,
    socket: Arc<UdpSocket>,
    source: Arc<AnswerSource>,
) -> Result<(), DnsError> {
    debug!("Received {} bytes from {}", query.len(), src);
    trace!("Query from {}: {}", src, hex_preview(&query));

    let response = process_query(&query, &source).await?;
    if response.len() > MAX_PACKET_SIZE {
        warn!(
            "Response to {} is {} bytes, larger than {}",
            src,
            response.len(),
            MAX_PACKET_SIZE
        );
    }

    trace!("Response to {}: {}", src, hex_preview(&response));
    socket.send_to(&response, src).await?;
    Ok(())
}

/// Turn one query datagram into the response datagram.
///
/// Only standard queries are resolved; other opcodes are answered with
/// Not Implemented and no answers.
pub async fn process_query(query: &[u8], source: &AnswerSource) -> Result<Vec<u8>, DnsError> {
    let request = Message::decode(query)?;

    let answers = if is_standard_query(&request.header) {
        source.answer(&request.header, &request.questions).await
    } else {
        debug!(
            "Opcode {} of query {:#06x} is not implemented",
            request.header.opcode, request.header.id
        );
        Vec::new()
    };

    let response = build_response(&request.header, request.questions, answers);
    Ok(response.encode())
}
