//! Error types for the DNS forwarder.
//!
//! This module defines the error types used throughout the codec, the
//! resolver and the server loop.

use std::net::SocketAddr;

use thiserror::Error;

/// Represents errors that can occur in the DNS forwarder.
#[derive(Error, Debug)]
pub enum DnsError {
    /// I/O errors from the standard library.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The buffer ended before a fixed-width field could be read.
    #[error("Truncated message: {0}")]
    Truncated(String),

    /// The header is unusable, e.g. its counts cannot fit in the datagram.
    #[error("Malformed header: {0}")]
    MalformedHeader(String),

    /// Bad label length, bad pointer, overrun, or a name over its bounds.
    #[error("Malformed name: {0}")]
    MalformedName(String),

    /// A declared length exceeds the remaining buffer.
    #[error("Malformed counts: {0}")]
    MalformedCounts(String),

    /// Connect, send or receive towards the upstream resolver failed.
    #[error("Upstream {addr} unavailable: {source}")]
    UpstreamUnavailable {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// The upstream resolver did not answer within the deadline.
    #[error("Upstream {addr} timed out after {timeout_ms} ms")]
    UpstreamTimeout { addr: SocketAddr, timeout_ms: u128 },

    /// The upstream reply does not belong to the query that was sent.
    #[error("Upstream reply rejected: {0}")]
    UpstreamMismatch(String),

    /// Configuration errors.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DnsError {
    /// Whether this error comes from decoding a malformed datagram.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            DnsError::Truncated(_)
                | DnsError::MalformedHeader(_)
                | DnsError::MalformedName(_)
                | DnsError::MalformedCounts(_)
        )
    }
}
