//! Error types for subnet discovery and the membership handshake.
//!
//! Only failures a caller can act on are modelled here. A probe that gets no
//! reply is not an error, and neither is a dropped inbound handshake.

use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use thiserror::Error;

/// CIDR parsing failures.
#[derive(Debug, Error)]
pub enum SubnetError {
    #[error("invalid CIDR '{input}': {source}")]
    InvalidCidr {
        input: String,
        #[source]
        source: ipnet::AddrParseError,
    },
}

/// Failures while working out who we are on the network.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The stack could not pick a local address toward the probe target.
    #[error("no route to {target}: {source}")]
    NoRoute {
        target: String,
        #[source]
        source: io::Error,
    },

    /// The outbound address is not IPv4.
    #[error("outbound address {0} is not IPv4")]
    NotIpv4(IpAddr),

    /// The stack bound the probe socket without choosing a source address.
    #[error("no outbound address was assigned")]
    Unspecified,

    /// Local interfaces could not be listed.
    #[error("failed to list network interfaces: {0}")]
    Interfaces(#[source] io::Error),
}

/// Failures of a single handshake leg.
#[derive(Debug, Error)]
pub enum HandshakeError {
    #[error("connect to {addr} failed: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("connect to {addr} timed out after {timeout:?}")]
    ConnectTimeout { addr: SocketAddr, timeout: Duration },

    #[error("read timed out after {0:?}")]
    ReadTimeout(Duration),

    #[error("empty handshake payload")]
    EmptyPayload,

    #[error("handshake payload is not UTF-8")]
    InvalidUtf8,

    #[error("handshake payload '{0}' is not an IPv4 address")]
    InvalidAddress(String),

    /// The claimed address does not match the connection's peer address.
    #[error("peer {peer} claimed to be {claimed}")]
    AddressMismatch { claimed: Ipv4Addr, peer: IpAddr },

    #[error("io: {0}")]
    Io(#[from] io::Error),
}

impl HandshakeError {
    /// Whether the target could not be reached at all.
    ///
    /// Only these failures evict a peer; a write error after a successful
    /// connect does not.
    pub fn is_unreachable(&self) -> bool {
        matches!(
            self,
            HandshakeError::Connect { .. } | HandshakeError::ConnectTimeout { .. }
        )
    }
}

/// ICMP client setup failures.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("failed to open ICMP socket: {0}")]
    Socket(#[from] io::Error),
}

/// Returned when [`MeshConfig`] is built with invalid values.
///
/// [`MeshConfig`]: crate::config::MeshConfig
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{field} must not be zero")]
    Zero { field: &'static str },

    #[error("registration and acknowledgment ports must differ (both {0})")]
    SamePorts(u16),

    #[error("{field} must be at least {minimum}, got {provided}")]
    BelowMinimum {
        field: &'static str,
        minimum: usize,
        provided: usize,
    },

    #[error("{field} must be at most {maximum}, got {provided}")]
    AboveMaximum {
        field: &'static str,
        maximum: usize,
        provided: usize,
    },
}

pub type HandshakeResult<T> = std::result::Result<T, HandshakeError>;
