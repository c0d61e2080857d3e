use std::fmt;
use std::net::Ipv4Addr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Which leg of the handshake a listener serves.
///
/// The role never travels on the wire. It is implied by the port the
/// connection arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandshakeRole {
    /// First leg: a peer announces itself and expects an acknowledgment.
    Register,
    /// Second leg: a peer confirms our registration.
    Acknowledge,
}

impl fmt::Display for HandshakeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandshakeRole::Register => f.write_str("registration"),
            HandshakeRole::Acknowledge => f.write_str("acknowledgment"),
        }
    }
}

/// What to do when a payload names an address other than the TCP peer's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AddressPolicy {
    /// Accept the claimed address. Lets a trusted host register on behalf of
    /// another, and lets anyone on the network spoof one.
    #[default]
    TrustPayload,
    /// Drop handshakes whose claim differs from the connection's source.
    RequireTransportMatch,
}

/// Where handshake outcomes go.
///
/// The handshake never touches the peer set directly. The node that owns the
/// set hands in a sink and decides what confirmation and eviction mean.
#[async_trait]
pub trait PeerSink: Send + Sync {
    /// A peer registered with us or acknowledged our registration.
    async fn peer_confirmed(&self, addr: Ipv4Addr);

    /// A connection attempt to the peer failed.
    async fn peer_unreachable(&self, addr: Ipv4Addr);
}
