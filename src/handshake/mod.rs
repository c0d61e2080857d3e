//! Handshake Module
//!
//! Turns a host that answered a probe into a confirmed peer with two one-way
//! TCP messages on two well-known ports.
//!
//! ## Protocol
//! 1. **Register**: the initiator connects to the candidate's registration
//!    port, writes its own address and closes. A failed connect evicts the
//!    candidate from the peer set.
//! 2. **Acknowledge**: the candidate records the initiator, then sends its
//!    own address to the initiator's acknowledgment port. The initiator
//!    records the candidate on receipt.
//!
//! Payloads carry only the sender's dotted-quad address; the port implies the
//! role. Payloads are trusted unless `AddressPolicy::RequireTransportMatch`
//! is configured.

pub mod protocol;
pub mod types;
pub mod wire;

pub use protocol::HandshakeProtocol;
pub use types::{AddressPolicy, HandshakeRole, PeerSink};

#[cfg(test)]
mod tests;
