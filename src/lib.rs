//! Subnet Mesh Library
//!
//! Decentralized peer discovery for nodes sharing an IPv4 subnet. Every node
//! runs the same code: it finds its own address and subnet, pings every
//! other host in the subnet, and exchanges a two-message TCP handshake with
//! each responder. The result is a per-node set of live peers that a
//! messaging layer can read.
//!
//! ## Architecture Modules
//!
//! - **`subnet`**: identity resolution and host enumeration.
//! - **`probe`**: concurrent ICMP liveness probing under a time budget.
//! - **`handshake`**: the register/acknowledge TCP exchange and its listeners.
//! - **`membership`**: the peer set and `MeshNode`, which drives discovery.
//! - **`config`**: ports, timeouts and limits (`MeshConfig`).
//! - **`error`**: typed errors for each subsystem.

pub mod config;
pub mod error;
pub mod handshake;
pub mod membership;
pub mod probe;
pub mod subnet;

#[cfg(test)]
mod testing;

pub use config::MeshConfig;
pub use membership::{MembershipStore, MeshNode};
pub use probe::{IcmpProbe, LivenessProbe};
