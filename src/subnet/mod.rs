//! Subnet Module
//!
//! Works out where this node lives on the network and which addresses could
//! host a peer.
//!
//! - **`types`**: the `Subnet` CIDR type and host enumeration (network and
//!   broadcast addresses excluded, ascending order).
//! - **`identity`**: resolves the node's outbound IPv4 address and the subnet
//!   of the interface carrying it.

pub mod identity;
pub mod types;

pub use identity::{LocalIdentity, resolve_identity};
pub use types::{Subnet, enumerate_hosts};
