//! Membership & Discovery Module
//!
//! Keeps this node's view of which subnet hosts are live peers.
//!
//! ## Core Mechanisms
//! - **Discovery cycle**: enumerate the subnet, probe every host at once,
//!   and send a registration to each responder.
//! - **Handshake**: registrations are acknowledged on a second port, so each
//!   side records the other whichever one started.
//! - **Eviction**: a peer whose registration port refuses a connection is
//!   dropped. Peers that vanish silently stay listed until that happens.
//! - **Peer set**: `MembershipStore`, a single-lock set owned by `MeshNode`.
//!
//! ## Limits
//! Nothing applies backpressure by default. Inbound handshakes are unbounded
//! unless `max_inbound_connections` is set, and every cycle spawns one probe
//! task per subnet host, so a `/8` interface means about 16.7M tasks per
//! cycle. Identity resolution warns when the subnet is wider than a `/16`.

pub mod service;
pub mod store;
pub mod types;

pub use service::MeshNode;
pub use store::MembershipStore;
pub use types::DiscoveryReport;
