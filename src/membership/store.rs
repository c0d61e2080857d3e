use std::collections::HashSet;
use std::net::Ipv4Addr;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::handshake::types::PeerSink;

/// The set of confirmed peers.
///
/// One lock guards the whole set, so every add, remove and snapshot is
/// atomic with respect to the others. The node's own address is never a
/// member.
pub struct MembershipStore {
    local: Ipv4Addr,
    peers: RwLock<HashSet<Ipv4Addr>>,
}

impl MembershipStore {
    pub fn new(local: Ipv4Addr) -> Self {
        Self {
            local,
            peers: RwLock::new(HashSet::new()),
        }
    }

    pub fn local_address(&self) -> Ipv4Addr {
        self.local
    }

    /// Inserts `addr`. Returns whether the set changed.
    pub async fn add(&self, addr: Ipv4Addr) -> bool {
        if addr == self.local {
            tracing::debug!("Refusing to register own address {}", addr);
            return false;
        }

        let inserted = self.peers.write().await.insert(addr);
        if inserted {
            tracing::info!("Registered new peer: {}", addr);
        }
        inserted
    }

    /// Removes `addr`. Returns whether it was a member.
    pub async fn remove(&self, addr: Ipv4Addr) -> bool {
        let removed = self.peers.write().await.remove(&addr);
        if removed {
            tracing::info!("Unregistered peer: {}", addr);
        }
        removed
    }

    pub async fn contains(&self, addr: Ipv4Addr) -> bool {
        self.peers.read().await.contains(&addr)
    }

    /// A sorted copy of the current members.
    pub async fn snapshot(&self) -> Vec<Ipv4Addr> {
        let mut peers: Vec<Ipv4Addr> = self.peers.read().await.iter().copied().collect();
        peers.sort();
        peers
    }

    pub async fn count(&self) -> usize {
        self.peers.read().await.len()
    }
}

#[async_trait]
impl PeerSink for MembershipStore {
    async fn peer_confirmed(&self, addr: Ipv4Addr) {
        self.add(addr).await;
    }

    async fn peer_unreachable(&self, addr: Ipv4Addr) {
        self.remove(addr).await;
    }
}
