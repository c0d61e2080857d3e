use std::net::Ipv4Addr;

/// Outcome of one discovery cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryReport {
    /// Addresses enumerated from the subnet.
    pub hosts: usize,
    /// Hosts that answered a probe, own address excluded. Each was sent a
    /// registration.
    pub candidates: Vec<Ipv4Addr>,
}

impl DiscoveryReport {
    pub fn registrations(&self) -> usize {
        self.candidates.len()
    }
}
