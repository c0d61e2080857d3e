use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use ipnet::Ipv4Net;

use crate::error::SubnetError;

/// Prefixes shorter than this hold more than 65 534 hosts. Every discovery
/// cycle probes each of them on its own task.
pub const WIDE_SUBNET_PREFIX: u8 = 16;

/// An IPv4 CIDR range, e.g. `192.168.1.0/24`.
///
/// Interface addresses come with their host bits set (`192.168.1.10/24`).
/// Those are kept as given for display and normalised to the network when
/// enumerating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subnet(Ipv4Net);

impl Subnet {
    pub fn new(addr: Ipv4Addr, prefix_len: u8) -> Option<Self> {
        Ipv4Net::new(addr, prefix_len).ok().map(Self)
    }

    /// Builds the subnet from an interface address and its netmask.
    ///
    /// Non-contiguous masks have no CIDR form and yield `None`.
    pub fn from_netmask(addr: Ipv4Addr, netmask: Ipv4Addr) -> Option<Self> {
        let prefix_len = ipnet::ipv4_mask_to_prefix(netmask).ok()?;
        Self::new(addr, prefix_len)
    }

    pub fn network(&self) -> Ipv4Addr {
        self.0.network()
    }

    pub fn broadcast(&self) -> Ipv4Addr {
        self.0.broadcast()
    }

    pub fn prefix_len(&self) -> u8 {
        self.0.prefix_len()
    }

    /// Whether a discovery cycle over this subnet fans out to more than
    /// 65 534 probe tasks.
    pub fn is_wide(&self) -> bool {
        self.prefix_len() < WIDE_SUBNET_PREFIX
    }

    pub fn contains(&self, addr: &Ipv4Addr) -> bool {
        self.0.contains(addr)
    }

    /// All host addresses in ascending order, without the network and
    /// broadcast addresses.
    ///
    /// `/31` and `/32` have no such address and yield nothing.
    pub fn hosts(&self) -> Vec<Ipv4Addr> {
        let network = u32::from(self.network());
        let broadcast = u32::from(self.broadcast());

        match network.checked_add(1) {
            Some(first) if first < broadcast => (first..broadcast).map(Ipv4Addr::from).collect(),
            _ => Vec::new(),
        }
    }
}

impl FromStr for Subnet {
    type Err = SubnetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<Ipv4Net>()
            .map(Self)
            .map_err(|source| SubnetError::InvalidCidr {
                input: s.to_string(),
                source,
            })
    }
}

impl fmt::Display for Subnet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<Ipv4Net> for Subnet {
    fn from(net: Ipv4Net) -> Self {
        Self(net)
    }
}

/// Expands a CIDR string into its usable host addresses.
pub fn enumerate_hosts(cidr: &str) -> Result<Vec<Ipv4Addr>, SubnetError> {
    Ok(cidr.parse::<Subnet>()?.hosts())
}
