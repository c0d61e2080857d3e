//! Own-address and subnet resolution.
//!
//! The outbound address is taken from a UDP socket "connected" to a public
//! address. Connecting a datagram socket sends nothing; it only makes the
//! kernel choose a route and a source address, which we then read back.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use tokio::net::UdpSocket;

use super::types::Subnet;
use crate::error::IdentityError;

/// This node's address and the subnet it sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalIdentity {
    pub address: Ipv4Addr,
    /// `None` when no interface carries `address`. Discovery then has
    /// nothing to enumerate.
    pub subnet: Option<Subnet>,
}

/// Resolves the address and subnet together.
///
/// A missing route is an error. A missing or unreadable interface is not:
/// the identity is returned without a subnet.
pub async fn resolve_identity(route_probe_target: &str) -> Result<LocalIdentity, IdentityError> {
    let address = resolve_outbound_address(route_probe_target).await?;
    tracing::info!("My host ip is: {}", address);

    let subnet = match interface_subnet(address) {
        Ok(Some(subnet)) => {
            tracing::info!("My subnet is: {}", subnet);
            if subnet.is_wide() {
                tracing::warn!(
                    "Subnet {} has {} hosts; each discovery cycle probes all of them at once",
                    subnet,
                    subnet.hosts().len()
                );
            }
            Some(subnet)
        }
        Ok(None) => {
            tracing::warn!("No interface carries {}, no peers can be discovered", address);
            None
        }
        Err(e) => {
            tracing::warn!("{}, no peers can be discovered", e);
            None
        }
    };

    Ok(LocalIdentity { address, subnet })
}

/// The local IPv4 address the stack would use to reach `target`.
pub async fn resolve_outbound_address(target: &str) -> Result<Ipv4Addr, IdentityError> {
    let no_route = |source| IdentityError::NoRoute {
        target: target.to_string(),
        source,
    };

    let socket = UdpSocket::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)))
        .await
        .map_err(no_route)?;
    socket.connect(target).await.map_err(no_route)?;

    match socket.local_addr().map_err(no_route)?.ip() {
        IpAddr::V4(addr) if addr.is_unspecified() => Err(IdentityError::Unspecified),
        IpAddr::V4(addr) => Ok(addr),
        other => Err(IdentityError::NotIpv4(other)),
    }
}

/// Finds the subnet of the interface that carries `address`.
pub fn interface_subnet(address: Ipv4Addr) -> Result<Option<Subnet>, IdentityError> {
    let interfaces = if_addrs::get_if_addrs().map_err(IdentityError::Interfaces)?;

    let assigned = interfaces.iter().filter_map(|iface| match &iface.addr {
        if_addrs::IfAddr::V4(v4) => {
            tracing::debug!("Interface {} has {}/{}", iface.name, v4.ip, v4.prefixlen);
            Some((v4.ip, v4.prefixlen))
        }
        _ => None,
    });

    Ok(find_subnet(assigned, address))
}

/// Picks the subnet of the first `(ip, prefix_len)` pair whose ip is
/// `address`.
pub fn find_subnet<I>(assigned: I, address: Ipv4Addr) -> Option<Subnet>
where
    I: IntoIterator<Item = (Ipv4Addr, u8)>,
{
    assigned
        .into_iter()
        .find(|(ip, _)| *ip == address)
        .and_then(|(ip, prefix_len)| Subnet::new(ip, prefix_len))
}
