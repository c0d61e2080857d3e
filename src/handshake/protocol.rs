//! Register/acknowledge handshake.
//!
//! Registration: connect to the peer's registration port, send our address,
//! close. The peer records us and answers on our acknowledgment port the same
//! way; when that arrives we record the peer. Whoever learns of the other
//! first adds it right away, so both sides converge regardless of who
//! started.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use super::types::{AddressPolicy, HandshakeRole, PeerSink};
use super::wire::{read_address, send_address};
use crate::config::MeshConfig;
use crate::error::{HandshakeError, HandshakeResult};

const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

pub struct HandshakeProtocol {
    local: Ipv4Addr,
    config: MeshConfig,
    sink: Arc<dyn PeerSink>,
}

impl HandshakeProtocol {
    pub fn new(local: Ipv4Addr, config: MeshConfig, sink: Arc<dyn PeerSink>) -> Arc<Self> {
        Arc::new(Self {
            local,
            config,
            sink,
        })
    }

    pub fn local_address(&self) -> Ipv4Addr {
        self.local
    }

    pub fn port(&self, role: HandshakeRole) -> u16 {
        match role {
            HandshakeRole::Register => self.config.registration_port,
            HandshakeRole::Acknowledge => self.config.acknowledgment_port,
        }
    }

    /// Sends our registration to `target`.
    ///
    /// If `target` cannot be reached it is reported unreachable, which evicts
    /// it from the peer set.
    pub async fn register_with(&self, target: Ipv4Addr) -> HandshakeResult<()> {
        self.send(HandshakeRole::Register, target).await
    }

    /// Answers a registration from `target`. Same failure handling.
    pub async fn acknowledge(&self, target: Ipv4Addr) -> HandshakeResult<()> {
        self.send(HandshakeRole::Acknowledge, target).await
    }

    async fn send(&self, role: HandshakeRole, target: Ipv4Addr) -> HandshakeResult<()> {
        let addr = SocketAddr::from((target, self.port(role)));
        tracing::debug!("Sending {} to {}", role, addr);

        match send_address(addr, self.local, self.config.connect_timeout).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_unreachable() => {
                tracing::warn!("Peer {} unreachable for {}: {}", target, role, e);
                self.sink.peer_unreachable(target).await;
                Err(e)
            }
            Err(e) => {
                tracing::warn!("Failed to send {} to {}: {}", role, target, e);
                Err(e)
            }
        }
    }

    /// Binds the listener for `role` on the local address and serves it in
    /// the background.
    ///
    /// A bind failure ends only this listener; it is logged and `None` is
    /// returned.
    pub async fn start_listener(self: &Arc<Self>, role: HandshakeRole) -> Option<JoinHandle<()>> {
        let bind_addr = SocketAddr::from((self.local, self.port(role)));

        let listener = match TcpListener::bind(bind_addr).await {
            Ok(listener) => listener,
            Err(e) => {
                tracing::error!("Cannot listen for {} on {}: {}", role, bind_addr, e);
                return None;
            }
        };

        tracing::info!("Listening for {} on {}", role, bind_addr);

        let protocol = self.clone();
        Some(tokio::spawn(async move {
            protocol.serve(role, listener).await;
        }))
    }

    /// Accept loop. Every connection is handled on its own task.
    pub async fn serve(self: Arc<Self>, role: HandshakeRole, listener: TcpListener) {
        let limit = self
            .config
            .max_inbound_connections
            .map(|n| Arc::new(Semaphore::new(n)));

        loop {
            let permit = match &limit {
                Some(semaphore) => match semaphore.clone().acquire_owned().await {
                    Ok(permit) => Some(permit),
                    Err(_) => break,
                },
                None => None,
            };

            match listener.accept().await {
                Ok((stream, remote)) => {
                    let protocol = self.clone();
                    tokio::spawn(async move {
                        protocol.handle_connection(role, stream, remote).await;
                        drop(permit);
                    });
                }
                Err(e) => {
                    tracing::error!("Failed to accept {} connection: {}", role, e);
                    tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                }
            }
        }
    }

    /// Handles one inbound message. Anything malformed is dropped without
    /// touching the peer set.
    pub async fn handle_connection(
        &self,
        role: HandshakeRole,
        mut stream: TcpStream,
        remote: SocketAddr,
    ) {
        let claimed = match read_address(
            &mut stream,
            self.config.max_payload,
            self.config.read_timeout,
        )
        .await
        {
            Ok(addr) => addr,
            Err(e) => {
                tracing::debug!("Dropped {} from {}: {}", role, remote, e);
                return;
            }
        };
        drop(stream);

        if let Err(e) = self.check_claim(claimed, remote.ip()) {
            tracing::warn!("Rejected {} from {}: {}", role, remote, e);
            return;
        }

        if claimed == self.local {
            tracing::debug!("Ignoring {} carrying our own address", role);
            return;
        }

        tracing::debug!("Received {} from {}", role, claimed);

        match role {
            HandshakeRole::Register => {
                self.sink.peer_confirmed(claimed).await;
                // Sent even for known peers; the set ignores duplicates
                let _ = self.acknowledge(claimed).await;
            }
            HandshakeRole::Acknowledge => {
                self.sink.peer_confirmed(claimed).await;
            }
        }
    }

    fn check_claim(&self, claimed: Ipv4Addr, peer: IpAddr) -> HandshakeResult<()> {
        let peer = match peer {
            IpAddr::V6(v6) => v6.to_ipv4_mapped().map(IpAddr::V4).unwrap_or(peer),
            v4 => v4,
        };

        if peer == IpAddr::V4(claimed) {
            return Ok(());
        }

        let mismatch = HandshakeError::AddressMismatch { claimed, peer };
        match self.config.address_policy {
            AddressPolicy::TrustPayload => {
                tracing::warn!("Trusting unverified claim: {}", mismatch);
                Ok(())
            }
            AddressPolicy::RequireTransportMatch => Err(mismatch),
        }
    }
}
