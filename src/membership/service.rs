use anyhow::Result;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

use super::store::MembershipStore;
use super::types::DiscoveryReport;
use crate::config::MeshConfig;
use crate::handshake::{HandshakeProtocol, HandshakeRole, PeerSink};
use crate::probe::{LivenessProbe, LivenessProber};
use crate::subnet::{LocalIdentity, Subnet, resolve_identity};

/// A node in the subnet mesh.
///
/// Owns the peer set. The handshake reaches it only through the `PeerSink`
/// callbacks handed over here; everyone else reads snapshots.
pub struct MeshNode {
    pub identity: LocalIdentity,
    config: MeshConfig,
    peers: Arc<MembershipStore>,
    prober: LivenessProber,
    handshake: Arc<HandshakeProtocol>,
}

impl MeshNode {
    /// Resolves this host's identity and builds the node.
    ///
    /// Resolution failures are not fatal: the node then runs with an
    /// unspecified address and no subnet, which means it discovers nobody.
    pub async fn new(config: MeshConfig, probe: Arc<dyn LivenessProbe>) -> Result<Arc<Self>> {
        config.validate()?;

        let identity = match resolve_identity(&config.route_probe_target).await {
            Ok(identity) => identity,
            Err(e) => {
                tracing::warn!("{}; running without discovery", e);
                LocalIdentity {
                    address: Ipv4Addr::UNSPECIFIED,
                    subnet: None,
                }
            }
        };

        Ok(Self::with_identity(identity, probe, config))
    }

    /// Builds the node for an identity resolved elsewhere.
    pub fn with_identity(
        identity: LocalIdentity,
        probe: Arc<dyn LivenessProbe>,
        config: MeshConfig,
    ) -> Arc<Self> {
        let peers = Arc::new(MembershipStore::new(identity.address));
        let sink: Arc<dyn PeerSink> = peers.clone();
        let handshake = HandshakeProtocol::new(identity.address, config.clone(), sink);
        let prober = LivenessProber::new(probe, config.probe.clone());

        Arc::new(Self {
            identity,
            config,
            peers,
            prober,
            handshake,
        })
    }

    pub fn local_address(&self) -> Ipv4Addr {
        self.identity.address
    }

    pub fn subnet(&self) -> Option<Subnet> {
        self.identity.subnet
    }

    pub fn config(&self) -> &MeshConfig {
        &self.config
    }

    /// Starts both listeners, then runs the first discovery cycle.
    ///
    /// Listeners come first so acknowledgments to our first registrations
    /// have somewhere to land.
    pub async fn initialize(self: &Arc<Self>) -> DiscoveryReport {
        let listening = self.start_listeners().await;
        if listening < 2 {
            tracing::warn!("Only {} of 2 handshake listeners running", listening);
        }

        self.discover_live_peers().await
    }

    /// Starts the registration and acknowledgment listeners. Returns how many
    /// came up.
    pub async fn start_listeners(self: &Arc<Self>) -> usize {
        let mut started = 0;
        for role in [HandshakeRole::Register, HandshakeRole::Acknowledge] {
            if self.handshake.start_listener(role).await.is_some() {
                started += 1;
            }
        }
        started
    }

    /// Probes every subnet host and sends a registration to each responder
    /// other than ourselves.
    ///
    /// Registrations are fire-and-forget; confirmations arrive later on the
    /// acknowledgment listener.
    pub async fn discover_live_peers(&self) -> DiscoveryReport {
        let hosts = match self.identity.subnet {
            Some(subnet) => subnet.hosts(),
            None => {
                tracing::debug!("No subnet, skipping discovery");
                return DiscoveryReport::default();
            }
        };

        let candidates: Vec<Ipv4Addr> = self
            .prober
            .reachable(&hosts)
            .await
            .into_iter()
            .filter(|addr| *addr != self.identity.address)
            .collect();

        tracing::info!("Number of live peers: {}", candidates.len());

        for &candidate in &candidates {
            let handshake = self.handshake.clone();
            tokio::spawn(async move {
                let _ = handshake.register_with(candidate).await;
            });
        }

        DiscoveryReport {
            hosts: hosts.len(),
            candidates,
        }
    }

    /// Re-runs discovery every `interval` and reports the peer set after each
    /// cycle. Never returns.
    pub async fn run_periodic_discovery(self: Arc<Self>, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // The first tick fires at once; `initialize` already ran that cycle
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let report = self.discover_live_peers().await;
            tracing::debug!(
                "Discovery cycle: {} hosts, {} registrations",
                report.hosts,
                report.registrations()
            );
            self.report_peers().await;
        }
    }

    /// Current peers, for the messaging layer.
    pub async fn peers(&self) -> Vec<Ipv4Addr> {
        self.peers.snapshot().await
    }

    pub async fn peer_count(&self) -> usize {
        self.peers.count().await
    }

    pub async fn report_peers(&self) {
        let peers = self.peers.snapshot().await;
        let listed: Vec<String> = peers.iter().map(|p| p.to_string()).collect();
        tracing::info!(
            "Current registered peers ({}): {}",
            peers.len(),
            listed.join(" ")
        );
    }

    #[cfg(test)]
    pub(crate) fn handshake(&self) -> &Arc<HandshakeProtocol> {
        &self.handshake
    }

    #[cfg(test)]
    pub(crate) fn store(&self) -> &Arc<MembershipStore> {
        &self.peers
    }
}
