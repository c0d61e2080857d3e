//! Shared test helpers: deterministic probes, a recording peer sink and a
//! polling helper for asynchronous outcomes.

use std::collections::HashSet;
use std::future::Future;
use std::net::Ipv4Addr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::config::MeshConfig;
use crate::handshake::types::PeerSink;
use crate::probe::types::{LivenessProbe, ProbePolicy};

/// Reports a fixed set of hosts as alive.
pub struct StaticProbe {
    alive: HashSet<Ipv4Addr>,
}

impl StaticProbe {
    pub fn new(alive: impl IntoIterator<Item = Ipv4Addr>) -> Self {
        Self {
            alive: alive.into_iter().collect(),
        }
    }
}

#[async_trait]
impl LivenessProbe for StaticProbe {
    async fn probe(&self, target: Ipv4Addr, _policy: &ProbePolicy) -> bool {
        self.alive.contains(&target)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkEvent {
    Confirmed(Ipv4Addr),
    Unreachable(Ipv4Addr),
}

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SinkEvent>>,
}

impl RecordingSink {
    pub async fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().await.clone()
    }

    pub async fn contains(&self, event: SinkEvent) -> bool {
        self.events.lock().await.contains(&event)
    }
}

#[async_trait]
impl PeerSink for RecordingSink {
    async fn peer_confirmed(&self, addr: Ipv4Addr) {
        self.events.lock().await.push(SinkEvent::Confirmed(addr));
    }

    async fn peer_unreachable(&self, addr: Ipv4Addr) {
        self.events.lock().await.push(SinkEvent::Unreachable(addr));
    }
}

/// Short timeouts and a fixed port pair. Tests isolate themselves by binding
/// distinct loopback addresses.
pub fn test_config() -> MeshConfig {
    MeshConfig::builder()
        .ports(42333, 42334)
        .connect_timeout(Duration::from_millis(500))
        .read_timeout(Duration::from_millis(500))
        .discovery_interval(Duration::from_millis(100))
        .probe(ProbePolicy {
            timeout: Duration::from_millis(200),
            ..ProbePolicy::default()
        })
        .build()
        .expect("test config is valid")
}

/// Polls `check` until it holds or three seconds pass.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    check().await
}
