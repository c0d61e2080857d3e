use std::net::Ipv4Addr;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// How hard to try before calling a host unreachable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbePolicy {
    /// Echo requests sent per host at most.
    pub count: u16,
    /// Echo payload in bytes.
    pub payload_size: usize,
    /// Spacing between echo requests.
    pub interval: Duration,
    /// Budget for the whole probe of one host.
    pub timeout: Duration,
}

impl Default for ProbePolicy {
    fn default() -> Self {
        Self {
            count: 10,
            payload_size: 56,
            interval: Duration::from_millis(100),
            timeout: Duration::from_secs(1),
        }
    }
}

/// A single-host reachability check.
///
/// Implementations answer `true` once the host replied at least once and
/// `false` otherwise. Silence is an answer, not an error. The caller enforces
/// `policy.timeout`, so implementations may simply stop being polled.
#[async_trait]
pub trait LivenessProbe: Send + Sync {
    async fn probe(&self, target: Ipv4Addr, policy: &ProbePolicy) -> bool;
}
