//! ICMP echo probe.
//!
//! Uses an unprivileged datagram ICMP socket where the kernel allows it and
//! falls back to a raw socket otherwise, so the node needs either
//! `net.ipv4.ping_group_range` to include its group or `CAP_NET_RAW`.

use std::net::{IpAddr, Ipv4Addr};
use std::time::Instant;

use async_trait::async_trait;
use surge_ping::{Client, Config, PingIdentifier, PingSequence};

use super::types::{LivenessProbe, ProbePolicy};
use crate::error::ProbeError;

pub struct IcmpProbe {
    client: Option<Client>,
}

impl IcmpProbe {
    pub fn try_new() -> Result<Self, ProbeError> {
        let client = Client::new(&Config::default())?;
        Ok(Self {
            client: Some(client),
        })
    }

    /// Opens the ICMP socket, or returns a probe that reports every host as
    /// unreachable when the socket cannot be opened.
    pub fn new() -> Self {
        Self::try_new().unwrap_or_else(|e| {
            tracing::error!("{}; every host will look unreachable", e);
            Self { client: None }
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.client.is_some()
    }
}

impl Default for IcmpProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LivenessProbe for IcmpProbe {
    async fn probe(&self, target: Ipv4Addr, policy: &ProbePolicy) -> bool {
        let Some(client) = &self.client else {
            return false;
        };

        let payload = vec![0u8; policy.payload_size];
        let mut pinger = client
            .pinger(IpAddr::V4(target), PingIdentifier(rand::random()))
            .await;
        let started = Instant::now();

        for seq in 0..policy.count {
            let remaining = policy.timeout.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                break;
            }

            // Early echoes wait one interval, the last one waits out the budget
            let window = if seq + 1 < policy.count {
                policy.interval.min(remaining)
            } else {
                remaining
            };
            pinger.timeout(window);

            match pinger.ping(PingSequence(seq), &payload).await {
                Ok((_, rtt)) => {
                    tracing::debug!("Echo reply from {} in {:?}", target, rtt);
                    return true;
                }
                Err(e) => {
                    tracing::trace!("No echo reply from {} (seq={}): {}", target, seq, e);
                }
            }
        }

        false
    }
}
