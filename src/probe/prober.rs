//! Concurrent fan-out of liveness probes.
//!
//! One task per candidate. Every task sends exactly one signal into a channel
//! sized to the candidate count, so collection never waits on a slow sibling
//! longer than the probe budget.

use std::collections::BTreeSet;
use std::net::Ipv4Addr;
use std::sync::Arc;

use tokio::sync::mpsc;

use super::types::{LivenessProbe, ProbePolicy};

pub struct LivenessProber {
    probe: Arc<dyn LivenessProbe>,
    policy: ProbePolicy,
}

impl LivenessProber {
    pub fn new(probe: Arc<dyn LivenessProbe>, policy: ProbePolicy) -> Self {
        Self { probe, policy }
    }

    pub fn policy(&self) -> &ProbePolicy {
        &self.policy
    }

    /// Probes all candidates at once and returns the ones that answered.
    ///
    /// Returns within `policy.timeout` (plus scheduling slack) whatever the
    /// candidates do. A probe task that panics counts as unreachable.
    pub async fn reachable(&self, candidates: &[Ipv4Addr]) -> BTreeSet<Ipv4Addr> {
        let mut reachable = BTreeSet::new();
        if candidates.is_empty() {
            return reachable;
        }

        let (tx, mut rx) = mpsc::channel::<Option<Ipv4Addr>>(candidates.len());

        for &candidate in candidates {
            let tx = tx.clone();
            let probe = self.probe.clone();
            let policy = self.policy.clone();

            tokio::spawn(async move {
                let alive = matches!(
                    tokio::time::timeout(policy.timeout, probe.probe(candidate, &policy)).await,
                    Ok(true)
                );

                // Receiver outlives every sender unless the caller was dropped
                let _ = tx.send(alive.then_some(candidate)).await;
            });
        }

        // The loop below ends once every task has reported or died
        drop(tx);

        let mut signals = 0usize;
        while let Some(result) = rx.recv().await {
            signals += 1;
            if let Some(addr) = result {
                reachable.insert(addr);
            }
        }

        if signals < candidates.len() {
            tracing::warn!(
                "{} of {} probe tasks ended without reporting",
                candidates.len() - signals,
                candidates.len()
            );
        }

        tracing::debug!(
            "Probed {} hosts, {} reachable",
            candidates.len(),
            reachable.len()
        );

        reachable
    }
}
