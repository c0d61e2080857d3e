//! Liveness Probing Module
//!
//! Decides which subnet hosts are alive right now.
//!
//! - **`types`**: `ProbePolicy` and the `LivenessProbe` single-host seam.
//! - **`icmp`**: the production probe, ICMP echo via `surge-ping`.
//! - **`prober`**: `LivenessProber`, which probes every candidate
//!   concurrently under one time budget and collects the responders.

pub mod icmp;
pub mod prober;
pub mod types;

pub use icmp::IcmpProbe;
pub use prober::LivenessProber;
pub use types::{LivenessProbe, ProbePolicy};
