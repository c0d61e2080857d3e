//! Node configuration.
//!
//! Every value here is a fixed policy constant of the protocol. Nodes on the
//! same subnet must agree on the ports, so the defaults are what a deployment
//! runs with; the builder exists for tests and for isolated deployments that
//! need a different port pair.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::handshake::types::AddressPolicy;
use crate::probe::types::ProbePolicy;

pub const REGISTRATION_PORT: u16 = 22333;
pub const ACKNOWLEDGMENT_PORT: u16 = 22334;

/// Used only to let the stack pick an outbound interface. Nothing is sent.
pub const ROUTE_PROBE_TARGET: &str = "8.8.8.8:80";

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
pub const READ_TIMEOUT: Duration = Duration::from_secs(3);
pub const DISCOVERY_INTERVAL: Duration = Duration::from_secs(1);

/// Upper bound of a handshake payload in bytes.
pub const MAX_PAYLOAD: usize = 1024;

/// Longest dotted-quad address, `255.255.255.255`.
const MIN_PAYLOAD: usize = 15;

/// Largest ICMP echo payload that fits an IPv4 datagram.
const MAX_ECHO_PAYLOAD: usize = 65_500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshConfig {
    pub registration_port: u16,
    pub acknowledgment_port: u16,
    pub probe: ProbePolicy,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub max_payload: usize,
    pub route_probe_target: String,
    pub discovery_interval: Duration,
    pub address_policy: AddressPolicy,
    /// Per-listener cap on inbound connections handled at once.
    /// `None` accepts without limit.
    pub max_inbound_connections: Option<usize>,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            registration_port: REGISTRATION_PORT,
            acknowledgment_port: ACKNOWLEDGMENT_PORT,
            probe: ProbePolicy::default(),
            connect_timeout: CONNECT_TIMEOUT,
            read_timeout: READ_TIMEOUT,
            max_payload: MAX_PAYLOAD,
            route_probe_target: ROUTE_PROBE_TARGET.to_string(),
            discovery_interval: DISCOVERY_INTERVAL,
            address_policy: AddressPolicy::default(),
            max_inbound_connections: None,
        }
    }
}

impl MeshConfig {
    pub fn builder() -> MeshConfigBuilder {
        MeshConfigBuilder::new()
    }

    /// Checks the invariants the builder enforces.
    ///
    /// Useful for configs that were deserialized instead of built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.registration_port == 0 {
            return Err(ConfigError::Zero {
                field: "registration_port",
            });
        }
        if self.acknowledgment_port == 0 {
            return Err(ConfigError::Zero {
                field: "acknowledgment_port",
            });
        }
        if self.registration_port == self.acknowledgment_port {
            return Err(ConfigError::SamePorts(self.registration_port));
        }

        if self.probe.count == 0 {
            return Err(ConfigError::Zero {
                field: "probe.count",
            });
        }
        if self.probe.payload_size > MAX_ECHO_PAYLOAD {
            return Err(ConfigError::AboveMaximum {
                field: "probe.payload_size",
                maximum: MAX_ECHO_PAYLOAD,
                provided: self.probe.payload_size,
            });
        }

        for (field, value) in [
            ("probe.timeout", self.probe.timeout),
            ("connect_timeout", self.connect_timeout),
            ("read_timeout", self.read_timeout),
            ("discovery_interval", self.discovery_interval),
        ] {
            if value.is_zero() {
                return Err(ConfigError::Zero { field });
            }
        }

        if self.max_payload < MIN_PAYLOAD {
            return Err(ConfigError::BelowMinimum {
                field: "max_payload",
                minimum: MIN_PAYLOAD,
                provided: self.max_payload,
            });
        }

        if self.max_inbound_connections == Some(0) {
            return Err(ConfigError::Zero {
                field: "max_inbound_connections",
            });
        }

        Ok(())
    }
}

/// Builder for [`MeshConfig`] with validation.
#[derive(Debug, Clone)]
pub struct MeshConfigBuilder {
    config: MeshConfig,
}

impl MeshConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: MeshConfig::default(),
        }
    }

    pub fn ports(mut self, registration: u16, acknowledgment: u16) -> Self {
        self.config.registration_port = registration;
        self.config.acknowledgment_port = acknowledgment;
        self
    }

    pub fn probe(mut self, probe: ProbePolicy) -> Self {
        self.config.probe = probe;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_timeout = timeout;
        self
    }

    pub fn max_payload(mut self, bytes: usize) -> Self {
        self.config.max_payload = bytes;
        self
    }

    pub fn route_probe_target(mut self, target: impl Into<String>) -> Self {
        self.config.route_probe_target = target.into();
        self
    }

    pub fn discovery_interval(mut self, interval: Duration) -> Self {
        self.config.discovery_interval = interval;
        self
    }

    pub fn address_policy(mut self, policy: AddressPolicy) -> Self {
        self.config.address_policy = policy;
        self
    }

    pub fn max_inbound_connections(mut self, limit: usize) -> Self {
        self.config.max_inbound_connections = Some(limit);
        self
    }

    pub fn build(self) -> Result<MeshConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for MeshConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
