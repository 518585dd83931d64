//! Network kinds and allocation results

use chrono::{DateTime, Utc};
use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

/// Kind of container network, named after the runtime driver that backs it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkKind {
    /// Single-host bridge network
    Bridge,
    /// Multi-host overlay network, requires an active swarm cluster
    Overlay,
}

impl NetworkKind {
    /// Runtime driver name for this kind
    pub fn driver(&self) -> &'static str {
        match self {
            NetworkKind::Bridge => "bridge",
            NetworkKind::Overlay => "overlay",
        }
    }

    /// Whether creating this kind of network needs an active cluster
    pub fn requires_cluster(&self) -> bool {
        matches!(self, NetworkKind::Overlay)
    }
}

impl std::fmt::Display for NetworkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.driver())
    }
}

/// A network committed to the container runtime
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllocationResult {
    /// Runtime-assigned network identifier
    pub id: String,
    /// Network name
    pub name: String,
    /// Driver kind
    pub kind: NetworkKind,
    /// Allocated subnet
    pub subnet: Ipv4Net,
    /// Gateway address (first usable address of the subnet)
    pub gateway: Ipv4Addr,
    /// Warning reported by the runtime, if any
    pub warning: Option<String>,
    /// When the network was committed
    pub created_at: DateTime<Utc>,
}
