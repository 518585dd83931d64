//! Container runtime gateway
//!
//! The runtime's live network list is the only record of which subnets are
//! in use; this module reads it and commits new networks to it. Two
//! implementations are provided:
//! - [`DockerRuntime`] talks to a Docker engine through `bollard`
//! - [`InMemoryRuntime`] keeps networks in process, for tests and dry runs

mod docker;
mod memory;

pub use docker::DockerRuntime;
pub use memory::InMemoryRuntime;

use crate::address_space;
use crate::allocator::ExistingAllocations;
use crate::models::NetworkKind;
use crate::Result;
use async_trait::async_trait;
use ipnet::Ipv4Net;
use serde::Serialize;
use std::net::Ipv4Addr;
use tracing::debug;

/// Drivers whose networks have no address space of their own
pub const UNADDRESSABLE_DRIVERS: [&str; 2] = ["host", "none"];

/// A network as reported by the runtime
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuntimeNetwork {
    pub id: String,
    pub name: String,
    pub driver: String,
    /// IPAM subnet strings, in the order the runtime reports them
    pub subnets: Vec<String>,
}

impl RuntimeNetwork {
    /// The network's private IPv4 subnet, if it has one
    ///
    /// Only the first non-empty IPAM subnet is considered. Networks whose
    /// driver is `host` or `none`, whose subnet is IPv6 or malformed, or
    /// whose base address is public yield `None`.
    pub fn private_subnet(&self) -> Option<Ipv4Net> {
        if UNADDRESSABLE_DRIVERS.contains(&self.driver.as_str()) {
            return None;
        }

        let subnet = self.subnets.iter().map(|s| s.trim()).find(|s| !s.is_empty())?;
        let subnet = subnet.parse::<Ipv4Net>().ok()?.trunc();

        address_space::is_private(subnet.network()).then_some(subnet)
    }
}

/// Request to create a network
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkSpec {
    pub kind: NetworkKind,
    pub name: String,
    pub subnet: Ipv4Net,
    pub gateway: Ipv4Addr,
    pub ipam_driver: String,
    pub check_duplicate: bool,
    pub attachable: bool,
    pub enable_ipv6: bool,
}

impl NetworkSpec {
    /// Attachable, IPv4-only network with duplicate-name rejection and the
    /// gateway on the subnet's first usable address
    pub fn new(kind: NetworkKind, name: impl Into<String>, subnet: Ipv4Net) -> Self {
        Self {
            kind,
            name: name.into(),
            subnet,
            gateway: gateway_for(subnet),
            ipam_driver: "default".to_string(),
            check_duplicate: true,
            attachable: true,
            enable_ipv6: false,
        }
    }
}

/// Gateway address of a subnet: base address + 1
pub fn gateway_for(subnet: Ipv4Net) -> Ipv4Addr {
    Ipv4Addr::from(u32::from(subnet.network()).saturating_add(1))
}

/// Network created by the runtime
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedNetwork {
    pub id: String,
    pub warning: Option<String>,
}

/// Cluster membership of the runtime's node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterInfo {
    pub active: bool,
    pub node_state: String,
}

impl ClusterInfo {
    /// Derive cluster status from the runtime's node state string
    ///
    /// Only an empty or `inactive` state means the node is outside a
    /// cluster. Transitional states count as active; the runtime rejects
    /// the create call if the cluster turns out to be unusable.
    pub fn from_node_state(state: impl Into<String>) -> Self {
        let node_state = state.into();
        let active = !(node_state.is_empty() || node_state.eq_ignore_ascii_case("inactive"));
        Self { active, node_state }
    }
}

/// Collect the private subnets of a network listing
pub fn existing_allocations<'a, I>(networks: I) -> ExistingAllocations
where
    I: IntoIterator<Item = &'a RuntimeNetwork>,
{
    networks
        .into_iter()
        .filter_map(|network| {
            let subnet = network.private_subnet();
            if let Some(subnet) = subnet {
                debug!(network = %network.name, %subnet, "Found runtime network");
            }
            subnet
        })
        .collect()
}

/// Operations the allocation service needs from a container runtime
#[async_trait]
pub trait RuntimeGateway: Send + Sync {
    /// All networks currently registered with the runtime
    async fn list_networks(&self) -> Result<Vec<RuntimeNetwork>>;

    /// Create a network
    async fn create_network(&self, spec: &NetworkSpec) -> Result<CreatedNetwork>;

    /// Cluster status of the runtime's node
    async fn cluster_info(&self) -> Result<ClusterInfo>;

    /// Private subnets of all addressable networks
    async fn list_allocations(&self) -> Result<ExistingAllocations> {
        let networks = self.list_networks().await?;
        Ok(existing_allocations(&networks))
    }
}
