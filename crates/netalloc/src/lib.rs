//! Container Network Subnet Allocator
//!
//! Hands out non-overlapping private IPv4 subnets for container networks and
//! has the container runtime create them:
//! - Bridge networks (single host)
//! - Overlay networks (multi-host, requires an active swarm cluster)
//!
//! Features:
//! - Per-kind address scopes with a fixed subnet size and a blacklist
//! - Collision avoidance against the runtime's live network list
//! - Serialized read-validate-commit allocation
//! - HTTP API over TCP and a unix socket

pub mod allocator;
pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod runtime;
pub mod service;

// Re-export core types
pub use allocator::{ExistingAllocations, SubnetAllocator};
pub use config::Config;
pub use error::{Error, Result};
pub use models::{AddressScope, AllocationResult, NetworkKind, NetworkScopes};
pub use runtime::{DockerRuntime, InMemoryRuntime, RuntimeGateway};
pub use service::AllocationService;
pub use api::{create_router, serve, ApiServerConfig, AppState};

/// Private IPv4 address space
pub mod address_space {
    use ipnet::Ipv4Net;
    use std::net::Ipv4Addr;

    /// 24-bit block: 10.0.0.0/8
    pub const PRIVATE_24_BIT_BLOCK: Ipv4Net = Ipv4Net::new_assert(Ipv4Addr::new(10, 0, 0, 0), 8);

    /// 20-bit block: 172.16.0.0/12
    pub const PRIVATE_20_BIT_BLOCK: Ipv4Net =
        Ipv4Net::new_assert(Ipv4Addr::new(172, 16, 0, 0), 12);

    /// 16-bit block: 192.168.0.0/16
    pub const PRIVATE_16_BIT_BLOCK: Ipv4Net =
        Ipv4Net::new_assert(Ipv4Addr::new(192, 168, 0, 0), 16);

    pub const PRIVATE_BLOCKS: [Ipv4Net; 3] = [
        PRIVATE_24_BIT_BLOCK,
        PRIVATE_20_BIT_BLOCK,
        PRIVATE_16_BIT_BLOCK,
    ];

    /// Longest subnet prefix: network, gateway and broadcast plus one host
    pub const MAX_SUBNET_PREFIX: u8 = 30;

    /// Whether an address lies in one of the three private blocks
    pub fn is_private(addr: Ipv4Addr) -> bool {
        PRIVATE_BLOCKS.iter().any(|block| block.contains(&addr))
    }

}

/// Build metadata
pub mod build_info {
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");

    pub const COMMIT: &str = match option_env!("NETALLOC_GIT_COMMIT") {
        Some(commit) => commit,
        None => "unknown",
    };

    pub const BRANCH: &str = match option_env!("NETALLOC_GIT_BRANCH") {
        Some(branch) => branch,
        None => "unknown",
    };
}
