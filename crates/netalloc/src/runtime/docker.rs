//! Docker engine gateway
//!
//! Uses the engine API through `bollard`. Listing and cluster queries that
//! fail for any reason are reported as the runtime being unavailable; a
//! create call the engine answers with an error response is a rejection.

use super::{ClusterInfo, CreatedNetwork, NetworkSpec, RuntimeGateway, RuntimeNetwork};
use crate::{Error, Result};
use async_trait::async_trait;
use bollard::models::{Ipam, IpamConfig, Network};
use bollard::network::{CreateNetworkOptions, ListNetworksOptions};
use bollard::Docker;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Gateway backed by a Docker engine
#[derive(Debug, Clone)]
pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    /// Connect using the local defaults (`DOCKER_HOST` or the local socket)
    pub fn connect() -> Result<Self> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| Error::RuntimeUnavailable(format!("Failed to connect to Docker: {e}")))?;
        Ok(Self { docker })
    }

    /// Wrap an existing client
    pub fn with_client(docker: Docker) -> Self {
        Self { docker }
    }

    /// Check that the engine answers
    pub async fn ping(&self) -> Result<()> {
        self.docker
            .ping()
            .await
            .map(|_| ())
            .map_err(|e| Error::RuntimeUnavailable(format!("Docker ping failed: {e}")))
    }
}

#[async_trait]
impl RuntimeGateway for DockerRuntime {
    async fn list_networks(&self) -> Result<Vec<RuntimeNetwork>> {
        let start = Instant::now();
        let networks = self
            .docker
            .list_networks(Some(ListNetworksOptions::<String> {
                filters: HashMap::new(),
            }))
            .await
            .map_err(|e| Error::RuntimeUnavailable(format!("Failed to list networks: {e}")))?;
        debug!(count = networks.len(), elapsed = ?start.elapsed(), "Listed Docker networks");

        Ok(networks.into_iter().map(runtime_network).collect())
    }

    async fn create_network(&self, spec: &NetworkSpec) -> Result<CreatedNetwork> {
        let start = Instant::now();
        info!(name = %spec.name, driver = %spec.kind, subnet = %spec.subnet, "Creating Docker network");
        debug!(subnet = %spec.subnet, gateway = %spec.gateway, "IPAM configuration");

        let response = self
            .docker
            .create_network(create_options(spec))
            .await
            .map_err(create_error)?;
        debug!(elapsed = ?start.elapsed(), "Docker create network");

        if let Some(warning) = response.warning.as_deref().filter(|w| !w.is_empty()) {
            warn!(name = %spec.name, warning, "Docker reported a warning");
        }

        Ok(CreatedNetwork {
            id: response.id.unwrap_or_default(),
            warning: response.warning.filter(|w| !w.is_empty()),
        })
    }

    async fn cluster_info(&self) -> Result<ClusterInfo> {
        let info = self
            .docker
            .info()
            .await
            .map_err(|e| Error::RuntimeUnavailable(format!("Failed to query Docker info: {e}")))?;

        let state = info
            .swarm
            .and_then(|swarm| swarm.local_node_state)
            .map(|state| state.to_string())
            .unwrap_or_default();

        Ok(ClusterInfo::from_node_state(state))
    }
}

fn runtime_network(network: Network) -> RuntimeNetwork {
    let subnets = network
        .ipam
        .and_then(|ipam| ipam.config)
        .unwrap_or_default()
        .into_iter()
        .map(|config| config.subnet.unwrap_or_default())
        .collect();

    RuntimeNetwork {
        id: network.id.unwrap_or_default(),
        name: network.name.unwrap_or_default(),
        driver: network.driver.unwrap_or_default(),
        subnets,
    }
}

fn create_options(spec: &NetworkSpec) -> CreateNetworkOptions<String> {
    CreateNetworkOptions {
        name: spec.name.clone(),
        check_duplicate: spec.check_duplicate,
        driver: spec.kind.driver().to_string(),
        attachable: spec.attachable,
        enable_ipv6: spec.enable_ipv6,
        ipam: Ipam {
            driver: Some(spec.ipam_driver.clone()),
            config: Some(vec![IpamConfig {
                subnet: Some(spec.subnet.to_string()),
                gateway: Some(spec.gateway.to_string()),
                ..Default::default()
            }]),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn create_error(err: bollard::errors::Error) -> Error {
    match err {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } => Error::RuntimeRejected(format!("{message} (status {status_code})")),
        other => Error::RuntimeUnavailable(format!("Failed to create network: {other}")),
    }
}
