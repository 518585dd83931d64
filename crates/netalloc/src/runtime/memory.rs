//! In-process runtime
//!
//! Keeps a network table behind a lock and behaves like a container runtime
//! for the calls the allocation service makes, including duplicate-name
//! rejection. Failure and latency can be injected to exercise error paths
//! and concurrent allocation.

use super::{ClusterInfo, CreatedNetwork, NetworkSpec, RuntimeGateway, RuntimeNetwork};
use crate::{Error, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

/// Runtime that stores networks in memory
#[derive(Debug, Default)]
pub struct InMemoryRuntime {
    networks: RwLock<Vec<RuntimeNetwork>>,
    cluster_active: AtomicBool,
    fail_listing: AtomicBool,
    fail_cluster: AtomicBool,
    reject_create: RwLock<Option<String>>,
    create_delay: RwLock<Option<Duration>>,
    list_calls: AtomicUsize,
    create_calls: AtomicUsize,
    cluster_calls: AtomicUsize,
}

impl InMemoryRuntime {
    /// Empty runtime outside any cluster
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set whether the node is in an active cluster
    pub fn with_cluster(self, active: bool) -> Self {
        self.set_cluster_active(active);
        self
    }

    /// Builder: register an existing network
    pub fn with_network(self, driver: &str, name: &str, subnet: &str) -> Self {
        self.add_network(driver, name, subnet);
        self
    }

    /// Register an existing network, as if created outside this process
    pub fn add_network(&self, driver: &str, name: &str, subnet: &str) {
        let subnets = if subnet.is_empty() {
            Vec::new()
        } else {
            vec![subnet.to_string()]
        };

        self.networks.write().push(RuntimeNetwork {
            id: Uuid::new_v4().simple().to_string(),
            name: name.to_string(),
            driver: driver.to_string(),
            subnets,
        });
    }

    /// Remove a network by name, returning whether it existed
    pub fn remove_network(&self, name: &str) -> bool {
        let mut networks = self.networks.write();
        let before = networks.len();
        networks.retain(|n| n.name != name);
        networks.len() != before
    }

    pub fn set_cluster_active(&self, active: bool) {
        self.cluster_active.store(active, Ordering::SeqCst);
    }

    /// Make listing fail as if the runtime could not be reached
    pub fn set_fail_listing(&self, fail: bool) {
        self.fail_listing.store(fail, Ordering::SeqCst);
    }

    /// Make cluster queries fail as if the runtime could not be reached
    pub fn set_fail_cluster(&self, fail: bool) {
        self.fail_cluster.store(fail, Ordering::SeqCst);
    }

    /// Make every create call fail with the given rejection message
    pub fn set_reject_create(&self, message: Option<String>) {
        *self.reject_create.write() = message;
    }

    /// Sleep inside every create call
    pub fn set_create_delay(&self, delay: Option<Duration>) {
        *self.create_delay.write() = delay;
    }

    /// Snapshot of the registered networks
    pub fn networks(&self) -> Vec<RuntimeNetwork> {
        self.networks.read().clone()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn cluster_calls(&self) -> usize {
        self.cluster_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RuntimeGateway for InMemoryRuntime {
    async fn list_networks(&self) -> Result<Vec<RuntimeNetwork>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(Error::RuntimeUnavailable(
                "in-memory runtime is offline".to_string(),
            ));
        }

        Ok(self.networks())
    }

    async fn create_network(&self, spec: &NetworkSpec) -> Result<CreatedNetwork> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self.create_delay.read();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let rejection = self.reject_create.read().clone();
        if let Some(message) = rejection {
            return Err(Error::RuntimeRejected(message));
        }

        if spec.kind.requires_cluster() && !self.cluster_active.load(Ordering::SeqCst) {
            return Err(Error::RuntimeRejected(
                "This node is not a swarm manager".to_string(),
            ));
        }

        let mut networks = self.networks.write();
        if spec.check_duplicate && networks.iter().any(|n| n.name == spec.name) {
            return Err(Error::RuntimeRejected(format!(
                "network with name {} already exists",
                spec.name
            )));
        }

        let id = Uuid::new_v4().simple().to_string();
        networks.push(RuntimeNetwork {
            id: id.clone(),
            name: spec.name.clone(),
            driver: spec.kind.driver().to_string(),
            subnets: vec![spec.subnet.to_string()],
        });
        debug!(%id, name = %spec.name, subnet = %spec.subnet, "Registered in-memory network");

        Ok(CreatedNetwork { id, warning: None })
    }

    async fn cluster_info(&self) -> Result<ClusterInfo> {
        self.cluster_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_cluster.load(Ordering::SeqCst) {
            return Err(Error::RuntimeUnavailable(
                "in-memory runtime is offline".to_string(),
            ));
        }

        let state = if self.cluster_active.load(Ordering::SeqCst) {
            "active"
        } else {
            "inactive"
        };
        Ok(ClusterInfo::from_node_state(state))
    }
}
