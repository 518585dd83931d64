//! Allocation service
//!
//! Turns "give me a network of kind X" into a committed runtime network:
//! - checks the cluster precondition for overlay networks
//! - takes the process-wide allocation lock
//! - snapshots existing allocations and adds the kind's blacklist
//! - runs the subnet allocator over the kind's scope
//! - commits the chosen subnet to the runtime
//!
//! The lock is held across the runtime create call. The runtime has no way
//! to reserve a subnet, so the snapshot read and the commit have to happen
//! inside one critical section for two requests never to pick the same
//! block. Bridge and overlay requests share the lock because their scopes
//! can overlap.

use crate::allocator::{ExistingAllocations, SubnetAllocator};
use crate::models::{AllocationResult, NetworkKind, NetworkScopes};
use crate::runtime::{NetworkSpec, RuntimeGateway};
use crate::{Error, Result};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Allocates subnets and commits them as runtime networks
pub struct AllocationService {
    scopes: NetworkScopes,
    runtime: Arc<dyn RuntimeGateway>,
    allocation_lock: Mutex<()>,
}

impl AllocationService {
    pub fn new(scopes: NetworkScopes, runtime: Arc<dyn RuntimeGateway>) -> Self {
        Self {
            scopes,
            runtime,
            allocation_lock: Mutex::new(()),
        }
    }

    /// Configured scopes
    pub fn scopes(&self) -> &NetworkScopes {
        &self.scopes
    }

    /// Allocate a subnet and create a network of the given kind
    ///
    /// A missing or blank name is replaced with a random UUID. Every error
    /// is returned to the caller; the allocation lock is released on all
    /// paths.
    #[instrument(skip_all, fields(kind = %kind))]
    pub async fn request_network(
        &self,
        kind: NetworkKind,
        name: Option<String>,
    ) -> Result<AllocationResult> {
        let start = Instant::now();

        if kind.requires_cluster() {
            let cluster = self.runtime.cluster_info().await?;
            if !cluster.active {
                warn!(node_state = %cluster.node_state, "Overlay network requested without an active cluster");
                return Err(Error::NoActiveCluster);
            }
        }

        let name = normalize_name(name);

        let result = {
            let _guard = self.allocation_lock.lock().await;
            debug!("Acquired allocation lock");
            self.allocate_locked(kind, name).await
        };

        debug!(elapsed = ?start.elapsed(), ok = result.is_ok(), "Allocation finished");
        result
    }

    /// Snapshot of the private subnets currently registered with the runtime
    ///
    /// Does not take the allocation lock; the result may be stale as soon
    /// as it is returned.
    pub async fn allocations(&self) -> Result<ExistingAllocations> {
        self.runtime.list_allocations().await
    }

    async fn allocate_locked(&self, kind: NetworkKind, name: String) -> Result<AllocationResult> {
        let scope = self.scopes.get(kind);

        let mut existing = self.runtime.list_allocations().await?;
        existing.extend(scope.blacklist().iter().copied());
        debug!(existing = ?existing, "Existing allocations");

        let subnet = SubnetAllocator::new(scope).allocate(&existing).map_err(|e| {
            warn!(scope = %scope.cidr(), "No available networks");
            e
        })?;

        let spec = NetworkSpec::new(kind, name, subnet);
        let created = self.runtime.create_network(&spec).await.map_err(|e| {
            warn!(name = %spec.name, %subnet, error = %e, "Runtime failed to create network");
            e
        })?;

        info!(id = %created.id, name = %spec.name, %subnet, gateway = %spec.gateway, "Network created");

        Ok(AllocationResult {
            id: created.id,
            name: spec.name,
            kind,
            subnet,
            gateway: spec.gateway,
            warning: created.warning,
            created_at: Utc::now(),
        })
    }
}

/// Trimmed name, or a random UUID when absent or blank
fn normalize_name(name: Option<String>) -> String {
    name.map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}
