//! Application state for the API
//!
//! Holds shared state across all API handlers.

use crate::models::NetworkScopes;
use crate::runtime::RuntimeGateway;
use crate::service::AllocationService;
use std::sync::Arc;

/// Application state shared across handlers
pub struct AppState {
    /// Allocation service
    pub service: AllocationService,
}

impl AppState {
    /// Create state around an existing service
    pub fn new(service: AllocationService) -> Self {
        Self { service }
    }

    /// Create state from scopes and a runtime gateway
    pub fn with_runtime(scopes: NetworkScopes, runtime: Arc<dyn RuntimeGateway>) -> Self {
        Self::new(AllocationService::new(scopes, runtime))
    }
}
