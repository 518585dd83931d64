//! Data Transfer Objects for the REST API
//!
//! Request and response types for API endpoints.

use crate::allocator::ExistingAllocations;
use crate::models::{AddressScope, AllocationResult, NetworkKind, NetworkScopes};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Network DTOs
// ============================================================================

/// Created network
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkDto {
    pub id: String,
    pub name: String,
    pub driver: NetworkKind,
    pub subnet: String,
    pub gateway: String,
    pub warning: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<AllocationResult> for NetworkDto {
    fn from(result: AllocationResult) -> Self {
        Self {
            id: result.id,
            name: result.name,
            driver: result.kind,
            subnet: result.subnet.to_string(),
            gateway: result.gateway.to_string(),
            warning: result.warning,
            created_at: result.created_at,
        }
    }
}

/// Response to a network creation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateNetworkResponse {
    pub network: NetworkDto,
}

/// Subnets currently registered with the runtime
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationsResponse {
    pub allocations: Vec<String>,
    pub total: usize,
}

impl From<ExistingAllocations> for AllocationsResponse {
    fn from(existing: ExistingAllocations) -> Self {
        let allocations: Vec<String> = existing.iter().map(|b| b.to_string()).collect();
        Self {
            total: allocations.len(),
            allocations,
        }
    }
}

// ============================================================================
// Scope DTOs
// ============================================================================

/// Configured scope for one network kind
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeDto {
    pub network_scope: String,
    pub subnet_prefix: u8,
    pub blacklist: Vec<String>,
    pub subnet_count: u64,
}

impl From<&AddressScope> for ScopeDto {
    fn from(scope: &AddressScope) -> Self {
        Self {
            network_scope: scope.cidr().to_string(),
            subnet_prefix: scope.subnet_prefix(),
            blacklist: scope.blacklist().iter().map(|b| b.to_string()).collect(),
            subnet_count: scope.subnet_count(),
        }
    }
}

/// Configured scopes for every network kind
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopesResponse {
    pub bridge: ScopeDto,
    pub overlay: ScopeDto,
}

impl From<&NetworkScopes> for ScopesResponse {
    fn from(scopes: &NetworkScopes) -> Self {
        Self {
            bridge: ScopeDto::from(&scopes.bridge),
            overlay: ScopeDto::from(&scopes.overlay),
        }
    }
}

// ============================================================================
// Common DTOs
// ============================================================================

/// Service status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    pub fn ok() -> Self {
        Self {
            status: "OK".to_string(),
        }
    }
}

/// API error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    pub code: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
        }
    }
}

/// JSON body rendered with indentation
#[derive(Debug, Clone)]
pub struct PrettyJson<T>(pub T);

impl<T: Serialize> IntoResponse for PrettyJson<T> {
    fn into_response(self) -> Response {
        match serde_json::to_vec_pretty(&self.0) {
            Ok(mut body) => {
                body.push(b'\n');
                (
                    [(
                        header::CONTENT_TYPE,
                        HeaderValue::from_static("application/json; charset=utf-8"),
                    )],
                    body,
                )
                    .into_response()
            }
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("text/plain; charset=utf-8"),
                )],
                err.to_string(),
            )
                .into_response(),
        }
    }
}
