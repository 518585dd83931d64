//! REST API handlers
//!
//! Implements handlers for network creation, allocation listing and scopes.

use super::dto::*;
use super::state::AppState;
use crate::models::NetworkKind;
use crate::Error;
use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use std::sync::Arc;
use tracing::debug;

type ApiResult<T> = Result<(StatusCode, PrettyJson<T>), (StatusCode, PrettyJson<ApiError>)>;

/// HTTP status for an allocation error
pub fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::NoAvailableNetworks(_) => StatusCode::CONFLICT,
        Error::NoActiveCluster => StatusCode::PRECONDITION_FAILED,
        Error::RuntimeUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        Error::RuntimeRejected(_) => StatusCode::BAD_GATEWAY,
        Error::ConfigInvalid(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Convert internal error to API response
fn error_response(err: Error) -> (StatusCode, PrettyJson<ApiError>) {
    (
        status_for(&err),
        PrettyJson(ApiError::new(err.kind(), err.to_string())),
    )
}

// ============================================================================
// Network Handlers
// ============================================================================

/// Create a bridge network with a generated name
pub async fn create_bridge_network(
    State(state): State<Arc<AppState>>,
) -> ApiResult<CreateNetworkResponse> {
    create_network(&state, NetworkKind::Bridge, None).await
}

/// Create a bridge network with the given name
pub async fn create_named_bridge_network(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<CreateNetworkResponse> {
    create_network(&state, NetworkKind::Bridge, Some(name)).await
}

/// Create an overlay network with a generated name
pub async fn create_overlay_network(
    State(state): State<Arc<AppState>>,
) -> ApiResult<CreateNetworkResponse> {
    create_network(&state, NetworkKind::Overlay, None).await
}

/// Create an overlay network with the given name
pub async fn create_named_overlay_network(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<CreateNetworkResponse> {
    create_network(&state, NetworkKind::Overlay, Some(name)).await
}

async fn create_network(
    state: &AppState,
    kind: NetworkKind,
    name: Option<String>,
) -> ApiResult<CreateNetworkResponse> {
    debug!(%kind, name = ?name, "Network creation requested");

    let result = state
        .service
        .request_network(kind, name)
        .await
        .map_err(error_response)?;

    Ok((
        StatusCode::CREATED,
        PrettyJson(CreateNetworkResponse {
            network: NetworkDto::from(result),
        }),
    ))
}

/// List subnets currently registered with the runtime
pub async fn list_allocations(
    State(state): State<Arc<AppState>>,
) -> ApiResult<AllocationsResponse> {
    let existing = state.service.allocations().await.map_err(error_response)?;
    Ok((StatusCode::OK, PrettyJson(AllocationsResponse::from(existing))))
}

/// Configured scopes
pub async fn get_scopes(State(state): State<Arc<AppState>>) -> PrettyJson<ScopesResponse> {
    PrettyJson(ScopesResponse::from(state.service.scopes()))
}

/// Service status
pub async fn index() -> PrettyJson<StatusResponse> {
    PrettyJson(StatusResponse::ok())
}
