//! API router configuration
//!
//! Defines all API routes and middleware.

use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the API router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        // Bridge networks
        .route("/api/bridge", post(handlers::create_bridge_network))
        .route(
            "/api/bridge/:name",
            post(handlers::create_named_bridge_network),
        )
        // Overlay networks
        .route("/api/overlay", post(handlers::create_overlay_network))
        .route(
            "/api/overlay/:name",
            post(handlers::create_named_overlay_network),
        )
        // Inspection
        .route("/api/allocations", get(handlers::list_allocations))
        .route("/api/scopes", get(handlers::get_scopes))
        // Health check
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        // Add state
        .with_state(state)
        // Add middleware
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Readiness check endpoint
async fn readiness_check() -> &'static str {
    "READY"
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
    /// Unix socket to listen on, if any
    pub unix_socket: Option<PathBuf>,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 4444,
            unix_socket: None,
        }
    }
}

impl ApiServerConfig {
    /// Get the bind address
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl From<&crate::config::Config> for ApiServerConfig {
    fn from(config: &crate::config::Config) -> Self {
        Self {
            host: config.server.host.clone(),
            port: config.server.port,
            unix_socket: config.unix_socket(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AddressScope, NetworkScopes};
    use crate::runtime::InMemoryRuntime;
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use tower::ServiceExt;

    fn test_state() -> Arc<AppState> {
        let scopes = NetworkScopes::new(
            AddressScope::parse::<&str>("10.0.0.0/8", 24, &[]).unwrap(),
            AddressScope::parse::<&str>("192.168.0.0/16", 24, &[]).unwrap(),
        );
        Arc::new(AppState::with_runtime(
            scopes,
            Arc::new(InMemoryRuntime::new()),
        ))
    }

    #[tokio::test]
    async fn test_health_check() {
        let app = create_router(test_state());

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_readiness_check() {
        let app = create_router(test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/ready")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_index() {
        let app = create_router(test_state());

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_create_bridge() {
        let app = create_router(test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/bridge/web")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_get_not_allowed_on_create() {
        let app = create_router(test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/bridge")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[test]
    fn test_api_config_default() {
        let config = ApiServerConfig::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 4444);
        assert_eq!(config.bind_addr(), "0.0.0.0:4444");
        assert!(config.unix_socket.is_none());
    }
}
