//! REST API for network allocation
//!
//! Served over TCP and, optionally, a unix socket.
//!
//! # Endpoints
//!
//! ## Networks
//! - `POST /api/bridge` - Create a bridge network with a generated name
//! - `POST /api/bridge/:name` - Create a named bridge network
//! - `POST /api/overlay` - Create an overlay network with a generated name
//! - `POST /api/overlay/:name` - Create a named overlay network
//!
//! ## Inspection
//! - `GET /api/allocations` - Subnets currently known to the runtime
//! - `GET /api/scopes` - Configured scopes
//!
//! ## Status & Health
//! - `GET /` - Service status
//! - `GET /health` - Health check
//! - `GET /ready` - Readiness check

pub mod dto;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;

pub use dto::*;
pub use router::{create_router, ApiServerConfig};
pub use server::serve;
pub use state::AppState;
