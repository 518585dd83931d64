//! Data models for network allocation

mod network;
mod scope;

pub use network::{AllocationResult, NetworkKind};
pub use scope::{AddressScope, NetworkScopes};
