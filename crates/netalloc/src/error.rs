//! Error types for network allocation

use ipnet::Ipv4Net;
use thiserror::Error;

/// Result type for allocation operations
pub type Result<T> = std::result::Result<T, Error>;

/// Allocation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    // Configuration errors
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    // Precondition errors
    #[error("No running swarm cluster")]
    NoActiveCluster,

    // Allocation errors
    #[error("No available networks in scope {0}")]
    NoAvailableNetworks(Ipv4Net),

    // Container runtime errors
    #[error("Container runtime unavailable: {0}")]
    RuntimeUnavailable(String),

    #[error("Container runtime rejected the request: {0}")]
    RuntimeRejected(String),
}

impl Error {
    /// Short machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Error::ConfigInvalid(_) => "config_invalid",
            Error::NoActiveCluster => "no_active_cluster",
            Error::NoAvailableNetworks(_) => "no_available_networks",
            Error::RuntimeUnavailable(_) => "runtime_unavailable",
            Error::RuntimeRejected(_) => "runtime_rejected",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds_are_distinct() {
        let errors = [
            Error::ConfigInvalid("bad".to_string()),
            Error::NoActiveCluster,
            Error::NoAvailableNetworks("10.0.0.0/8".parse().unwrap()),
            Error::RuntimeUnavailable("down".to_string()),
            Error::RuntimeRejected("duplicate".to_string()),
        ];

        let mut kinds: Vec<&str> = errors.iter().map(Error::kind).collect();
        kinds.sort_unstable();
        kinds.dedup();
        assert_eq!(kinds.len(), errors.len());
    }

    #[test]
    fn test_display_includes_scope() {
        let err = Error::NoAvailableNetworks("192.168.1.0/24".parse().unwrap());
        assert_eq!(err.to_string(), "No available networks in scope 192.168.1.0/24");
    }
}
