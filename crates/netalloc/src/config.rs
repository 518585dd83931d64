//! Daemon configuration
//!
//! Loaded from a YAML file. `${VAR}` placeholders are replaced from the
//! environment before parsing. Scopes are required for both network kinds;
//! a missing or malformed scope stops the daemon from starting.

use crate::models::{AddressScope, NetworkKind, NetworkScopes};
use crate::Error;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Base name of the configuration file searched for by default
pub const CONFIG_FILE_NAME: &str = "netalloc";

const CONFIG_EXTENSIONS: [&str; 2] = ["yaml", "yml"];

/// Daemon configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Enable debug logging
    #[serde(default)]
    pub debug: bool,
    /// API listeners
    #[serde(default)]
    pub server: ServerConfig,
    /// Scope for bridge networks
    pub bridge: NetworkConfig,
    /// Scope for overlay networks
    pub overlay: NetworkConfig,
}

/// API listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Unix socket path; empty disables the unix listener
    pub unix_socket: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 4444,
            unix_socket: format!("{}.sock", CONFIG_FILE_NAME),
        }
    }
}

/// Raw scope configuration for one network kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// CIDR block subnets are allocated from
    pub network_scope: String,
    /// Prefix length of each allocated subnet
    pub subnet_prefix: u8,
    /// CIDR blocks never allocated
    #[serde(default)]
    pub blacklist: Vec<String>,
}

impl NetworkConfig {
    /// Validate and convert into an address scope
    pub fn to_scope(&self) -> crate::Result<AddressScope> {
        AddressScope::parse(&self.network_scope, self.subnet_prefix, &self.blacklist)
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file {}", path.display()))?;

        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        let content = substitute_env_vars(content)?;

        let config: Self =
            serde_yaml::from_str(&content).context("Failed to parse configuration YAML")?;

        config.validate()?;
        Ok(config)
    }

    /// Load from an explicit path, or from the first default location found
    ///
    /// Returns the configuration together with the path it was read from.
    pub fn discover(explicit: Option<&Path>) -> Result<(Self, PathBuf)> {
        if let Some(path) = explicit {
            return Ok((Self::from_file(path)?, path.to_path_buf()));
        }

        let candidates = default_paths();
        let path = candidates
            .iter()
            .find(|p| p.is_file())
            .cloned()
            .ok_or_else(|| {
                let searched: Vec<String> =
                    candidates.iter().map(|p| p.display().to_string()).collect();
                anyhow!("No configuration file found (searched {})", searched.join(", "))
            })?;

        Ok((Self::from_file(&path)?, path))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow!("server.port must be greater than 0"));
        }

        if self.server.host.trim().is_empty() {
            return Err(anyhow!("server.host cannot be empty"));
        }

        self.network_scopes()?;
        Ok(())
    }

    /// Validated scopes for every network kind
    pub fn network_scopes(&self) -> crate::Result<NetworkScopes> {
        let bridge = scope_for(NetworkKind::Bridge, &self.bridge)?;
        let overlay = scope_for(NetworkKind::Overlay, &self.overlay)?;
        Ok(NetworkScopes::new(bridge, overlay))
    }

    /// Unix socket path, if the unix listener is enabled
    pub fn unix_socket(&self) -> Option<PathBuf> {
        let socket = self.server.unix_socket.trim();
        (!socket.is_empty()).then(|| PathBuf::from(socket))
    }
}

fn scope_for(kind: NetworkKind, config: &NetworkConfig) -> crate::Result<AddressScope> {
    config.to_scope().map_err(|e| match e {
        Error::ConfigInvalid(msg) => Error::ConfigInvalid(format!("{}: {}", kind, msg)),
        other => other,
    })
}

/// Default search locations: the home directory, then the working directory
pub fn default_paths() -> Vec<PathBuf> {
    let mut search_dirs = Vec::new();
    if let Some(home) = dirs::home_dir() {
        search_dirs.push(home);
    }
    search_dirs.push(PathBuf::from("."));

    search_dirs
        .iter()
        .flat_map(|dir| {
            CONFIG_EXTENSIONS
                .iter()
                .map(move |ext| dir.join(format!("{}.{}", CONFIG_FILE_NAME, ext)))
        })
        .collect()
}

/// Substitute environment variables in format ${VAR_NAME}
fn substitute_env_vars(content: &str) -> Result<String> {
    let re = regex::Regex::new(r"\$\{([^}]+)\}").context("Invalid placeholder pattern")?;
    let mut result = content.to_string();

    for cap in re.captures_iter(content) {
        let full_match = &cap[0];
        let var_name = &cap[1];

        let var_value = std::env::var(var_name)
            .with_context(|| format!("Environment variable '{}' not found", var_name))?;

        result = result.replace(full_match, &var_value);
    }

    Ok(result)
}
