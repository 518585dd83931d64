//! Address scopes for each network kind
//!
//! A scope is the validated, in-memory form of one configuration section:
//! the block subnets are carved from, the fixed prefix length of every
//! subnet, and the blocks that must never be handed out.

use super::NetworkKind;
use crate::address_space::MAX_SUBNET_PREFIX;
use crate::{Error, Result};
use ipnet::Ipv4Net;
use serde::Serialize;

/// Validated allocation scope for one network kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddressScope {
    cidr: Ipv4Net,
    subnet_prefix: u8,
    blacklist: Vec<Ipv4Net>,
}

impl AddressScope {
    /// Create a scope from already parsed blocks
    ///
    /// Host bits are truncated from every block. The subnet prefix must fit
    /// inside the scope and leave room for a gateway and at least one host.
    pub fn new(cidr: Ipv4Net, subnet_prefix: u8, blacklist: Vec<Ipv4Net>) -> Result<Self> {
        let cidr = cidr.trunc();

        if subnet_prefix < cidr.prefix_len() {
            return Err(Error::ConfigInvalid(format!(
                "Subnet prefix /{} is shorter than scope {}",
                subnet_prefix, cidr
            )));
        }

        if subnet_prefix > MAX_SUBNET_PREFIX {
            return Err(Error::ConfigInvalid(format!(
                "Subnet prefix /{} is longer than /{} (minimum 4 addresses)",
                subnet_prefix, MAX_SUBNET_PREFIX
            )));
        }

        let mut blacklist: Vec<Ipv4Net> = blacklist.into_iter().map(|b| b.trunc()).collect();
        blacklist.sort_unstable();
        blacklist.dedup();

        Ok(Self {
            cidr,
            subnet_prefix,
            blacklist,
        })
    }

    /// Parse a scope from its configured string form
    pub fn parse<S: AsRef<str>>(scope: &str, subnet_prefix: u8, blacklist: &[S]) -> Result<Self> {
        let cidr = parse_cidr(scope)
            .map_err(|e| Error::ConfigInvalid(format!("Invalid scope '{}': {}", scope, e)))?;

        let blacklist = blacklist
            .iter()
            .map(|entry| {
                let entry = entry.as_ref();
                parse_cidr(entry).map_err(|e| {
                    Error::ConfigInvalid(format!("Invalid blacklist entry '{}': {}", entry, e))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Self::new(cidr, subnet_prefix, blacklist)
    }

    /// The block subnets are allocated from
    pub fn cidr(&self) -> Ipv4Net {
        self.cidr
    }

    /// Prefix length of every allocated subnet
    pub fn subnet_prefix(&self) -> u8 {
        self.subnet_prefix
    }

    /// Blocks excluded from allocation
    pub fn blacklist(&self) -> &[Ipv4Net] {
        &self.blacklist
    }

    /// Number of distinct subnets the scope can be divided into
    pub fn subnet_count(&self) -> u64 {
        1u64 << (self.subnet_prefix - self.cidr.prefix_len())
    }
}

impl std::fmt::Display for AddressScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (/{} subnets)", self.cidr, self.subnet_prefix)
    }
}

fn parse_cidr(s: &str) -> std::result::Result<Ipv4Net, ipnet::AddrParseError> {
    s.trim().parse::<Ipv4Net>()
}

/// Scopes for every network kind, fixed at startup
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkScopes {
    pub bridge: AddressScope,
    pub overlay: AddressScope,
}

impl NetworkScopes {
    pub fn new(bridge: AddressScope, overlay: AddressScope) -> Self {
        Self { bridge, overlay }
    }

    /// Scope used for the given kind
    pub fn get(&self, kind: NetworkKind) -> &AddressScope {
        match kind {
            NetworkKind::Bridge => &self.bridge,
            NetworkKind::Overlay => &self.overlay,
        }
    }
}
