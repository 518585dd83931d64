//! Subnet allocator for a configured address scope
//!
//! Walks the scope one subnet at a time, starting at the scope's base
//! address, and picks the first candidate that is free, inside the scope
//! and inside private address space. Stepping is CIDR successor stepping:
//! a /24 advances by 256 addresses, a /20 by 4096.

use super::ExistingAllocations;
use crate::address_space;
use crate::models::AddressScope;
use crate::{Error, Result};
use ipnet::Ipv4Net;
use std::net::Ipv4Addr;
use tracing::{debug, info};

/// Successor of `net` among blocks of the same prefix length
///
/// Returns `None` when the successor would run past `255.255.255.255`.
pub fn next_subnet(net: Ipv4Net) -> Option<Ipv4Net> {
    let block_size = 1u64 << (32 - net.prefix_len());
    let next = u64::from(u32::from(net.network())) + block_size;
    let next = u32::try_from(next).ok()?;
    Ipv4Net::new(Ipv4Addr::from(next), net.prefix_len()).ok()
}

/// Iterator over every candidate subnet of a scope, in address order
#[derive(Debug, Clone)]
pub struct Candidates {
    scope: Ipv4Net,
    next: Option<Ipv4Net>,
}

impl Candidates {
    fn new(scope: &AddressScope) -> Self {
        let cidr = scope.cidr();
        let first = Ipv4Net::new(cidr.network(), scope.subnet_prefix())
            .ok()
            .map(|net| net.trunc());

        Self {
            scope: cidr,
            next: first,
        }
    }
}

impl Iterator for Candidates {
    type Item = Ipv4Net;

    fn next(&mut self) -> Option<Ipv4Net> {
        let current = self.next?;
        let scope = self.scope;
        self.next = next_subnet(current).filter(|n| scope.contains(&n.network()));
        Some(current)
    }
}

/// Allocation engine for one address scope
///
/// Pure with respect to its inputs: the same scope and the same existing
/// allocations always yield the same subnet.
#[derive(Debug, Clone, Copy)]
pub struct SubnetAllocator<'a> {
    scope: &'a AddressScope,
}

impl<'a> SubnetAllocator<'a> {
    pub fn new(scope: &'a AddressScope) -> Self {
        Self { scope }
    }

    /// Every candidate subnet of the scope, first candidate first
    pub fn candidates(&self) -> Candidates {
        Candidates::new(self.scope)
    }

    /// Find the first free subnet
    ///
    /// A candidate is accepted only when it overlaps no existing allocation,
    /// its base address lies inside the scope, and its base address is
    /// private. The private check is kept even though a well-formed scope
    /// already implies it: it is what stops a misconfigured public scope
    /// from ever being handed out.
    pub fn allocate(&self, existing: &ExistingAllocations) -> Result<Ipv4Net> {
        for candidate in self.candidates() {
            let taken = existing.overlaps(&candidate);
            let in_scope = self.scope.cidr().contains(&candidate.network());
            let private = address_space::is_private(candidate.network());

            debug!(
                %candidate,
                taken,
                in_scope,
                private,
                "Testing candidate subnet"
            );

            if !taken && in_scope && private {
                info!(subnet = %candidate, scope = %self.scope.cidr(), "Selected subnet");
                return Ok(candidate);
            }
        }

        Err(Error::NoAvailableNetworks(self.scope.cidr()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn net(s: &str) -> Ipv4Net {
        Ipv4Net::from_str(s).unwrap()
    }

    fn scope(cidr: &str, prefix: u8) -> AddressScope {
        AddressScope::parse::<&str>(cidr, prefix, &[]).unwrap()
    }

    #[test]
    fn test_next_subnet_steps_by_block() {
        assert_eq!(next_subnet(net("10.0.0.0/24")), Some(net("10.0.1.0/24")));
        assert_eq!(next_subnet(net("10.0.255.0/24")), Some(net("10.1.0.0/24")));
        assert_eq!(next_subnet(net("10.100.0.0/20")), Some(net("10.100.16.0/20")));
        assert_eq!(next_subnet(net("192.168.0.0/30")), Some(net("192.168.0.4/30")));
    }

    #[test]
    fn test_next_subnet_overflow() {
        assert_eq!(next_subnet(net("255.255.255.0/24")), None);
        assert_eq!(next_subnet(net("128.0.0.0/1")), None);
        assert_eq!(next_subnet(net("0.0.0.0/0")), None);
    }

    #[test]
    fn test_first_allocation() {
        let scope = scope("10.0.0.0/8", 24);
        let allocator = SubnetAllocator::new(&scope);

        let subnet = allocator.allocate(&ExistingAllocations::new()).unwrap();
        assert_eq!(subnet, net("10.0.0.0/24"));
    }

    #[test]
    fn test_skips_existing_allocation() {
        let scope = scope("10.0.0.0/8", 24);
        let allocator = SubnetAllocator::new(&scope);
        let existing: ExistingAllocations = [net("10.0.0.0/24")].into_iter().collect();

        let subnet = allocator.allocate(&existing).unwrap();
        assert_eq!(subnet, net("10.0.1.0/24"));
    }

    #[test]
    fn test_skips_block_containing_candidate() {
        let scope = scope("10.0.0.0/8", 24);
        let allocator = SubnetAllocator::new(&scope);
        // A /22 covers four /24 candidates
        let existing: ExistingAllocations = [net("10.0.0.0/22")].into_iter().collect();

        let subnet = allocator.allocate(&existing).unwrap();
        assert_eq!(subnet, net("10.0.4.0/24"));
    }

    #[test]
    fn test_skips_block_nested_in_candidate() {
        let scope = scope("10.0.0.0/8", 24);
        let allocator = SubnetAllocator::new(&scope);
        let existing: ExistingAllocations = [net("10.0.0.128/26")].into_iter().collect();

        let subnet = allocator.allocate(&existing).unwrap();
        assert_eq!(subnet, net("10.0.1.0/24"));
    }

    #[test]
    fn test_fills_gaps() {
        let scope = scope("10.0.0.0/16", 24);
        let allocator = SubnetAllocator::new(&scope);
        let existing: ExistingAllocations = [net("10.0.0.0/24"), net("10.0.2.0/24")]
            .into_iter()
            .collect();

        let subnet = allocator.allocate(&existing).unwrap();
        assert_eq!(subnet, net("10.0.1.0/24"));
    }

    #[test]
    fn test_deterministic() {
        let scope = scope("172.16.0.0/12", 20);
        let allocator = SubnetAllocator::new(&scope);
        let existing: ExistingAllocations = [net("172.16.0.0/20"), net("172.16.32.0/20")]
            .into_iter()
            .collect();

        let first = allocator.allocate(&existing).unwrap();
        for _ in 0..10 {
            assert_eq!(allocator.allocate(&existing).unwrap(), first);
        }
        assert_eq!(first, net("172.16.16.0/20"));
    }

    #[test]
    fn test_exhaustion() {
        let scope = scope("10.100.0.0/20", 24);
        let allocator = SubnetAllocator::new(&scope);

        let mut existing = ExistingAllocations::new();
        for _ in 0..16 {
            let subnet = allocator.allocate(&existing).unwrap();
            existing.insert(subnet);
        }

        let result = allocator.allocate(&existing);
        assert_eq!(result, Err(Error::NoAvailableNetworks(net("10.100.0.0/20"))));
    }

    #[test]
    fn test_blacklisted_single_subnet_scope_exhausted() {
        let scope = AddressScope::parse("192.168.1.0/24", 24, &["192.168.1.0/24"]).unwrap();
        let allocator = SubnetAllocator::new(&scope);
        let existing: ExistingAllocations = scope.blacklist().iter().copied().collect();

        assert!(matches!(
            allocator.allocate(&existing),
            Err(Error::NoAvailableNetworks(_))
        ));
    }

    #[test]
    fn test_candidate_count_matches_scope() {
        for (cidr, prefix) in [
            ("10.0.0.0/16", 24u8),
            ("192.168.0.0/16", 20),
            ("172.16.0.0/12", 16),
            ("192.168.1.0/24", 24),
            ("192.168.1.0/24", 30),
        ] {
            let scope = scope(cidr, prefix);
            let allocator = SubnetAllocator::new(&scope);
            assert_eq!(
                allocator.candidates().count() as u64,
                scope.subnet_count(),
                "candidate count for {} /{}",
                cidr,
                prefix
            );
        }
    }

    #[test]
    fn test_candidates_are_disjoint_and_ordered() {
        let scope = scope("10.0.0.0/20", 22);
        let candidates: Vec<Ipv4Net> = SubnetAllocator::new(&scope).candidates().collect();

        assert_eq!(
            candidates,
            vec![
                net("10.0.0.0/22"),
                net("10.0.4.0/22"),
                net("10.0.8.0/22"),
                net("10.0.12.0/22"),
            ]
        );
    }

    #[test]
    fn test_candidates_stop_at_top_of_address_space() {
        let scope = scope("255.255.0.0/16", 24);
        let candidates: Vec<Ipv4Net> = SubnetAllocator::new(&scope).candidates().collect();

        assert_eq!(candidates.len(), 256);
        assert_eq!(candidates.last(), Some(&net("255.255.255.0/24")));
    }

    #[test]
    fn test_public_scope_never_allocated() {
        let scope = scope("8.8.0.0/16", 24);
        let allocator = SubnetAllocator::new(&scope);

        assert!(matches!(
            allocator.allocate(&ExistingAllocations::new()),
            Err(Error::NoAvailableNetworks(_))
        ));
    }

    #[test]
    fn test_partially_public_scope_skips_public_part() {
        // 172.0.0.0/11 spans 172.0.0.0 - 172.31.255.255; only the upper half is private
        let scope = scope("172.0.0.0/11", 12);
        let allocator = SubnetAllocator::new(&scope);

        let subnet = allocator.allocate(&ExistingAllocations::new()).unwrap();
        assert_eq!(subnet, net("172.16.0.0/12"));
    }

    #[test]
    fn test_allocation_never_overlaps_existing() {
        let scope = scope("10.10.0.0/16", 24);
        let allocator = SubnetAllocator::new(&scope);
        let mut existing: ExistingAllocations = [
            net("10.10.0.0/23"),
            net("10.10.2.64/26"),
            net("10.10.5.0/24"),
            net("10.0.0.0/12"),
        ]
        .into_iter()
        .collect();

        // The /12 covers the whole scope, so nothing can be allocated
        assert!(allocator.allocate(&existing).is_err());

        let mut existing: ExistingAllocations = existing
            .iter()
            .copied()
            .filter(|block| *block != net("10.0.0.0/12"))
            .collect();
        let mut allocated = Vec::new();
        while let Ok(subnet) = allocator.allocate(&existing) {
            assert!(!existing.overlaps(&subnet));
            existing.insert(subnet);
            allocated.push(subnet);
        }

        // 256 candidates minus 10.10.0/1/2/5
        assert_eq!(allocated.len(), 252);
        assert_eq!(allocated[0], net("10.10.3.0/24"));
        assert_eq!(allocated[1], net("10.10.4.0/24"));
        assert_eq!(allocated[2], net("10.10.6.0/24"));
    }
}
