//! Address blocks already in use
//!
//! Built per allocation attempt from the runtime's live network list plus
//! the configured blacklist, then discarded.

use ipnet::Ipv4Net;
use serde::Serialize;
use std::collections::BTreeSet;

/// Ordered, de-duplicated set of blocks a new subnet must not overlap
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ExistingAllocations {
    blocks: BTreeSet<Ipv4Net>,
}

impl ExistingAllocations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a block, returning false if it was already present
    pub fn insert(&mut self, block: Ipv4Net) -> bool {
        self.blocks.insert(block.trunc())
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Ipv4Net> {
        self.blocks.iter()
    }

    /// Whether any block shares at least one address with `net`
    pub fn overlaps(&self, net: &Ipv4Net) -> bool {
        self.blocks.iter().any(|block| blocks_overlap(block, net))
    }
}

/// Two CIDR blocks overlap exactly when one contains the other's base address
fn blocks_overlap(a: &Ipv4Net, b: &Ipv4Net) -> bool {
    a.contains(&b.network()) || b.contains(&a.network())
}

impl FromIterator<Ipv4Net> for ExistingAllocations {
    fn from_iter<I: IntoIterator<Item = Ipv4Net>>(iter: I) -> Self {
        let mut existing = Self::new();
        existing.extend(iter);
        existing
    }
}

impl Extend<Ipv4Net> for ExistingAllocations {
    fn extend<I: IntoIterator<Item = Ipv4Net>>(&mut self, iter: I) {
        for block in iter {
            self.insert(block);
        }
    }
}

impl<'a> IntoIterator for &'a ExistingAllocations {
    type Item = &'a Ipv4Net;
    type IntoIter = std::collections::btree_set::Iter<'a, Ipv4Net>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.iter()
    }
}
