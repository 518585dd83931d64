//! Subnet allocation
//!
//! Provides:
//! - The set of address blocks already in use (existing allocations)
//! - The candidate walk and validation loop over a configured scope

mod existing;
mod subnet_allocator;

pub use existing::ExistingAllocations;
pub use subnet_allocator::{next_subnet, Candidates, SubnetAllocator};
