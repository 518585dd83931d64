//! Allocation orchestration

mod allocation;

pub use allocation::AllocationService;
