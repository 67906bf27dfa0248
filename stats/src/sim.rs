use serde::{Deserialize, Serialize};

/// Replay-wide counters that do not belong to a single cache level.
#[derive(Clone, Default, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sim {
    /// Simulated cycles until the last fill was drained.
    pub cycles: u64,
    /// Trace records issued to the hierarchy.
    pub accesses: u64,
    /// Cycles in which the next access was stalled on a full MSHR.
    pub stall_cycles: u64,
    /// Dirty blocks written back to memory.
    pub memory_writebacks: u64,
}
