pub mod block;
pub mod config;
pub mod controller;
pub mod event;
pub mod set_index;

pub use config::Config;
pub use event::Event;
pub use stats::cache::{RequestStatus, ReservationFailure};

use crate::mshr::{self, MSHR};
use crate::tag_array::{self, TagArray};
use crate::{address, trace::Access};
use controller::CacheController;

/// Outcome of a lookup.
///
/// Misses are either `MISS` (a new MSHR was allocated) or `MSHR_HIT`
/// (merged into an outstanding MSHR). A reservation failure means the
/// request was not accepted and must be retried.
pub type Outcome = Result<RequestStatus, ReservationFailure>;

/// Result of resolving an outstanding miss.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fill {
    pub block_addr: address,
    pub evicted: Option<tag_array::EvictedBlockInfo>,
    /// All requests that were waiting for this block, in arrival order.
    pub targets: Vec<Access>,
}

/// A single set-associative cache level.
///
/// Lines are allocated when a fill arrives, not when the miss is detected.
/// Misses to the same block are coalesced in one MSHR entry.
#[derive(Debug)]
pub struct SetAssociative {
    name: String,
    cache_config: Config,
    tag_array: TagArray<block::Line, controller::linear::CacheControllerUnit>,
    mshrs: mshr::Table<Access>,
}

impl std::fmt::Display for SetAssociative {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

impl SetAssociative {
    pub fn new(
        name: impl Into<String>,
        config: &crate::config::Cache,
    ) -> Result<Self, crate::config::Error> {
        let name = name.into();
        let cache_config = Config::try_from(config).map_err(|source| {
            crate::config::Error::InvalidConfig {
                level: name.clone(),
                source,
            }
        })?;
        let mshrs = mshr::Table::new(cache_config.mshr_entries, cache_config.mshr_max_merge);
        let tag_array = TagArray::new(cache_config.clone());
        Ok(Self {
            name,
            cache_config,
            tag_array,
            mshrs,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.cache_config
    }

    #[must_use]
    pub fn tag_array(&self) -> &TagArray<block::Line, controller::linear::CacheControllerUnit> {
        &self.tag_array
    }

    #[must_use]
    pub fn mshrs(&self) -> &mshr::Table<Access> {
        &self.mshrs
    }

    #[inline]
    #[must_use]
    pub fn block_addr(&self, addr: address) -> address {
        self.tag_array.controller().block_addr(addr)
    }

    /// Checks if the block containing `addr` is present.
    #[must_use]
    pub fn contains(&self, addr: address) -> bool {
        self.tag_array.probe(addr).is_hit()
    }

    /// Number of misses still waiting for their fill.
    #[must_use]
    pub fn num_outstanding_misses(&self) -> usize {
        self.mshrs.len()
    }

    /// Computes what a lookup of `addr` would do, without changing any state.
    #[must_use]
    pub fn peek(&self, addr: address) -> Outcome {
        if self.contains(addr) {
            return Ok(RequestStatus::HIT);
        }
        let mshr_addr = self.tag_array.controller().mshr_addr(addr);
        match self.mshrs.probe(mshr_addr) {
            mshr::Probe::Allocate => Ok(RequestStatus::MISS),
            mshr::Probe::Merge => Ok(RequestStatus::MSHR_HIT),
            mshr::Probe::EntryFail => Err(ReservationFailure::MSHR_ENTRY_FAIL),
            mshr::Probe::MergeFail => Err(ReservationFailure::MSHR_MERGE_ENTRY_FAIL),
        }
    }

    /// Looks up an access.
    ///
    /// A miss is tracked in the MSHR table until [`SetAssociative::fill`]
    /// resolves it. A rejected lookup leaves the cache untouched.
    pub fn lookup(&mut self, access: Access, time: u64) -> Outcome {
        let outcome = self.peek(access.addr);
        let mshr_addr = self.tag_array.controller().mshr_addr(access.addr);
        log::trace!(
            "{}::lookup({}, time={}) => {:?} (mshr_addr={}, outstanding={})",
            self.name,
            access,
            time,
            outcome,
            mshr_addr,
            self.mshrs.len(),
        );
        match outcome {
            Ok(RequestStatus::HIT) => {
                let _ = self.tag_array.access(access.addr, access.is_write(), time);
            }
            Ok(RequestStatus::MISS | RequestStatus::MSHR_HIT) => {
                let _ = self.tag_array.access(access.addr, access.is_write(), time);
                self.mshrs.add(mshr_addr, access, time);
            }
            Err(failure) => {
                log::debug!(
                    "{}::lookup({}) stalled: {:?} ({}/{} mshrs in use)",
                    self.name,
                    access,
                    failure,
                    self.mshrs.len(),
                    self.mshrs.num_entries(),
                );
            }
        }
        outcome
    }

    /// Resolves the outstanding miss for `block_addr`.
    ///
    /// Installs the block (dirty if any waiting request was a write),
    /// releases the MSHR entry and returns all coalesced requests.
    pub fn fill(&mut self, block_addr: address, time: u64) -> Fill {
        let mshr_addr = self.tag_array.controller().mshr_addr(block_addr);
        let targets: Vec<Access> = self
            .mshrs
            .remove(mshr_addr)
            .map(|entry| entry.into_requests().into())
            .unwrap_or_default();
        let is_write = targets.iter().any(Access::is_write);
        let tag_array::FillStatus { index, evicted } =
            self.tag_array.fill(mshr_addr, is_write, time);
        log::trace!(
            "{}::fill(block={}, time={}) line={} evicted={:?} targets={}",
            self.name,
            mshr_addr,
            time,
            index,
            evicted,
            targets.len(),
        );
        Fill {
            block_addr: mshr_addr,
            evicted,
            targets,
        }
    }

    /// Invalidates the block containing `addr`, if present.
    pub fn invalidate(&mut self, addr: address) -> Option<tag_array::EvictedBlockInfo> {
        self.tag_array.invalidate_block(addr)
    }

    /// Merges a dirty block written back from the level above.
    ///
    /// # Returns
    /// If the block was present.
    pub fn writeback(&mut self, addr: address) -> bool {
        self.tag_array.mark_modified(addr)
    }
}
