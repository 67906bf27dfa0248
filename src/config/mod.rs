pub mod experiment;
pub mod size;

pub use experiment::{Experiment, Overrides, Sweep};
pub use size::{ParseSizeError, Size};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Integer log2, treating zero as one.
#[inline]
#[must_use]
pub fn logb2(n: u32) -> u32 {
    n.max(1).ilog2()
}

/// A cache replacement policy
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CacheReplacementPolicy {
    #[default]
    LRU, // L
    FIFO, // F
}

/// Inclusion policy between the first level caches and the shared level.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InclusionPolicy {
    /// Evicting a block from the shared level leaves the first level untouched.
    #[default]
    NonInclusive,
    /// Evicting a block from the shared level back-invalidates it in the first level.
    Inclusive,
}

/// Reason a cache level was rejected.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Invalid {
    #[error("{0} must be non-zero")]
    Zero(&'static str),

    #[error("block size {0} is not a power of two")]
    BlockSizeNotPowerOfTwo(u32),

    #[error("size {size} is not divisible by associativity ({associativity}) x block size ({block_size})")]
    Indivisible {
        size: Size,
        associativity: usize,
        block_size: u32,
    },
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("invalid {level} cache config: {source}")]
    InvalidConfig { level: String, source: Invalid },
}

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("could not open sweep config {path:?}")]
    OpenFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

/// Configuration of a single cache level.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cache {
    pub size: Size,
    pub associativity: usize,
    pub block_size: u32,

    /// Cycles to look up the tag array.
    pub tag_latency: u64,
    /// Cycles to access the data array on a hit.
    pub data_latency: u64,
    /// Cycles to forward a fill to the requestor.
    pub response_latency: u64,

    /// Number of miss status handling registers.
    pub mshrs: usize,
    /// Maximum number of requests merged into one MSHR.
    pub tgts_per_mshr: usize,

    #[serde(default)]
    pub replacement_policy: CacheReplacementPolicy,
}

impl std::fmt::Display for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let size = human_bytes::human_bytes(self.size.bytes() as f64);
        write!(
            f,
            "{size} ({}-way, {} byte line, {} mshrs)",
            self.associativity, self.block_size, self.mshrs
        )
    }
}

impl Cache {
    /// First level cache parameters of the reference system.
    #[must_use]
    pub fn l1() -> Self {
        Self {
            size: Size(32 * size::KIB),
            associativity: 8,
            block_size: 64,
            tag_latency: 1,
            data_latency: 1,
            response_latency: 1,
            mshrs: 16,
            tgts_per_mshr: 20,
            replacement_policy: CacheReplacementPolicy::LRU,
        }
    }

    /// Shared second level cache parameters of the reference system.
    #[must_use]
    pub fn l2() -> Self {
        Self {
            size: Size(256 * size::KIB),
            associativity: 16,
            block_size: 64,
            tag_latency: 10,
            data_latency: 10,
            response_latency: 10,
            mshrs: 20,
            tgts_per_mshr: 12,
            replacement_policy: CacheReplacementPolicy::LRU,
        }
    }

    /// Checks the cache geometry.
    ///
    /// # Returns
    /// The number of sets.
    pub fn validate(&self) -> Result<usize, Invalid> {
        if self.size.bytes() == 0 {
            return Err(Invalid::Zero("size"));
        }
        if self.associativity == 0 {
            return Err(Invalid::Zero("associativity"));
        }
        if self.block_size == 0 {
            return Err(Invalid::Zero("block size"));
        }
        if !self.block_size.is_power_of_two() {
            return Err(Invalid::BlockSizeNotPowerOfTwo(self.block_size));
        }
        if self.mshrs == 0 {
            return Err(Invalid::Zero("mshrs"));
        }
        if self.tgts_per_mshr == 0 {
            return Err(Invalid::Zero("targets per mshr"));
        }
        let indivisible = || Invalid::Indivisible {
            size: self.size,
            associativity: self.associativity,
            block_size: self.block_size,
        };
        // a set larger than the address space never divides a non-zero size
        let set_bytes = u64::try_from(self.associativity)
            .ok()
            .and_then(|associativity| associativity.checked_mul(u64::from(self.block_size)))
            .ok_or_else(indivisible)?;
        if self.size.bytes() % set_bytes != 0 {
            return Err(indivisible());
        }
        Ok((self.size.bytes() / set_bytes) as usize)
    }

    /// Number of cycles for a hit.
    #[inline]
    #[must_use]
    pub fn hit_latency(&self) -> u64 {
        self.tag_latency + self.data_latency
    }
}

/// Two level cache hierarchy: split first level, shared second level.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hierarchy {
    pub l1i: Cache,
    pub l1d: Cache,
    pub l2: Cache,
    pub inclusion: InclusionPolicy,
    /// Cycles for main memory to answer a fetch from the shared level.
    pub memory_latency: u64,
}

impl Default for Hierarchy {
    fn default() -> Self {
        Self {
            l1i: Cache::l1(),
            l1d: Cache::l1(),
            l2: Cache::l2(),
            inclusion: InclusionPolicy::default(),
            memory_latency: 100,
        }
    }
}

impl std::fmt::Display for Hierarchy {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "L1I {} | L1D {} | L2 {} ({:?})",
            self.l1i, self.l1d, self.l2, self.inclusion
        )
    }
}
