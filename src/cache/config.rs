use crate::config;

pub use crate::config::CacheReplacementPolicy as ReplacementPolicy;

/// Validated geometry and timing of a single cache level.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Cache replacement policy.
    pub replacement_policy: ReplacementPolicy,

    /// Cache line size.
    pub line_size: u32,

    /// Cache associativity.
    pub associativity: usize,

    /// Number of sets.
    pub num_sets: usize,

    /// Number of lines.
    pub total_lines: usize,
    pub line_size_log2: u32,

    /// Number of MSHR entries.
    pub mshr_entries: usize,

    /// Maximum number of requests merged into a single MSHR entry.
    pub mshr_max_merge: usize,

    pub tag_latency: u64,
    pub data_latency: u64,
    pub response_latency: u64,
}

impl TryFrom<&config::Cache> for Config {
    type Error = config::Invalid;

    fn try_from(config: &config::Cache) -> Result<Self, Self::Error> {
        let num_sets = config.validate()?;
        Ok(Self {
            replacement_policy: config.replacement_policy,
            line_size: config.block_size,
            associativity: config.associativity,
            num_sets,
            total_lines: num_sets * config.associativity,
            line_size_log2: config::logb2(config.block_size),
            mshr_entries: config.mshrs,
            mshr_max_merge: config.tgts_per_mshr,
            tag_latency: config.tag_latency,
            data_latency: config.data_latency,
            response_latency: config.response_latency,
        })
    }
}

impl Config {
    /// Number of cycles for a hit.
    #[inline]
    #[must_use]
    pub fn hit_latency(&self) -> u64 {
        self.tag_latency + self.data_latency
    }
}
