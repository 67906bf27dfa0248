#![allow(non_camel_case_types, clippy::upper_case_acronyms)]

pub mod cache;
pub mod mem;
pub mod sim;

pub use cache::{Cache, Summary};
pub use mem::AccessKind;
pub use sim::Sim;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Per-level summaries in level registration order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Report(pub IndexMap<String, Summary>);

impl Report {
    #[must_use]
    pub fn into_inner(self) -> IndexMap<String, Summary> {
        self.0
    }
}

impl std::ops::Deref for Report {
    type Target = IndexMap<String, Summary>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Everything recorded during one replay.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub sim: Sim,
    pub caches: Report,
}

/// Statistics collector.
///
/// Accumulates per-level counters as independent entities:
/// a miss in a first-level cache and the resulting access to
/// the shared level are recorded at their own level.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Collector {
    pub sim: Sim,
    levels: IndexMap<String, Cache>,
}

impl Collector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a collector that reports the given levels even if they are never accessed.
    #[must_use]
    pub fn with_levels<I, S>(levels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let levels = levels
            .into_iter()
            .map(|name| (name.into(), Cache::default()))
            .collect();
        Self {
            sim: Sim::default(),
            levels,
        }
    }

    /// Get the counters of a level, registering it on first use.
    pub fn level_mut(&mut self, level: &str) -> &mut Cache {
        if !self.levels.contains_key(level) {
            self.levels.insert(level.to_string(), Cache::default());
        }
        &mut self.levels[level]
    }

    #[must_use]
    pub fn level(&self, level: &str) -> Option<&Cache> {
        self.levels.get(level)
    }

    /// Records the outcome of one access at one level.
    #[inline]
    pub fn record(
        &mut self,
        level: &str,
        kind: impl Into<AccessKind>,
        outcome: impl Into<cache::AccessStat>,
    ) {
        self.level_mut(level).inc(kind, outcome, 1);
    }

    #[inline]
    pub fn record_event(&mut self, level: &str, event: cache::Event) {
        self.level_mut(level).inc_event(event, 1);
    }

    /// Snapshot of the per-level summaries.
    ///
    /// The snapshot is a copy: the collector keeps accumulating.
    #[must_use]
    pub fn report(&self) -> Report {
        Report(
            self.levels
                .iter()
                .map(|(name, stats)| (name.clone(), stats.summary()))
                .collect(),
        )
    }

    #[must_use]
    pub fn stats(&self) -> Stats {
        Stats {
            sim: self.sim.clone(),
            caches: self.report(),
        }
    }
}
