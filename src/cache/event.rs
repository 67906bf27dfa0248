use crate::{address, tag_array};

#[must_use]
pub fn was_back_invalidated(events: &[Event]) -> bool {
    events
        .iter()
        .any(|event| matches!(event, Event::BackInvalidated { .. }))
}

/// Side effect of a fill on a cache level.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum Event {
    /// A valid line was replaced.
    Evicted {
        evicted_block: tag_array::EvictedBlockInfo,
    },
    /// A dirty block from the level above was merged into this level.
    WritebackReceived { block_addr: address },
    /// A line was invalidated because the shared level evicted it.
    BackInvalidated {
        evicted_block: tag_array::EvictedBlockInfo,
    },
}

impl Event {
    /// The statistic counted for this event.
    #[must_use]
    pub fn stat(&self) -> stats::cache::Event {
        match self {
            Event::Evicted { .. } => stats::cache::Event::EVICTION,
            Event::WritebackReceived { .. } => stats::cache::Event::WRITEBACK,
            Event::BackInvalidated { .. } => stats::cache::Event::BACK_INVALIDATION,
        }
    }
}
