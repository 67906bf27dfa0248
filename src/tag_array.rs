use crate::cache::{
    self,
    block::{Block, Status},
    controller::{self, CacheController},
};
use crate::address;

#[derive(Debug, Clone, Default, Hash, PartialEq, Eq)]
pub struct EvictedBlockInfo {
    pub block_addr: address,
    pub set_index: usize,
    pub way: usize,
    pub modified: bool,
}

/// Result of probing the tag array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Probe {
    /// Block is present in line `index`.
    Hit { index: usize },
    /// Block is absent; line `victim` would be replaced on fill.
    Miss { victim: usize },
}

impl Probe {
    #[must_use]
    pub fn is_hit(&self) -> bool {
        matches!(self, Probe::Hit { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FillStatus {
    pub index: usize,
    pub evicted: Option<EvictedBlockInfo>,
}

/// Tag array.
#[derive(Debug)]
pub struct TagArray<B, C> {
    /// nset x assoc lines in total
    pub lines: Vec<B>,
    num_access: usize,
    pub num_dirty: usize,
    cache_config: cache::Config,
    cache_controller: C,
}

impl<B> TagArray<B, controller::linear::CacheControllerUnit>
where
    B: Block,
{
    #[must_use]
    pub fn new(config: cache::Config) -> Self {
        let lines = (0..config.total_lines).map(|_| B::default()).collect();
        let cache_controller = controller::linear::CacheControllerUnit::new(&config);
        Self {
            lines,
            num_access: 0,
            num_dirty: 0,
            cache_config: config,
            cache_controller,
        }
    }
}

impl<B, C> TagArray<B, C>
where
    B: Block,
    C: CacheController,
{
    #[inline]
    #[must_use]
    pub fn controller(&self) -> &C {
        &self.cache_controller
    }

    /// Lines of a set.
    #[must_use]
    pub fn set(&self, set_index: usize) -> &[B] {
        let start = set_index * self.cache_config.associativity;
        &self.lines[start..start + self.cache_config.associativity]
    }

    #[must_use]
    pub fn num_valid_lines(&self, set_index: usize) -> usize {
        self.set(set_index).iter().filter(|line| line.is_valid()).count()
    }

    /// Probes the tag array without changing any state.
    ///
    /// On a miss, the victim is the first invalid line of the set,
    /// or else the least recently used (or oldest, for FIFO) line.
    /// Ties go to the lowest way.
    #[must_use]
    pub fn probe(&self, addr: address) -> Probe {
        let set_index = self.cache_controller.set_index(addr) as usize;
        let tag = self.cache_controller.tag(addr);

        let mut invalid_line = None;
        let mut valid_line = None;
        let mut valid_time = u64::MAX;

        for way in 0..self.cache_config.associativity {
            let idx = set_index * self.cache_config.associativity + way;
            let line = &self.lines[idx];
            if line.is_valid() && line.tag() == tag {
                return Probe::Hit { index: idx };
            }
            if line.is_invalid() {
                if invalid_line.is_none() {
                    invalid_line = Some(idx);
                }
                continue;
            }
            let time = match self.cache_config.replacement_policy {
                cache::config::ReplacementPolicy::LRU => line.last_access_time(),
                cache::config::ReplacementPolicy::FIFO => line.alloc_time(),
            };
            if time < valid_time {
                valid_time = time;
                valid_line = Some(idx);
            }
        }

        log::trace!(
            "tag_array::probe({}) set={} tag={} => invalid_line={:?} valid_line={:?} ({:?} policy)",
            addr,
            set_index,
            tag,
            invalid_line,
            valid_line,
            self.cache_config.replacement_policy,
        );

        let victim = match (invalid_line, valid_line) {
            (Some(invalid), _) => invalid,
            (None, Some(valid)) => valid,
            (None, None) => unreachable!("set with zero ways"),
        };
        Probe::Miss { victim }
    }

    /// Accesses the tag array.
    ///
    /// A hit refreshes the replacement state and marks the line dirty on writes.
    /// A miss does not allocate: lines are allocated when the fill arrives.
    pub fn access(&mut self, addr: address, is_write: bool, time: u64) -> Probe {
        self.num_access += 1;
        let probe = self.probe(addr);
        if let Probe::Hit { index } = probe {
            let line = &mut self.lines[index];
            line.set_last_access_time(time);
            if is_write && !line.is_modified() {
                line.set_status(Status::MODIFIED);
                self.num_dirty += 1;
            }
        }
        probe
    }

    /// Installs the block containing `addr`, evicting the victim if needed.
    pub fn fill(&mut self, addr: address, is_write: bool, time: u64) -> FillStatus {
        let (index, evicted) = match self.probe(addr) {
            Probe::Hit { index } => {
                self.lines[index].set_last_access_time(time);
                (index, None)
            }
            Probe::Miss { victim } => {
                let set_index = self.cache_controller.set_index(addr) as usize;
                let line = &mut self.lines[victim];
                let evicted = if line.is_valid() {
                    if line.is_modified() {
                        self.num_dirty -= 1;
                    }
                    Some(EvictedBlockInfo {
                        block_addr: line.block_addr(),
                        set_index: line.set_index(),
                        way: victim % self.cache_config.associativity,
                        modified: line.is_modified(),
                    })
                } else {
                    None
                };
                log::trace!(
                    "tag_array::allocate(cache={}, tag={}, evicted={:?}, time={})",
                    victim,
                    self.cache_controller.tag(addr),
                    evicted,
                    time,
                );
                line.allocate(
                    self.cache_controller.tag(addr),
                    self.cache_controller.block_addr(addr),
                    set_index,
                    time,
                );
                (victim, evicted)
            }
        };
        let line = &mut self.lines[index];
        if is_write && !line.is_modified() {
            line.set_status(Status::MODIFIED);
            self.num_dirty += 1;
        }
        FillStatus { index, evicted }
    }

    /// Marks the block dirty if present.
    ///
    /// # Returns
    /// If the block was present.
    pub fn mark_modified(&mut self, addr: address) -> bool {
        match self.probe(addr) {
            Probe::Hit { index } => {
                let line = &mut self.lines[index];
                if !line.is_modified() {
                    line.set_status(Status::MODIFIED);
                    self.num_dirty += 1;
                }
                true
            }
            Probe::Miss { .. } => false,
        }
    }

    /// Invalidates a single block.
    ///
    /// # Returns
    /// The invalidated block, if it was present.
    pub fn invalidate_block(&mut self, addr: address) -> Option<EvictedBlockInfo> {
        let Probe::Hit { index } = self.probe(addr) else {
            return None;
        };
        let line = &mut self.lines[index];
        let modified = line.is_modified();
        if modified {
            self.num_dirty -= 1;
        }
        line.set_status(Status::INVALID);
        Some(EvictedBlockInfo {
            block_addr: line.block_addr(),
            set_index: line.set_index(),
            way: index % self.cache_config.associativity,
            modified,
        })
    }

    #[must_use]
    pub fn num_accesses(&self) -> usize {
        self.num_access
    }
}

#[cfg(test)]
mod tests {
    use super::{Probe, TagArray};
    use crate::cache::{self, block::Block, controller::linear::CacheControllerUnit};
    use crate::config::{self, CacheReplacementPolicy, Size};
    use color_eyre::eyre;

    fn tag_array(
        num_lines: u64,
        associativity: usize,
        replacement_policy: CacheReplacementPolicy,
    ) -> eyre::Result<TagArray<cache::block::Line, CacheControllerUnit>> {
        let config = config::Cache {
            size: Size(num_lines * 64),
            associativity,
            block_size: 64,
            replacement_policy,
            ..config::Cache::l1()
        };
        Ok(TagArray::new(cache::Config::try_from(&config)?))
    }

    #[test]
    fn test_direct_mapped_evicts_sole_line() -> eyre::Result<()> {
        // 4 sets, 1 way
        let mut tags = tag_array(4, 1, CacheReplacementPolicy::LRU)?;
        let mut time = 0;
        for addr in [0, 64, 128, 192] {
            time += 1;
            assert!(tags.fill(addr, false, time).evicted.is_none());
        }
        // every later block maps to a set with exactly one candidate
        for addr in (4..32u64).map(|block| block * 64) {
            time += 1;
            let set_index = ((addr / 64) % 4) as usize;
            let before = tags.set(set_index)[0].block_addr();
            let fill = tags.fill(addr, false, time);
            assert_eq!(fill.index, set_index);
            let evicted = fill.evicted.expect("full set evicts");
            assert_eq!(evicted.block_addr, before);
            assert_eq!(evicted.way, 0);
            assert_eq!(tags.num_valid_lines(set_index), 1);
        }
        Ok(())
    }

    #[test]
    fn test_invalid_lines_fill_lowest_way_first() -> eyre::Result<()> {
        let mut tags = tag_array(4, 4, CacheReplacementPolicy::LRU)?;
        assert_eq!(tags.probe(0), Probe::Miss { victim: 0 });
        let _ = tags.fill(0, false, 1);
        assert_eq!(tags.probe(64), Probe::Miss { victim: 1 });
        let _ = tags.fill(64, false, 2);
        let _ = tags.fill(128, false, 3);
        assert!(tags.invalidate_block(0).is_some());
        assert_eq!(tags.probe(192), Probe::Miss { victim: 0 });
        Ok(())
    }

    #[test]
    fn test_lru_tie_breaks_to_lowest_way() -> eyre::Result<()> {
        let mut tags = tag_array(2, 2, CacheReplacementPolicy::LRU)?;
        let _ = tags.fill(0, false, 5);
        let _ = tags.fill(64, false, 5);
        assert_eq!(tags.probe(128), Probe::Miss { victim: 0 });
        Ok(())
    }

    #[test]
    fn test_fifo_ignores_hits() -> eyre::Result<()> {
        let mut tags = tag_array(2, 2, CacheReplacementPolicy::FIFO)?;
        let _ = tags.fill(0, false, 1);
        let _ = tags.fill(64, false, 2);
        assert!(tags.access(0, false, 3).is_hit());
        let fill = tags.fill(128, false, 4);
        assert_eq!(fill.evicted.map(|e| e.block_addr), Some(0));

        let mut tags = tag_array(2, 2, CacheReplacementPolicy::LRU)?;
        let _ = tags.fill(0, false, 1);
        let _ = tags.fill(64, false, 2);
        assert!(tags.access(0, false, 3).is_hit());
        let fill = tags.fill(128, false, 4);
        assert_eq!(fill.evicted.map(|e| e.block_addr), Some(64));
        Ok(())
    }

    #[test]
    fn test_dirty_tracking() -> eyre::Result<()> {
        let mut tags = tag_array(2, 2, CacheReplacementPolicy::LRU)?;
        let _ = tags.fill(0, true, 1);
        let _ = tags.fill(64, false, 2);
        assert_eq!(tags.num_dirty, 1);
        assert!(tags.access(64, true, 3).is_hit());
        assert_eq!(tags.num_dirty, 2);

        let evicted = tags.fill(128, false, 4).evicted.expect("full set evicts");
        assert_eq!(evicted.block_addr, 0);
        assert!(evicted.modified);
        assert_eq!(tags.num_dirty, 1);

        let invalidated = tags.invalidate_block(64).expect("block is present");
        assert!(invalidated.modified);
        assert_eq!(tags.num_dirty, 0);
        Ok(())
    }
}
