use crate::cache::{self, RequestStatus, ReservationFailure, SetAssociative};
use crate::config::{self, InclusionPolicy};
use crate::tag_array::EvictedBlockInfo;
use crate::trace::{Access, AddressTrace, Kind};
use crate::address;
use smallvec::SmallVec;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};

/// A cache level of the hierarchy.
#[derive(
    Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, strum::EnumIter, serde::Serialize,
)]
pub enum Level {
    L1I,
    L1D,
    L2,
}

impl Level {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Level::L1I => "L1I",
            Level::L1D => "L1D",
            Level::L2 => "L2",
        }
    }

    /// First level cache serving `kind`.
    #[must_use]
    pub fn first_level(kind: Kind) -> Self {
        match kind {
            Kind::Inst => Level::L1I,
            Kind::Read | Kind::Write => Level::L1D,
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of an access at a single level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LevelOutcome {
    pub level: Level,
    pub status: RequestStatus,
    /// Cycles spent looking up this level.
    pub latency: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The access was accepted by every level it touched.
    Completed(SmallVec<[LevelOutcome; 2]>),
    /// `level` could not track the access. Nothing was changed.
    Stalled {
        level: Level,
        reason: ReservationFailure,
    },
}

impl Outcome {
    #[must_use]
    pub fn is_stalled(&self) -> bool {
        matches!(self, Outcome::Stalled { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct PendingFill {
    ready: u64,
    seq: u64,
    level: Level,
    block_addr: address,
}

/// Split first level caches sharing a second level cache.
///
/// Time advances in cycles. Misses schedule fills that are applied once their
/// ready cycle is reached, so misses to a block that is already in flight
/// are merged into the outstanding MSHR entry.
#[derive(Debug)]
pub struct Hierarchy {
    l1i: SetAssociative,
    l1d: SetAssociative,
    l2: SetAssociative,
    inclusion: InclusionPolicy,
    memory_latency: u64,

    cycle: u64,
    seq: u64,
    pending: BinaryHeap<Reverse<PendingFill>>,
    events: Vec<(Level, cache::Event)>,
    memory_writebacks: u64,
}

impl Hierarchy {
    pub fn new(config: &config::Hierarchy) -> Result<Self, config::Error> {
        Ok(Self {
            l1i: SetAssociative::new(Level::L1I.name(), &config.l1i)?,
            l1d: SetAssociative::new(Level::L1D.name(), &config.l1d)?,
            l2: SetAssociative::new(Level::L2.name(), &config.l2)?,
            inclusion: config.inclusion,
            memory_latency: config.memory_latency,
            cycle: 0,
            seq: 0,
            pending: BinaryHeap::new(),
            events: Vec::new(),
            memory_writebacks: 0,
        })
    }

    #[must_use]
    pub fn cache(&self, level: Level) -> &SetAssociative {
        match level {
            Level::L1I => &self.l1i,
            Level::L1D => &self.l1d,
            Level::L2 => &self.l2,
        }
    }

    fn cache_mut(&mut self, level: Level) -> &mut SetAssociative {
        match level {
            Level::L1I => &mut self.l1i,
            Level::L1D => &mut self.l1d,
            Level::L2 => &mut self.l2,
        }
    }

    #[must_use]
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    #[must_use]
    pub fn num_pending_fills(&self) -> usize {
        self.pending.len()
    }

    /// Dirty blocks written back to memory so far.
    #[must_use]
    pub fn memory_writebacks(&self) -> u64 {
        self.memory_writebacks
    }

    /// Takes the events produced by fills since the last call.
    pub fn take_events(&mut self) -> Vec<(Level, cache::Event)> {
        std::mem::take(&mut self.events)
    }

    /// The request sent to the shared level for a first level miss.
    ///
    /// Stores are write-allocate: the shared level sees a block fetch.
    fn l2_fetch(access: Access) -> Access {
        match access.kind {
            Kind::Write => Access {
                kind: Kind::Read,
                ..access
            },
            Kind::Inst | Kind::Read => access,
        }
    }

    /// Issues an access at the current cycle.
    ///
    /// The access is checked against every level it would reach before any
    /// state changes, so a stall leaves the hierarchy untouched.
    pub fn access(&mut self, access: Access) -> Outcome {
        let l1_level = Level::first_level(access.kind);
        let fetch = Self::l2_fetch(access);

        match self.cache(l1_level).peek(access.addr) {
            Err(reason) => {
                return Outcome::Stalled {
                    level: l1_level,
                    reason,
                }
            }
            Ok(RequestStatus::MISS) => {
                if let Err(reason) = self.l2.peek(fetch.addr) {
                    return Outcome::Stalled {
                        level: Level::L2,
                        reason,
                    };
                }
            }
            Ok(RequestStatus::HIT | RequestStatus::MSHR_HIT) => {}
        }

        let now = self.cycle;
        let l1 = self.cache_mut(l1_level);
        let l1_config = l1.config().clone();
        let l1_status = match l1.lookup(access, now) {
            Ok(status) => status,
            Err(reason) => {
                return Outcome::Stalled {
                    level: l1_level,
                    reason,
                }
            }
        };

        let mut outcomes = SmallVec::new();
        match l1_status {
            RequestStatus::HIT => {
                outcomes.push(LevelOutcome {
                    level: l1_level,
                    status: l1_status,
                    latency: l1_config.hit_latency(),
                });
            }
            RequestStatus::MSHR_HIT => {
                outcomes.push(LevelOutcome {
                    level: l1_level,
                    status: l1_status,
                    latency: l1_config.tag_latency,
                });
            }
            RequestStatus::MISS => {
                outcomes.push(LevelOutcome {
                    level: l1_level,
                    status: l1_status,
                    latency: l1_config.tag_latency,
                });
                let l2_config = self.l2.config().clone();
                let l2_status = match self.l2.lookup(fetch, now) {
                    Ok(status) => status,
                    Err(reason) => {
                        return Outcome::Stalled {
                            level: Level::L2,
                            reason,
                        }
                    }
                };
                let l2_latency = match l2_status {
                    RequestStatus::HIT => {
                        let block_addr = self.cache(l1_level).block_addr(access.addr);
                        let ready = now
                            + l1_config.tag_latency
                            + l2_config.hit_latency()
                            + l2_config.response_latency;
                        self.schedule(l1_level, block_addr, ready);
                        l2_config.hit_latency()
                    }
                    RequestStatus::MISS => {
                        let block_addr = self.l2.block_addr(fetch.addr);
                        let ready =
                            now + l1_config.tag_latency + l2_config.tag_latency + self.memory_latency;
                        self.schedule(Level::L2, block_addr, ready);
                        l2_config.tag_latency
                    }
                    RequestStatus::MSHR_HIT => l2_config.tag_latency,
                };
                outcomes.push(LevelOutcome {
                    level: Level::L2,
                    status: l2_status,
                    latency: l2_latency,
                });
            }
        }
        Outcome::Completed(outcomes)
    }

    fn schedule(&mut self, level: Level, block_addr: address, ready: u64) {
        log::trace!(
            "schedule {} fill of block {} at cycle {} (now={})",
            level,
            block_addr,
            ready,
            self.cycle
        );
        self.seq += 1;
        self.pending.push(Reverse(PendingFill {
            ready,
            seq: self.seq,
            level,
            block_addr,
        }));
    }

    /// Moves the clock forward by one cycle and applies all fills that are due.
    pub fn advance(&mut self) {
        self.cycle += 1;
        self.apply_ready_fills();
    }

    /// Completes all outstanding fills.
    pub fn drain(&mut self) {
        while let Some(Reverse(next)) = self.pending.peek() {
            self.cycle = self.cycle.max(next.ready);
            self.apply_ready_fills();
        }
    }

    fn apply_ready_fills(&mut self) {
        while let Some(Reverse(fill)) = self.pending.peek().copied() {
            if fill.ready > self.cycle {
                break;
            }
            self.pending.pop();
            match fill.level {
                Level::L1I | Level::L1D => self.fill_l1(fill.level, fill.block_addr),
                Level::L2 => self.fill_l2(fill.block_addr),
            }
        }
    }

    fn fill_l1(&mut self, level: Level, block_addr: address) {
        let now = self.cycle;
        let fill = self.cache_mut(level).fill(block_addr, now);
        let Some(evicted) = fill.evicted else {
            return;
        };
        log::debug!("{} evicted block {} (dirty={})", level, evicted.block_addr, evicted.modified);
        let modified = evicted.modified;
        let victim = evicted.block_addr;
        self.events.push((
            level,
            cache::Event::Evicted {
                evicted_block: evicted,
            },
        ));
        if modified {
            if self.l2.writeback(victim) {
                self.events.push((
                    Level::L2,
                    cache::Event::WritebackReceived { block_addr: victim },
                ));
            } else {
                self.memory_writebacks += 1;
            }
        }
    }

    fn fill_l2(&mut self, block_addr: address) {
        let now = self.cycle;
        let fill = self.l2.fill(block_addr, now);
        if let Some(evicted) = fill.evicted {
            log::debug!("L2 evicted block {} (dirty={})", evicted.block_addr, evicted.modified);
            let victim = evicted.block_addr;
            let mut dirty = evicted.modified;
            self.events.push((
                Level::L2,
                cache::Event::Evicted {
                    evicted_block: evicted,
                },
            ));
            if self.inclusion == InclusionPolicy::Inclusive {
                dirty |= self.back_invalidate(victim);
            }
            // the victim and its first level copies leave as one memory write
            if dirty {
                self.memory_writebacks += 1;
            }
        }

        let response_latency = self.l2.config().response_latency;
        let mut scheduled: HashSet<(Level, address)> = HashSet::new();
        for target in fill.targets {
            let level = Level::first_level(target.kind);
            let l1_block = self.cache(level).block_addr(target.addr);
            if scheduled.insert((level, l1_block)) {
                self.schedule(level, l1_block, now + response_latency);
            }
        }
    }

    /// Removes every first level copy of an evicted shared level block.
    ///
    /// Returns whether any of the removed copies was dirty.
    fn back_invalidate(&mut self, l2_block: address) -> bool {
        let mut dirty = false;
        let l2_line = u64::from(self.l2.config().line_size);
        for level in [Level::L1I, Level::L1D] {
            let l1_line = u64::from(self.cache(level).config().line_size);
            let step = l1_line.min(l2_line) as usize;
            let invalidated: Vec<EvictedBlockInfo> = (l2_block..l2_block + l2_line)
                .step_by(step)
                .filter_map(|addr| self.cache_mut(level).invalidate(addr))
                .collect();
            for block in invalidated {
                log::debug!(
                    "{} back-invalidated block {} (dirty={})",
                    level,
                    block.block_addr,
                    block.modified
                );
                dirty |= block.modified;
                self.events.push((
                    level,
                    cache::Event::BackInvalidated {
                        evicted_block: block,
                    },
                ));
            }
        }
        dirty
    }

    fn record_events(&mut self, stats: &mut stats::Collector) {
        for (level, event) in self.take_events() {
            stats.record_event(level.name(), event.stat());
        }
    }

    /// Replays a trace to completion.
    ///
    /// One access is issued per cycle. A stalled access is retried in the
    /// following cycles until it is accepted, and every stall is recorded as
    /// a reservation failure of the level that rejected it.
    pub fn replay(&mut self, trace: &dyn AddressTrace, stats: &mut stats::Collector) {
        for access in trace.accesses() {
            stats.sim.accesses += 1;
            loop {
                match self.access(access) {
                    Outcome::Completed(outcomes) => {
                        for outcome in outcomes {
                            stats.record(outcome.level.name(), access.kind, outcome.status);
                        }
                        break;
                    }
                    Outcome::Stalled { level, reason } => {
                        assert!(
                            !self.pending.is_empty(),
                            "{access} stalled at {level} ({reason:?}) without outstanding fills"
                        );
                        stats.record(level.name(), access.kind, reason);
                        stats.sim.stall_cycles += 1;
                        self.advance();
                        self.record_events(stats);
                    }
                }
            }
            self.advance();
            self.record_events(stats);
        }
        self.drain();
        self.record_events(stats);
        stats.sim.cycles = self.cycle;
        stats.sim.memory_writebacks += self.memory_writebacks;
    }
}
