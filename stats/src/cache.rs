use super::mem::AccessKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum::IntoEnumIterator;

#[derive(
    Debug,
    strum::EnumIter,
    Clone,
    Copy,
    Hash,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
)]
pub enum RequestStatus {
    HIT = 0,
    MISS,
    /// Miss merged into an outstanding MSHR entry.
    MSHR_HIT,
}

impl RequestStatus {
    #[must_use]
    pub fn is_hit(self) -> bool {
        self == RequestStatus::HIT
    }

    #[must_use]
    pub fn is_miss(self) -> bool {
        matches!(self, RequestStatus::MISS | RequestStatus::MSHR_HIT)
    }
}

#[derive(
    Debug,
    strum::EnumIter,
    Clone,
    Copy,
    Hash,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
)]
pub enum ReservationFailure {
    /// No free MSHR entry for a new block.
    MSHR_ENTRY_FAIL = 0,
    /// The MSHR entry for the block holds the maximum number of targets.
    MSHR_MERGE_ENTRY_FAIL,
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AccessStat {
    ReservationFailure(ReservationFailure),
    Status(RequestStatus),
}

impl From<RequestStatus> for AccessStat {
    fn from(status: RequestStatus) -> Self {
        Self::Status(status)
    }
}

impl From<ReservationFailure> for AccessStat {
    fn from(failure: ReservationFailure) -> Self {
        Self::ReservationFailure(failure)
    }
}

/// Non-demand events observed by a cache level.
#[derive(
    Debug,
    strum::EnumIter,
    Clone,
    Copy,
    Hash,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
)]
pub enum Event {
    /// A valid line was replaced on fill.
    EVICTION,
    /// A dirty line from the level above was written into this level.
    WRITEBACK,
    /// A line was invalidated to keep an inclusive lower level consistent.
    BACK_INVALIDATION,
}

#[derive(Clone, PartialEq, Eq)]
pub struct Cache {
    pub accesses: HashMap<(AccessKind, AccessStat), usize>,
    pub events: HashMap<Event, usize>,
}

impl Default for Cache {
    fn default() -> Self {
        let mut accesses = HashMap::new();
        for access_kind in AccessKind::iter() {
            for status in RequestStatus::iter() {
                accesses.insert((access_kind, AccessStat::Status(status)), 0);
            }
            for failure in ReservationFailure::iter() {
                accesses.insert((access_kind, AccessStat::ReservationFailure(failure)), 0);
            }
        }
        let events = Event::iter().map(|event| (event, 0)).collect();
        Self { accesses, events }
    }
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let mut accesses: Vec<_> = self
            .accesses
            .iter()
            .filter(|(_, &count)| count > 0)
            .map(|((access_kind, access_stat), count)| {
                let key = match access_stat {
                    AccessStat::Status(status) => {
                        format!("{access_kind:?}[{status:?}]")
                    }
                    AccessStat::ReservationFailure(failure) => {
                        format!("{access_kind:?}[{failure:?}]")
                    }
                };
                (key, count)
            })
            .collect();
        accesses.extend(
            self.events
                .iter()
                .filter(|(_, &count)| count > 0)
                .map(|(event, count)| (format!("{event:?}"), count)),
        );
        accesses.sort_by_key(|(key, _)| key.clone());

        let mut out = f.debug_struct("CacheStats");
        for (key, count) in accesses {
            out.field(&key, count);
        }
        out.finish_non_exhaustive()
    }
}

impl Cache {
    fn count(&self, pred: impl Fn(&AccessStat) -> bool) -> usize {
        self.accesses
            .iter()
            .filter(|((_, stat), _)| pred(stat))
            .map(|(_, count)| count)
            .sum()
    }

    /// Demand accesses accepted by this level.
    ///
    /// Reservation failures are retried and therefore not counted.
    #[must_use]
    pub fn num_accesses(&self) -> usize {
        self.count(|stat| matches!(stat, AccessStat::Status(_)))
    }

    #[must_use]
    pub fn num_hits(&self) -> usize {
        self.count(|stat| matches!(stat, AccessStat::Status(status) if status.is_hit()))
    }

    #[must_use]
    pub fn num_misses(&self) -> usize {
        self.count(|stat| matches!(stat, AccessStat::Status(status) if status.is_miss()))
    }

    #[must_use]
    pub fn num_mshr_hits(&self) -> usize {
        self.count(|stat| *stat == AccessStat::Status(RequestStatus::MSHR_HIT))
    }

    #[must_use]
    pub fn num_reservation_failures(&self) -> usize {
        self.count(|stat| matches!(stat, AccessStat::ReservationFailure(_)))
    }

    #[must_use]
    pub fn num_events(&self, event: Event) -> usize {
        self.events.get(&event).copied().unwrap_or(0)
    }

    /// Fraction of accepted accesses that hit, `0.0` for an unused level.
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let accesses = self.num_accesses();
        if accesses == 0 {
            return 0.0;
        }
        self.num_hits() as f64 / accesses as f64
    }

    #[inline]
    pub fn inc(
        &mut self,
        kind: impl Into<AccessKind>,
        access: impl Into<AccessStat>,
        count: usize,
    ) {
        *self
            .accesses
            .entry((kind.into(), access.into()))
            .or_insert(0) += count;
    }

    #[inline]
    pub fn inc_event(&mut self, event: Event, count: usize) {
        *self.events.entry(event).or_insert(0) += count;
    }

    #[must_use]
    pub fn summary(&self) -> Summary {
        Summary {
            accesses: self.num_accesses(),
            hits: self.num_hits(),
            misses: self.num_misses(),
            mshr_hits: self.num_mshr_hits(),
            reservation_failures: self.num_reservation_failures(),
            evictions: self.num_events(Event::EVICTION),
            writebacks: self.num_events(Event::WRITEBACK),
            back_invalidations: self.num_events(Event::BACK_INVALIDATION),
            hit_rate: self.hit_rate(),
        }
    }
}

/// Summary of a single cache level.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub accesses: usize,
    pub hits: usize,
    pub misses: usize,
    pub mshr_hits: usize,
    pub reservation_failures: usize,
    pub evictions: usize,
    pub writebacks: usize,
    pub back_invalidations: usize,
    pub hit_rate: f64,
}

impl Summary {
    /// Hit rate in percent.
    #[must_use]
    pub fn hit_rate_percent(&self) -> f64 {
        self.hit_rate * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::{Cache, Event, RequestStatus, ReservationFailure};
    use crate::mem::AccessKind;

    #[test]
    fn test_unused_cache_has_zero_hit_rate() {
        let stats = Cache::default();
        assert_eq!(stats.num_accesses(), 0);
        assert_eq!(stats.num_hits(), 0);
        assert_eq!(stats.num_misses(), 0);
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_reservation_failures_are_not_accesses() {
        let mut stats = Cache::default();
        stats.inc(AccessKind::DATA_ACC_R, RequestStatus::HIT, 3);
        stats.inc(AccessKind::DATA_ACC_W, RequestStatus::MISS, 1);
        stats.inc(AccessKind::INST_ACC_R, RequestStatus::MSHR_HIT, 1);
        stats.inc(
            AccessKind::DATA_ACC_R,
            ReservationFailure::MSHR_ENTRY_FAIL,
            7,
        );
        stats.inc_event(Event::EVICTION, 2);

        assert_eq!(stats.num_accesses(), 5);
        assert_eq!(stats.num_hits(), 3);
        assert_eq!(stats.num_misses(), 2);
        assert_eq!(stats.num_mshr_hits(), 1);
        assert_eq!(stats.num_reservation_failures(), 7);
        assert_eq!(stats.num_events(Event::EVICTION), 2);
        assert!((stats.hit_rate() - 0.6).abs() < f64::EPSILON);
    }
}
