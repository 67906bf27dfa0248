use super::address;
use std::collections::{HashMap, VecDeque};

/// Miss status handling entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry<F> {
    requests: VecDeque<F>,
    alloc_time: u64,
}

impl<F> Entry<F> {
    #[must_use]
    pub fn new(alloc_time: u64) -> Self {
        Self {
            requests: VecDeque::new(),
            alloc_time,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    #[must_use]
    pub fn alloc_time(&self) -> u64 {
        self.alloc_time
    }

    pub fn requests(&self) -> impl Iterator<Item = &F> {
        self.requests.iter()
    }

    #[must_use]
    pub fn into_requests(self) -> VecDeque<F> {
        self.requests
    }
}

/// Result of checking whether the table can track another request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Probe {
    /// A new entry can be allocated.
    Allocate,
    /// The request can be merged into the existing entry.
    Merge,
    /// No entry is free.
    EntryFail,
    /// The existing entry holds the maximum number of merged requests.
    MergeFail,
}

/// Miss status handling register table.
#[derive(Debug)]
pub struct Table<F> {
    num_entries: usize,
    max_merged: usize,
    entries: HashMap<address, Entry<F>>,
}

pub trait MSHR<F> {
    /// Checks if there is no more space for tracking a new memory access.
    #[must_use]
    fn full(&self, block_addr: address) -> bool;

    /// Get pending requests for a given block address.
    #[must_use]
    fn get(&self, block_addr: address) -> Option<&Entry<F>>;

    /// Add or merge access.
    fn add(&mut self, block_addr: address, fetch: F, time: u64);

    /// Remove the entry of a block address.
    fn remove(&mut self, block_addr: address) -> Option<Entry<F>>;
}

impl<F> MSHR<F> for Table<F> {
    fn full(&self, block_addr: address) -> bool {
        match self.entries.get(&block_addr) {
            Some(entry) => entry.requests.len() >= self.max_merged,
            None => self.entries.len() >= self.num_entries,
        }
    }

    fn get(&self, block_addr: address) -> Option<&Entry<F>> {
        self.entries.get(&block_addr)
    }

    fn add(&mut self, block_addr: address, fetch: F, time: u64) {
        let entry = self
            .entries
            .entry(block_addr)
            .or_insert_with(|| Entry::new(time));

        assert!(entry.requests.len() < self.max_merged);
        entry.requests.push_back(fetch);
        assert!(self.entries.len() <= self.num_entries);
    }

    fn remove(&mut self, block_addr: address) -> Option<Entry<F>> {
        self.entries.remove(&block_addr)
    }
}

impl<F> Table<F> {
    #[must_use]
    pub fn new(num_entries: usize, max_merged: usize) -> Self {
        let entries = HashMap::with_capacity(num_entries);
        Self {
            num_entries,
            max_merged,
            entries,
        }
    }

    /// Checks how a request for `block_addr` would be tracked.
    #[must_use]
    pub fn probe(&self, block_addr: address) -> Probe {
        match (self.entries.contains_key(&block_addr), self.full(block_addr)) {
            (true, false) => Probe::Merge,
            (true, true) => Probe::MergeFail,
            (false, false) => Probe::Allocate,
            (false, true) => Probe::EntryFail,
        }
    }

    /// Number of outstanding entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn num_entries(&self) -> usize {
        self.num_entries
    }
}
