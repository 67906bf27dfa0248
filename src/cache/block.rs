use crate::address;

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum Status {
    INVALID = 0,
    VALID,
    /// Valid and dirty.
    MODIFIED,
}

pub trait Block: std::fmt::Debug + std::fmt::Display + Default + Sync + Send + 'static {
    /// Installs a new block into this line.
    fn allocate(&mut self, tag: address, block_addr: address, set_index: usize, time: u64);

    #[must_use]
    fn block_addr(&self) -> address;

    #[must_use]
    fn tag(&self) -> address;

    #[must_use]
    fn set_index(&self) -> usize;

    #[inline]
    #[must_use]
    fn is_valid(&self) -> bool {
        self.status() != Status::INVALID
    }

    #[inline]
    #[must_use]
    fn is_modified(&self) -> bool {
        self.status() == Status::MODIFIED
    }

    #[inline]
    #[must_use]
    fn is_invalid(&self) -> bool {
        self.status() == Status::INVALID
    }

    #[must_use]
    fn status(&self) -> Status;
    fn set_status(&mut self, status: Status);

    fn set_last_access_time(&mut self, time: u64);
    #[must_use]
    fn last_access_time(&self) -> u64;

    #[must_use]
    fn alloc_time(&self) -> u64;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Line {
    pub tag: address,
    pub block_addr: address,
    pub set_index: usize,
    pub status: Status,
    alloc_time: u64,
    pub last_access_time: u64,
}

impl std::fmt::Display for Line {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Line")
            .field("addr", &self.block_addr)
            .field("status", &self.status)
            .finish()
    }
}

impl Default for Line {
    fn default() -> Self {
        Self {
            tag: 0,
            block_addr: 0,
            set_index: 0,
            status: Status::INVALID,
            alloc_time: 0,
            last_access_time: 0,
        }
    }
}

impl Line {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Block for Line {
    #[inline]
    fn block_addr(&self) -> address {
        self.block_addr
    }

    #[inline]
    fn tag(&self) -> address {
        self.tag
    }

    #[inline]
    fn set_index(&self) -> usize {
        self.set_index
    }

    #[inline]
    fn allocate(&mut self, tag: address, block_addr: address, set_index: usize, time: u64) {
        self.tag = tag;
        self.block_addr = block_addr;
        self.set_index = set_index;
        self.alloc_time = time;
        self.last_access_time = time;
        self.status = Status::VALID;
    }

    #[inline]
    fn set_last_access_time(&mut self, time: u64) {
        self.last_access_time = time;
    }

    #[inline]
    fn set_status(&mut self, status: Status) {
        self.status = status;
    }

    #[inline]
    fn status(&self) -> Status {
        self.status
    }

    #[inline]
    fn alloc_time(&self) -> u64 {
        self.alloc_time
    }

    #[inline]
    fn last_access_time(&self) -> u64 {
        self.last_access_time
    }
}
