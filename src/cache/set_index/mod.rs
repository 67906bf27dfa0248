use crate::address;

pub trait SetIndexer: std::fmt::Debug + Send + Sync + 'static {
    /// Compute set index of an address.
    #[must_use]
    fn compute_set_index(&self, addr: address) -> u64;

    /// Compute the tag of an address.
    ///
    /// The tag holds the address bits above the set index and block offset.
    #[must_use]
    fn compute_tag(&self, addr: address) -> address;
}

pub mod linear {
    /// Linear set index: consecutive blocks map to consecutive sets.
    ///
    /// The number of sets need not be a power of two.
    #[derive(Clone, Debug, PartialEq, Eq, Hash)]
    pub struct SetIndex {
        pub num_sets: usize,
        pub line_size_log2: u32,
    }

    impl SetIndex {
        #[must_use]
        pub fn new(num_sets: usize, line_size: u32) -> Self {
            debug_assert!(num_sets > 0);
            debug_assert!(line_size.is_power_of_two());
            Self {
                num_sets,
                line_size_log2: line_size.ilog2(),
            }
        }
    }

    impl super::SetIndexer for SetIndex {
        #[inline]
        fn compute_set_index(&self, addr: super::address) -> u64 {
            let set_idx = (addr >> self.line_size_log2) % self.num_sets as u64;
            debug_assert!(set_idx < self.num_sets as u64, "set index out of bounds");
            set_idx
        }

        #[inline]
        fn compute_tag(&self, addr: super::address) -> super::address {
            (addr >> self.line_size_log2) / self.num_sets as u64
        }
    }
}
