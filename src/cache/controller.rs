use crate::address;

/// Cache controller.
///
/// The cache controller divides the address of a request into three fields:
/// the tag field, the set index field, and the block offset.
///
/// The set index selects the set that might hold the block.
/// The tag is compared against the tags of the valid lines in that set:
/// if one matches, it is a cache hit, otherwise it is a cache miss.
#[allow(clippy::module_name_repetitions)]
pub trait CacheController: std::fmt::Debug + Sync + Send + 'static {
    /// Compute cache line tag for an address.
    #[must_use]
    fn tag(&self, addr: address) -> address;

    /// Compute block address for an address.
    #[must_use]
    fn block_addr(&self, addr: address) -> address;

    /// Compute offset of an address within its block.
    #[must_use]
    fn block_offset(&self, addr: address) -> u64;

    /// Compute set index for an address.
    #[must_use]
    fn set_index(&self, addr: address) -> u64;

    /// Compute miss status handling register address.
    ///
    /// The default implementation uses the block address.
    #[must_use]
    fn mshr_addr(&self, addr: address) -> address {
        self.block_addr(addr)
    }
}

pub mod linear {
    use crate::{address, cache};

    #[derive(Debug, Clone)]
    pub struct CacheControllerUnit {
        set_index_function: cache::set_index::linear::SetIndex,
        line_size: u32,
    }

    impl CacheControllerUnit {
        #[must_use]
        pub fn new(config: &cache::Config) -> Self {
            Self {
                set_index_function: cache::set_index::linear::SetIndex::new(
                    config.num_sets,
                    config.line_size,
                ),
                line_size: config.line_size,
            }
        }
    }

    impl super::CacheController for CacheControllerUnit {
        #[inline]
        fn tag(&self, addr: address) -> address {
            use cache::set_index::SetIndexer;
            self.set_index_function.compute_tag(addr)
        }

        #[inline]
        fn block_addr(&self, addr: address) -> address {
            addr & !u64::from(self.line_size - 1)
        }

        #[inline]
        fn block_offset(&self, addr: address) -> u64 {
            addr & u64::from(self.line_size - 1)
        }

        #[inline]
        fn set_index(&self, addr: address) -> u64 {
            use cache::set_index::SetIndexer;
            self.set_index_function.compute_set_index(addr)
        }
    }
}
