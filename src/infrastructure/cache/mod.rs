//! Image caching with automatic purging.

mod auto_purging;

pub use auto_purging::{
    AutoPurgingImageCache, CacheStats, DEFAULT_MEMORY_CAPACITY,
    DEFAULT_PREFERRED_MEMORY_USAGE_AFTER_PURGE, cache_key,
};
